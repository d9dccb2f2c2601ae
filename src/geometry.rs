//! Octree assembly and selection
//!
//! The [GeometryHandler] opens every domain of a snapshot, merges their octs into a
//! single octree and turns selectors into [Chunk]s of [crate::domain::DomainSubset]s.

mod assembly;
mod chunk;
mod handler;

pub use self::assembly::OwnershipLedger;
pub use self::chunk::{Chunk, ResolvedSelection, Selection};
pub use self::handler::GeometryHandler;
