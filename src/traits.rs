//! Trait definitions

mod header;
mod octree;
mod selector;

pub use header::HeaderSchema;
pub use octree::{Octree, OctreeBuilder};
pub use selector::Selector;
