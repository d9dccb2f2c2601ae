//! Decomposition domains
//!
//! A snapshot is written as one AMR file per domain. Each [DomainFile] parses its own
//! header and streams its own grid records; a [DomainSubset] is the part of a domain
//! selected by a query.

mod file;
mod subset;

pub(crate) use self::file::is_file;
pub use self::file::{DomainFile, DomainPaths};
pub use self::subset::DomainSubset;
