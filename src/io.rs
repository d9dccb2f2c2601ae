//! Domain file input/output
//!
//! The binary layout is sequential framed records: a header whose shape is driven by a
//! [HeaderSchema](crate::traits::HeaderSchema), followed by grid records for every
//! `(level, owner)` pair the header declares.

pub mod header;
pub mod record;
pub mod schema;
pub mod writer;

pub use header::{AmrHeader, AttrType, AttrValue, HeaderAttr, HeaderError, HeaderValues};
pub use record::{Primitive, RecordError, RecordReader, RecordWriter};
pub use schema::RamsesHeaderSchema;
pub use writer::{AmrFileBuilder, GridBatch};
