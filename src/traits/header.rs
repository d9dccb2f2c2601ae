//! Header schema
use crate::io::header::{HeaderAttr, HeaderError, HeaderValues};

pub trait HeaderSchema {
    //! Ordered groups of named, typed attributes at the start of a domain file

    /// The attribute group at `index`, or `None` once all groups have been read
    ///
    /// `parsed` holds every attribute of the earlier groups, so a group may be sized by
    /// values read before it.
    fn group(
        &self,
        index: usize,
        parsed: &HeaderValues,
    ) -> Result<Option<Vec<HeaderAttr>>, HeaderError>;
}
