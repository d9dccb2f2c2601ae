//! The RAMSES AMR header schema
use crate::io::header::{AttrType, HeaderAttr, HeaderError, HeaderValues};
use crate::traits::HeaderSchema;

/// Header layout written by RAMSES into every `amr_*.out*` file.
///
/// The second group is sized by values from the first (`nout`, `nlevelmax`, `ncpu`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RamsesHeaderSchema;

impl HeaderSchema for RamsesHeaderSchema {
    fn group(
        &self,
        index: usize,
        parsed: &HeaderValues,
    ) -> Result<Option<Vec<HeaderAttr>>, HeaderError> {
        match index {
            0 => Ok(Some(vec![
                HeaderAttr::new("ncpu", 1, AttrType::Int),
                HeaderAttr::new("ndim", 1, AttrType::Int),
                HeaderAttr::new("nx", 3, AttrType::Int),
                HeaderAttr::new("nlevelmax", 1, AttrType::Int),
                HeaderAttr::new("ngridmax", 1, AttrType::Int),
                HeaderAttr::new("nboundary", 1, AttrType::Int),
                HeaderAttr::new("ngrid_current", 1, AttrType::Int),
                HeaderAttr::new("boxlen", 1, AttrType::Double),
                HeaderAttr::new("nout", 3, AttrType::Int),
            ])),
            1 => {
                let noutput = match parsed.ints("nout")?.first() {
                    Some(n) => usize::try_from(*n).map_err(|_| HeaderError::InvalidValue {
                        field: "nout",
                        reason: "negative output count",
                    })?,
                    None => return Err(HeaderError::MissingField("nout")),
                };
                let nlevelmax = parsed.count("nlevelmax")?;
                let ncpu = parsed.count("ncpu")?;
                Ok(Some(vec![
                    HeaderAttr::new("tout", noutput, AttrType::Double),
                    HeaderAttr::new("aout", noutput, AttrType::Double),
                    HeaderAttr::new("t", 1, AttrType::Double),
                    HeaderAttr::new("dtold", nlevelmax, AttrType::Double),
                    HeaderAttr::new("dtnew", nlevelmax, AttrType::Double),
                    HeaderAttr::new("nstep", 2, AttrType::Int),
                    HeaderAttr::new("stat", 3, AttrType::Double),
                    HeaderAttr::new("cosm", 7, AttrType::Double),
                    HeaderAttr::new("timing", 5, AttrType::Double),
                    HeaderAttr::new("numbl", nlevelmax * ncpu, AttrType::Int),
                ]))
            }
            _ => Ok(None),
        }
    }
}
