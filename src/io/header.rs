//! AMR file header
use crate::io::record::{RecordError, RecordReader};
use crate::traits::HeaderSchema;
use crate::types::{DomainId, Level};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Errors parsing an AMR header
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// A header record could not be decoded
    #[error(transparent)]
    Record(#[from] RecordError),

    /// A field needed to continue was not read
    #[error("missing header field: {0}")]
    MissingField(&'static str),

    /// A field holds an unusable value
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },
}

/// Primitive type of a header attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    /// 32-bit signed integer
    Int,
    /// 64-bit float
    Double,
    /// Single byte character
    Char,
}

/// One named attribute of a header group, stored as its own record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderAttr {
    /// Field name
    pub name: &'static str,
    /// Number of values in the record
    pub count: usize,
    /// Value type
    pub kind: AttrType,
}

impl HeaderAttr {
    /// Describe an attribute
    pub const fn new(name: &'static str, count: usize, kind: AttrType) -> Self {
        Self { name, count, kind }
    }
}

/// Values read for one attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Integers
    Int(Vec<i32>),
    /// Floats
    Double(Vec<f64>),
    /// Raw characters
    Char(Vec<u8>),
}

/// Header fields parsed so far, by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderValues {
    values: HashMap<&'static str, AttrValue>,
}

impl HeaderValues {
    /// Store a field, replacing any previous value
    pub fn insert(&mut self, name: &'static str, value: AttrValue) {
        self.values.insert(name, value);
    }

    /// Raw value of a field
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.values.get(name)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Are there no fields
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Integer vector stored under `name`.
    pub fn ints(&self, name: &'static str) -> Result<&[i32], HeaderError> {
        match self.values.get(name) {
            Some(AttrValue::Int(v)) => Ok(v),
            Some(_) => Err(HeaderError::InvalidValue {
                field: name,
                reason: "not an integer field",
            }),
            None => Err(HeaderError::MissingField(name)),
        }
    }

    /// Float vector stored under `name`.
    pub fn doubles(&self, name: &'static str) -> Result<&[f64], HeaderError> {
        match self.values.get(name) {
            Some(AttrValue::Double(v)) => Ok(v),
            Some(_) => Err(HeaderError::InvalidValue {
                field: name,
                reason: "not a floating point field",
            }),
            None => Err(HeaderError::MissingField(name)),
        }
    }

    /// Single non-negative integer stored under `name`.
    pub fn count(&self, name: &'static str) -> Result<usize, HeaderError> {
        match self.ints(name)? {
            [v] => non_negative(name, *v),
            _ => Err(HeaderError::InvalidValue {
                field: name,
                reason: "expected a single value",
            }),
        }
    }
}

fn non_negative(field: &'static str, value: i32) -> Result<usize, HeaderError> {
    usize::try_from(value).map_err(|_| HeaderError::InvalidValue {
        field,
        reason: "negative value",
    })
}

/// Parsed header of one domain's AMR file.
#[derive(Debug, Clone, PartialEq)]
pub struct AmrHeader {
    /// Every schema-defined field, as read.
    pub values: HeaderValues,
    /// Number of decomposition domains
    pub ncpu: usize,
    /// Number of refinement levels with grid counts
    pub nlevelmax: usize,
    /// Number of boundary domains
    pub nboundary: usize,
    /// Coarse grid shape
    pub nx: [usize; 3],
    /// Box length in code units
    pub boxlen: f64,
    /// Grid counts by `(level, cpu)`, stored at `level * ncpu + cpu`.
    numbl: Vec<usize>,
    /// Grid counts of boundary domains, stored at `boundary + nboundary * level`.
    ngridbound: Vec<usize>,
    /// Free memory bookkeeping record
    pub free_mem: [i32; 5],
    /// Domain ordering, e.g. `hilbert`
    pub ordering: String,
}

impl AmrHeader {
    /// Read the schema-defined groups and the trailing bookkeeping records.
    ///
    /// On success the reader is positioned at the first grid record.
    pub fn read<R: Read + Seek, H: HeaderSchema + ?Sized>(
        reader: &mut RecordReader<R>,
        schema: &H,
    ) -> Result<Self, HeaderError> {
        let mut values = HeaderValues::default();
        let mut index = 0;
        while let Some(group) = schema.group(index, &values)? {
            for attr in group {
                let value = match attr.kind {
                    AttrType::Int => AttrValue::Int(reader.read_exact_vector(attr.count)?),
                    AttrType::Double => AttrValue::Double(reader.read_exact_vector(attr.count)?),
                    AttrType::Char => AttrValue::Char(reader.read_exact_vector(attr.count)?),
                };
                values.insert(attr.name, value);
            }
            index += 1;
        }

        let ncpu = values.count("ncpu")?;
        let nlevelmax = values.count("nlevelmax")?;
        let nboundary = values.count("nboundary")?;
        let nx = match values.ints("nx")? {
            [x, y, z] => [
                non_negative("nx", *x)?,
                non_negative("nx", *y)?,
                non_negative("nx", *z)?,
            ],
            _ => {
                return Err(HeaderError::InvalidValue {
                    field: "nx",
                    reason: "expected three values",
                })
            }
        };
        if nx.contains(&0) {
            return Err(HeaderError::InvalidValue {
                field: "nx",
                reason: "coarse grid must be at least one cell wide",
            });
        }
        let boxlen = match values.doubles("boxlen")? {
            [b] => *b,
            _ => {
                return Err(HeaderError::InvalidValue {
                    field: "boxlen",
                    reason: "expected a single value",
                })
            }
        };
        let numbl = values
            .ints("numbl")?
            .iter()
            .map(|v| non_negative("numbl", *v))
            .collect::<Result<Vec<_>, _>>()?;
        if numbl.len() != nlevelmax * ncpu {
            return Err(HeaderError::InvalidValue {
                field: "numbl",
                reason: "length differs from nlevelmax * ncpu",
            });
        }

        reader.skip(1)?;
        let ngridbound = if nboundary > 0 {
            reader.skip(2)?;
            reader
                .read_exact_vector::<i32>(nboundary * nlevelmax)?
                .into_iter()
                .map(|v| non_negative("ngridbound", v))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            vec![]
        };
        let mut free_mem = [0; 5];
        free_mem.copy_from_slice(&reader.read_exact_vector::<i32>(5)?);
        let ordering = String::from_utf8_lossy(&reader.read_vector::<u8>()?)
            .trim_end()
            .to_string();
        reader.skip(4)?;

        Ok(Self {
            values,
            ncpu,
            nlevelmax,
            nboundary,
            nx,
            boxlen,
            numbl,
            ngridbound,
            free_mem,
            ordering,
        })
    }

    /// Grids owned by `cpu` (zero-based) at `level`, or `None` when either is out of range.
    pub fn numbl(&self, level: Level, cpu: usize) -> Option<usize> {
        if cpu >= self.ncpu || level >= self.nlevelmax {
            return None;
        }
        self.numbl.get(level * self.ncpu + cpu).copied()
    }

    /// Boundary grid counts, flat.
    pub fn ngridbound(&self) -> &[usize] {
        &self.ngridbound
    }

    /// Number of grids written for zero-based `owner_index` at `level`.
    ///
    /// Real domains and boundary domains live in separate arrays but share one owner
    /// index space: indices at or beyond `ncpu` address the boundary array.
    /// Returns `None` when the owner or the level is out of range.
    pub fn grid_count(&self, owner_index: usize, level: Level) -> Option<usize> {
        if owner_index < self.ncpu {
            return self.numbl(level, owner_index);
        }
        let boundary = owner_index - self.ncpu;
        if boundary >= self.nboundary || level >= self.nlevelmax {
            return None;
        }
        self.ngridbound
            .get(boundary + self.nboundary * level)
            .copied()
    }

    /// Total octs owned by one-based `domain_id` over all levels, or `None` for a domain
    /// outside `1..=ncpu`.
    pub fn local_oct_count(&self, domain_id: DomainId) -> Option<usize> {
        let cpu = domain_id.checked_sub(1)?;
        (0..self.nlevelmax)
            .map(|level| self.numbl(level, cpu))
            .sum::<Option<usize>>()
            .filter(|_| cpu < self.ncpu)
    }
}
