//! Oct batches
use crate::types::{DomainId, Level};

/// Octs of one `(owner, level)` pair read from a domain file.
#[derive(Debug, Clone, PartialEq)]
pub struct OctBatch {
    /// One-based owning domain. Values above `ncpu` are boundary domains.
    pub owner: DomainId,
    /// Refinement level
    pub level: Level,
    /// File grid indices
    pub indices: Vec<i64>,
    /// Oct centres, scaled by the domain width
    pub positions: Vec<[f64; 3]>,
    /// One-based owning domain of each octant
    pub owner_map: Vec<[i32; 8]>,
}

impl OctBatch {
    /// Number of octs
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Does the batch hold no octs
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
