//! Types specific to ramses-octree

use crate::io::header::HeaderError;
use crate::io::record::RecordError;
use std::fmt;
use std::path::PathBuf;

/// One-based index of a decomposition domain.
///
/// Owner indices at or beyond `ncpu` describe boundary (ghost) domains.
pub type DomainId = usize;

/// Zero-based refinement level.
pub type Level = usize;

/// Generic error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O failure outside record decoding
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The header of a domain file could not be parsed
    #[error("corrupt AMR header in {path:?}")]
    CorruptHeader {
        /// File being read
        path: PathBuf,
        /// Underlying header error
        #[source]
        source: HeaderError,
    },

    /// A grid record of a domain file could not be decoded
    #[error("corrupt grid record in {path:?} (level {level}, owner {owner})")]
    CorruptRecord {
        /// File being read
        path: PathBuf,
        /// Level of the batch being read
        level: Level,
        /// Owner of the batch being read
        owner: DomainId,
        /// Underlying record error
        #[source]
        source: RecordError,
    },

    /// Population stopped before or after the end of the file
    #[error("{path:?}: read cursor at byte {position} but file is {length} bytes")]
    TruncatedOrOversizedFile {
        /// File being read
        path: PathBuf,
        /// Read cursor after the last record
        position: u64,
        /// Length of the file
        length: u64,
    },

    /// The octs registered disagree with the counts declared in the headers
    #[error("ownership accounting mismatch: {expected} octs declared, {registered} registered")]
    OwnershipAccountingMismatch {
        /// Sum of the declared counts
        expected: usize,
        /// Octs in the container
        registered: usize,
    },

    /// Domains were populated out of ascending order
    #[error("domain {next} populated after domain {previous}")]
    OwnershipOrder {
        /// Domain populated last
        previous: DomainId,
        /// Domain that came out of order
        next: DomainId,
    },

    /// The chunking strategy is not implemented
    #[error("unsupported chunking strategy: {0}")]
    UnsupportedChunkingStrategy(ChunkingStrategy),

    /// No domain with this id
    #[error("unknown domain: {0}")]
    UnknownDomain(DomainId),

    /// Snapshot parameters cannot describe a snapshot
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// How a selection is split into chunks for payload I/O.
///
/// - `All`: one chunk holding the whole selection.
/// - `Spatial`: one chunk per spatially contiguous block, padded by ghost zones.
/// - `Io`: one chunk per domain file.
///
/// Only `All` is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Whole selection
    All,
    /// Spatial blocks
    Spatial {
        /// Ghost zones around each block
        ghost_zones: usize,
    },
    /// Per domain file
    Io,
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Spatial { ghost_zones } => write!(f, "spatial (ghost zones: {ghost_zones})"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// Options controlling snapshot assembly.
#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// Parse headers and decode grid records of different domains on the rayon pool.
    ///
    /// Batches are always submitted to the octree in ascending domain order.
    pub parallel: bool,
    /// Return [`Error::OwnershipAccountingMismatch`] instead of logging it.
    pub strict_ownership: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            strict_ownership: false,
        }
    }
}

/// Grid topology used to size octs: coarse grid shape and bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTopology {
    /// Number of coarse cells along each axis.
    pub nx: [usize; 3],
    /// Lower corner of the bounding box.
    pub left_edge: [f64; 3],
    /// Upper corner of the bounding box.
    pub right_edge: [f64; 3],
}

impl GridTopology {
    /// Create a topology.
    pub fn new(nx: [usize; 3], left_edge: [f64; 3], right_edge: [f64; 3]) -> Self {
        Self {
            nx,
            left_edge,
            right_edge,
        }
    }

    /// Width of the bounding box along each axis.
    pub fn domain_width(&self) -> [f64; 3] {
        [
            self.right_edge[0] - self.left_edge[0],
            self.right_edge[1] - self.left_edge[1],
            self.right_edge[2] - self.left_edge[2],
        ]
    }

    /// Edge length of an oct at `level` along each axis.
    pub fn oct_width(&self, level: Level) -> [f64; 3] {
        let width = self.domain_width();
        let scale = 2f64.powi(i32::try_from(level).unwrap_or(i32::MAX));
        [
            width[0] / (self.nx[0] as f64 * scale),
            width[1] / (self.nx[1] as f64 * scale),
            width[2] / (self.nx[2] as f64 * scale),
        ]
    }
}
