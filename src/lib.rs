//! Ramses octree
//!
//! Reads the per-domain AMR files of a RAMSES snapshot, merges the octs of every domain
//! into one octree and splits selections of that octree into chunks for payload I/O.
//!
//! ```no_run
//! use ramses_octree::selector::RegionSelector;
//! use ramses_octree::snapshot::{Snapshot, SnapshotParameters};
//! use ramses_octree::types::{ChunkingStrategy, LoadOptions};
//!
//! let parameters = SnapshotParameters::new("output_00080/info_00080.txt", 16, 1.0);
//! let snapshot: Snapshot = Snapshot::load(parameters, LoadOptions::default()).unwrap();
//! let region = RegionSelector::new([0.25; 3], [0.75; 3]);
//! for chunk in snapshot.chunks(&region, ChunkingStrategy::All).unwrap() {
//!     println!("{} cells in {} domains", chunk.size(), chunk.subsets().len());
//! }
//! ```
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod domain;
pub mod geometry;
pub mod io;
pub mod octree;
pub mod selector;
pub mod snapshot;
pub mod traits;
pub mod types;
