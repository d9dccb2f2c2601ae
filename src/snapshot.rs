//! Simulation snapshots
use crate::domain::is_file;
use crate::geometry::{Chunk, GeometryHandler};
use crate::octree::RamsesOctreeBuilder;
use crate::traits::{OctreeBuilder, Selector};
use crate::types::{ChunkingStrategy, DomainId, Error, LoadOptions, Result};
use std::path::{Path, PathBuf};

/// Global parameters of a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotParameters {
    /// Path of the snapshot's `info_NNNNN.txt` file
    pub parameter_file: PathBuf,
    /// Number of decomposition domains
    pub ncpu: usize,
    /// Lower corner of the bounding box
    pub domain_left_edge: [f64; 3],
    /// Upper corner of the bounding box
    pub domain_right_edge: [f64; 3],
}

impl SnapshotParameters {
    /// Parameters of a cubic box `[0, boxlen]^3`
    pub fn new(parameter_file: impl Into<PathBuf>, ncpu: usize, boxlen: f64) -> Self {
        Self {
            parameter_file: parameter_file.into(),
            ncpu,
            domain_left_edge: [0.0; 3],
            domain_right_edge: [boxlen; 3],
        }
    }

    /// Replace the bounding box
    pub fn with_edges(mut self, left_edge: [f64; 3], right_edge: [f64; 3]) -> Self {
        self.domain_left_edge = left_edge;
        self.domain_right_edge = right_edge;
        self
    }

    /// Bounding box width along each axis
    pub fn domain_width(&self) -> [f64; 3] {
        [
            self.domain_right_edge[0] - self.domain_left_edge[0],
            self.domain_right_edge[1] - self.domain_left_edge[1],
            self.domain_right_edge[2] - self.domain_left_edge[2],
        ]
    }

    /// Check that the parameters can describe a snapshot
    pub fn validate(&self) -> Result<()> {
        if self.ncpu == 0 {
            return Err(Error::InvalidParameter("ncpu must be positive".into()));
        }
        if self.domain_width().iter().any(|w| w.is_nan() || *w <= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "empty bounding box: {:?} to {:?}",
                self.domain_left_edge, self.domain_right_edge
            )));
        }
        self.output_number()?;
        Ok(())
    }

    /// The `NNNNN` of `info_NNNNN.txt`
    pub fn output_number(&self) -> Result<&str> {
        self.parameter_file
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix("info_"))
            .and_then(|name| name.strip_suffix(".txt"))
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "{:?} is not an info_NNNNN.txt file",
                    self.parameter_file
                ))
            })
    }

    /// Path of the `kind` file (`amr`, `hydro`, `grav` or `part`) of a domain
    pub fn domain_file(&self, kind: &str, domain_id: DomainId) -> Result<PathBuf> {
        let output = self.output_number()?;
        let name = format!("{kind}_{output}.out{domain_id:05}");
        Ok(match self.parameter_file.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        })
    }
}

/// A loaded snapshot: its parameters and the assembled geometry
pub struct Snapshot<B: OctreeBuilder = RamsesOctreeBuilder> {
    parameters: SnapshotParameters,
    handler: GeometryHandler<B>,
}

impl<B: OctreeBuilder> Snapshot<B> {
    /// Read every domain's AMR file and assemble the octree
    pub fn load(parameters: SnapshotParameters, options: LoadOptions) -> Result<Self> {
        let handler = GeometryHandler::initialize(&parameters, options)?;
        Ok(Self {
            parameters,
            handler,
        })
    }

    /// Parameters the snapshot was loaded with
    pub fn parameters(&self) -> &SnapshotParameters {
        &self.parameters
    }

    /// The geometry
    pub fn handler(&self) -> &GeometryHandler<B> {
        &self.handler
    }

    /// The geometry, for cached per-domain selection
    pub fn handler_mut(&mut self) -> &mut GeometryHandler<B> {
        &mut self.handler
    }

    /// Chunks covering everything `selector` selects
    pub fn chunks<S: Selector + ?Sized>(
        &self,
        selector: &S,
        strategy: ChunkingStrategy,
    ) -> Result<Vec<Chunk>> {
        if strategy != ChunkingStrategy::All {
            return Err(Error::UnsupportedChunkingStrategy(strategy));
        }
        let resolved = self.handler.resolve_selection(selector);
        Ok(self.handler.chunk(resolved, strategy)?.collect())
    }

    /// Number of leaf cells `selector` selects
    pub fn cell_count<S: Selector + ?Sized>(&self, selector: &S) -> usize {
        self.handler.count_selection(selector)
    }
}

impl Snapshot {
    /// Does `path` name a parameter file whose first AMR file exists
    pub fn is_valid(path: impl AsRef<Path>) -> bool {
        let parameters = SnapshotParameters::new(path.as_ref(), 1, 1.0);
        match parameters.domain_file("amr", 1) {
            Ok(amr) => is_file(&amr),
            Err(_) => false,
        }
    }
}
