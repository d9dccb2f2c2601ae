//! Domain file reader
use crate::geometry::OwnershipLedger;
use crate::io::header::{AmrHeader, HeaderError};
use crate::io::record::{RecordError, RecordReader};
use crate::io::schema::RamsesHeaderSchema;
use crate::octree::{OctBatch, OctMask};
use crate::selector::SelectorId;
use crate::snapshot::SnapshotParameters;
use crate::traits::{HeaderSchema, Octree, OctreeBuilder, Selector};
use crate::types::{DomainId, Error, Level, Result};
use itertools::iproduct;
use log::{debug, trace};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Payload files of one domain. Only the AMR file is read here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPaths {
    /// Grid hierarchy
    pub amr: PathBuf,
    /// Hydrodynamic fields
    pub hydro: PathBuf,
    /// Gravity fields
    pub grav: PathBuf,
    /// Particles
    pub part: PathBuf,
}

impl DomainPaths {
    /// Paths of `domain_id` following the snapshot's naming convention
    pub fn new(parameters: &SnapshotParameters, domain_id: DomainId) -> Result<Self> {
        Ok(Self {
            amr: parameters.domain_file("amr", domain_id)?,
            hydro: parameters.domain_file("hydro", domain_id)?,
            grav: parameters.domain_file("grav", domain_id)?,
            part: parameters.domain_file("part", domain_id)?,
        })
    }
}

/// One decomposition domain's AMR file
///
/// The header is parsed when the file is opened; grid records are streamed once, into an
/// [OctreeBuilder], by [DomainFile::populate].
#[derive(Debug)]
pub struct DomainFile {
    domain_id: DomainId,
    paths: DomainPaths,
    header: AmrHeader,
    amr_offset: u64,
    local_oct_count: usize,
    last_selection: Option<(SelectorId, Arc<OctMask>)>,
}

impl DomainFile {
    /// Open domain `domain_id` of a snapshot and parse its header
    pub fn open(parameters: &SnapshotParameters, domain_id: DomainId) -> Result<Self> {
        let paths = DomainPaths::new(parameters, domain_id)?;
        let file = Self::open_with_schema(domain_id, paths, &RamsesHeaderSchema)?;
        if file.header.ncpu != parameters.ncpu {
            return Err(Error::CorruptHeader {
                path: file.paths.amr.clone(),
                source: HeaderError::InvalidValue {
                    field: "ncpu",
                    reason: "disagrees with the snapshot domain count",
                },
            });
        }
        Ok(file)
    }

    /// Open a domain file whose header follows `schema`
    pub fn open_with_schema<H: HeaderSchema + ?Sized>(
        domain_id: DomainId,
        paths: DomainPaths,
        schema: &H,
    ) -> Result<Self> {
        if domain_id == 0 {
            return Err(Error::UnknownDomain(domain_id));
        }
        let mut reader = RecordReader::new(BufReader::new(File::open(&paths.amr)?))?;
        let header = AmrHeader::read(&mut reader, schema).map_err(|source| Error::CorruptHeader {
            path: paths.amr.clone(),
            source,
        })?;
        let local_oct_count = header
            .local_oct_count(domain_id)
            .ok_or(Error::UnknownDomain(domain_id))?;
        let amr_offset = reader.position();
        debug!(
            "Parsed header of domain {} ({} octs, grids at byte {})",
            domain_id, local_oct_count, amr_offset
        );
        Ok(Self {
            domain_id,
            paths,
            header,
            amr_offset,
            local_oct_count,
            last_selection: None,
        })
    }

    /// One-based domain id
    pub fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    /// Payload file paths
    pub fn paths(&self) -> &DomainPaths {
        &self.paths
    }

    /// Parsed AMR header
    pub fn header(&self) -> &AmrHeader {
        &self.header
    }

    /// Byte offset of the first grid record
    pub fn amr_offset(&self) -> u64 {
        self.amr_offset
    }

    /// Number of octs this domain owns
    pub fn local_oct_count(&self) -> usize {
        self.local_oct_count
    }

    /// Number of grids written for zero-based `owner_index` at `level`, or `None` when
    /// either is out of range
    pub fn grid_count(&self, owner_index: usize, level: Level) -> Option<usize> {
        self.header.grid_count(owner_index, level)
    }

    /// Decode every grid record in file order, passing each `(level, owner)` batch to `f`.
    ///
    /// Positions are scaled by `domain_width` but not translated by the domain's left
    /// edge. The file must be consumed exactly.
    pub fn for_each_batch(
        &self,
        domain_width: [f64; 3],
        mut f: impl FnMut(OctBatch) -> Result<()>,
    ) -> Result<()> {
        let path = &self.paths.amr;
        let mut reader = RecordReader::new(BufReader::new(File::open(path)?))?;
        let length = reader.stream_len()?;
        reader.seek_to(self.amr_offset)?;
        debug!(
            "Reading domain AMR {:4} ({:.3e})",
            self.domain_id, self.local_oct_count as f64
        );

        let nowners = self.header.ncpu + self.header.nboundary;
        for (level, owner_index) in iproduct!(0..self.header.nlevelmax, 0..nowners) {
            let ng = self.grid_count(owner_index, level).unwrap_or(0);
            if ng == 0 {
                continue;
            }
            let batch = read_grids(&mut reader, owner_index + 1, level, ng, domain_width)
                .map_err(|err| self.record_error(err, level, owner_index + 1, length))?;
            f(batch)?;
        }

        let position = reader.position();
        if position != length {
            return Err(Error::TruncatedOrOversizedFile {
                path: path.clone(),
                position,
                length,
            });
        }
        Ok(())
    }

    /// Decode every grid record, accepted or not
    pub fn read_batches(&self, domain_width: [f64; 3]) -> Result<Vec<OctBatch>> {
        let mut batches = vec![];
        self.for_each_batch(domain_width, |batch| {
            batches.push(batch);
            Ok(())
        })?;
        Ok(batches)
    }

    /// Decode every grid record, keeping only the batches the ownership rule accepts.
    ///
    /// Also returns the number of octs in the dropped replica batches.
    pub fn read_owned_batches(&self, domain_width: [f64; 3]) -> Result<(Vec<OctBatch>, usize)> {
        let mut batches = vec![];
        let mut discarded = 0;
        self.for_each_batch(domain_width, |batch| {
            if OwnershipLedger::accepts(self.domain_id, batch.owner) {
                batches.push(batch);
            } else {
                discarded += batch.len();
            }
            Ok(())
        })?;
        Ok((batches, discarded))
    }

    /// Stream this domain's grid records into `builder`, returning the number of octs
    /// newly registered.
    ///
    /// Which batches are submitted is decided by `ledger`.
    pub fn populate<B: OctreeBuilder>(
        &self,
        builder: &mut B,
        ledger: &mut OwnershipLedger,
        domain_width: [f64; 3],
    ) -> Result<usize> {
        ledger.begin_domain(self.domain_id)?;
        let mut registered = 0;
        self.for_each_batch(domain_width, |batch| {
            registered += ledger.submit(self.domain_id, builder, &batch)?;
            Ok(())
        })?;
        trace!("Domain {} registered {} octs", self.domain_id, registered);
        Ok(registered)
    }

    /// Mask of this domain's octs matching `selector`
    ///
    /// The last mask is cached against the selector's id and returned as-is when the
    /// same selector is used again.
    pub fn select<O: Octree, S: Selector + ?Sized>(
        &mut self,
        octree: &O,
        selector: &S,
    ) -> Result<Arc<OctMask>> {
        if let Some((id, mask)) = &self.last_selection {
            if *id == selector.id() {
                return Ok(Arc::clone(mask));
            }
        }
        let mask = Arc::new(octree.select_domain(self.domain_id, selector)?);
        self.last_selection = Some((selector.id(), Arc::clone(&mask)));
        Ok(mask)
    }

    /// Number of this domain's octs matching `selector`
    pub fn count<O: Octree, S: Selector + ?Sized>(
        &mut self,
        octree: &O,
        selector: &S,
    ) -> Result<usize> {
        match &self.last_selection {
            Some((id, mask)) if *id == selector.id() => Ok(mask.count()),
            _ => Ok(self.select(octree, selector)?.count()),
        }
    }

    /// Forget the cached mask, which belongs to a previous octree
    pub(crate) fn clear_selection(&mut self) {
        self.last_selection = None;
    }

    fn record_error(&self, err: RecordError, level: Level, owner: DomainId, length: u64) -> Error {
        match err {
            RecordError::UnexpectedEof { at } => Error::TruncatedOrOversizedFile {
                path: self.paths.amr.clone(),
                position: at,
                length,
            },
            RecordError::Io(err) => Error::Io(err),
            other => Error::CorruptRecord {
                path: self.paths.amr.clone(),
                level,
                owner,
                source: other,
            },
        }
    }
}

/// Read the records of `ng` grids owned by `owner` at `level`.
fn read_grids<R: Read + Seek>(
    reader: &mut RecordReader<R>,
    owner: DomainId,
    level: Level,
    ng: usize,
    domain_width: [f64; 3],
) -> std::result::Result<OctBatch, RecordError> {
    let indices = reader
        .read_exact_vector::<i32>(ng)?
        .into_iter()
        .map(i64::from)
        .collect();
    // next, prev
    reader.skip(2)?;
    let mut positions = vec![[0.0; 3]; ng];
    for (axis, width) in domain_width.iter().enumerate() {
        let x = reader.read_exact_vector::<f64>(ng)?;
        for (p, x) in positions.iter_mut().zip(x) {
            p[axis] = x * width;
        }
    }
    // parents
    reader.read_exact_vector::<i32>(ng)?;
    // neighbours
    reader.skip(6)?;
    // children
    for _ in 0..8 {
        reader.read_exact_vector::<i32>(ng)?;
    }
    let mut owner_map = vec![[0; 8]; ng];
    for octant in 0..8 {
        let cpu = reader.read_exact_vector::<i32>(ng)?;
        for (m, c) in owner_map.iter_mut().zip(cpu) {
            m[octant] = c;
        }
    }
    // refinement map
    for _ in 0..8 {
        reader.read_exact_vector::<i32>(ng)?;
    }
    Ok(OctBatch {
        owner,
        level,
        indices,
        positions,
        owner_map,
    })
}

/// Does `path` exist as a regular file
pub(crate) fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::writer::AmrFileBuilder;
    use crate::octree::RamsesOctreeBuilder;
    use crate::types::GridTopology;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn write_domain(dir: &TempDir, builder: &AmrFileBuilder, domain_id: DomainId) -> DomainPaths {
        let parameters = SnapshotParameters::new(dir.path().join("info_00001.txt"), 2, 1.0);
        let paths = DomainPaths::new(&parameters, domain_id).unwrap();
        builder.write_to_path(&paths.amr).unwrap();
        paths
    }

    #[test]
    fn test_header_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = AmrFileBuilder::new(2, 2).with_boundaries(1).with_boxlen(2.0);
        b.add_grids(0, 0, &[[0.5; 3]]);
        b.add_grids(1, 1, &[[0.25; 3], [0.75; 3]]);
        b.add_grids(2, 1, &[[0.75, 0.25, 0.25]]);
        let parameters = SnapshotParameters::new(dir.path().join("info_00001.txt"), 2, 2.0);
        let paths = DomainPaths::new(&parameters, 2).unwrap();
        let offset = b.write_to_path(&paths.amr).unwrap();

        let domain = DomainFile::open(&parameters, 2).unwrap();
        assert_eq!(domain.amr_offset(), offset);
        assert_eq!(domain.local_oct_count(), 2);
        assert_eq!(domain.header().ncpu, 2);
        assert_eq!(domain.header().nlevelmax, 2);
        assert_eq!(domain.header().nboundary, 1);
        assert_eq!(domain.header().ordering, "hilbert");
        assert_relative_eq!(domain.header().boxlen, 2.0);
        assert_eq!(domain.header().ngridbound(), &[0, 1]);
        assert_eq!(domain.grid_count(0, 0), Some(1));
        assert_eq!(domain.grid_count(1, 1), Some(2));
        assert_eq!(domain.grid_count(2, 0), Some(0));
        assert_eq!(domain.grid_count(2, 1), Some(1));
        assert_eq!(domain.grid_count(3, 0), None);
        assert_eq!(domain.grid_count(0, 2), None);
        assert_eq!(domain.paths().hydro, dir.path().join("hydro_00001.out00002"));
    }

    #[test]
    fn test_read_batches_scales_positions() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = AmrFileBuilder::new(2, 1);
        b.add_grids(0, 0, &[[0.25, 0.5, 0.75]]);
        b.add_grids(1, 0, &[[0.75; 3]]);
        let paths = write_domain(&dir, &b, 1);
        let domain = DomainFile::open_with_schema(1, paths, &RamsesHeaderSchema).unwrap();

        let batches = domain.read_batches([2.0, 4.0, 8.0]).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].owner, 1);
        assert_eq!(batches[1].owner, 2);
        assert_eq!(batches[0].indices, vec![1]);
        assert_eq!(batches[1].owner_map, vec![[2; 8]]);
        assert_relative_eq!(batches[0].positions[0][0], 0.5);
        assert_relative_eq!(batches[0].positions[0][1], 2.0);
        assert_relative_eq!(batches[0].positions[0][2], 6.0);

        let domain = DomainFile::open_with_schema(2, write_domain(&dir, &b, 2), &RamsesHeaderSchema)
            .unwrap();
        let (owned, discarded) = domain.read_owned_batches([1.0; 3]).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].owner, 2);
        assert_eq!(discarded, 1);
    }

    #[test]
    fn test_populate_skips_lower_ghosts() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = AmrFileBuilder::new(2, 1);
        b.add_grids(0, 0, &[[0.25; 3]]);
        b.add_grids(1, 0, &[[0.75; 3]]);
        let paths = write_domain(&dir, &b, 2);
        let domain = DomainFile::open_with_schema(2, paths, &RamsesHeaderSchema).unwrap();

        let topology = GridTopology::new([2, 2, 2], [0.0; 3], [1.0; 3]);
        let mut builder = RamsesOctreeBuilder::new(topology);
        builder.preallocate(&[1, 1]);
        let mut ledger = OwnershipLedger::new(2);
        ledger.begin_domain(1).unwrap();
        let registered = domain.populate(&mut builder, &mut ledger, [1.0; 3]).unwrap();
        assert_eq!(registered, 1);
        assert_eq!(ledger.discarded(), 1);
        let tree = builder.finish();
        assert_eq!(tree.domain_noct(1).unwrap(), 0);
        assert_eq!(tree.domain_noct(2).unwrap(), 1);
    }

    #[test]
    fn test_truncated_and_oversized() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = AmrFileBuilder::new(2, 1);
        b.add_grids(0, 0, &[[0.25; 3]]);
        let paths = write_domain(&dir, &b, 1);
        let mut bytes = std::fs::read(&paths.amr).unwrap();

        bytes.pop();
        std::fs::write(&paths.amr, &bytes).unwrap();
        let domain = DomainFile::open_with_schema(1, paths.clone(), &RamsesHeaderSchema).unwrap();
        assert!(matches!(
            domain.read_batches([1.0; 3]),
            Err(Error::TruncatedOrOversizedFile { .. })
        ));

        bytes.extend_from_slice(&[0, 0, 0, 0, 0]);
        std::fs::write(&paths.amr, &bytes).unwrap();
        let domain = DomainFile::open_with_schema(1, paths, &RamsesHeaderSchema).unwrap();
        match domain.read_batches([1.0; 3]) {
            Err(Error::TruncatedOrOversizedFile {
                position, length, ..
            }) => assert_eq!(position + 4, length),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_header() {
        let dir = tempfile::tempdir().unwrap();
        let b = AmrFileBuilder::new(2, 1);
        let paths = write_domain(&dir, &b, 1);
        let mut bytes = std::fs::read(&paths.amr).unwrap();
        // Trailing marker of the `ncpu` record
        bytes[8] = 9;
        std::fs::write(&paths.amr, &bytes).unwrap();
        assert!(matches!(
            DomainFile::open_with_schema(1, paths, &RamsesHeaderSchema),
            Err(Error::CorruptHeader {
                source: HeaderError::Record(RecordError::MarkerMismatch { .. }),
                ..
            })
        ));
    }
}
