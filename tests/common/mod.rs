//! Fixtures shared by the integration tests
#![allow(dead_code)]

use ramses_octree::io::AmrFileBuilder;
use ramses_octree::octree::{OctBatch, OctMask};
use ramses_octree::snapshot::SnapshotParameters;
use ramses_octree::traits::{Octree, OctreeBuilder, Selector};
use ramses_octree::types::{DomainId, Error, GridTopology, Level, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cells every oct of a [FlatOctree] contributes to a selection
pub const CELLS_PER_OCT: usize = 8;

/// Grids written to one domain file: `(owner_index, level, positions)`
pub type Grids<'a> = &'a [(usize, Level, &'a [[f64; 3]])];

/// Parameters of a snapshot in `dir` with `ncpu` domains in the unit cube
pub fn parameters(dir: &Path, ncpu: usize) -> SnapshotParameters {
    SnapshotParameters::new(dir.join("info_00001.txt"), ncpu, 1.0)
}

/// Write the AMR file of `domain_id`
pub fn write_domain(
    parameters: &SnapshotParameters,
    domain_id: DomainId,
    nlevelmax: usize,
    nx: [usize; 3],
    grids: Grids,
) {
    let mut amr = AmrFileBuilder::new(parameters.ncpu, nlevelmax).with_nx(nx);
    for (owner_index, level, positions) in grids {
        amr.add_grids(*owner_index, *level, positions);
    }
    amr.write_to_path(parameters.domain_file("amr", domain_id).unwrap())
        .unwrap();
}

/// Builder that registers every submitted oct without deduplication and records the
/// batches it was given
#[derive(Debug)]
pub struct RecordingBuilder {
    topology: GridTopology,
    counts: Vec<usize>,
    batches: Vec<(DomainId, Level, usize)>,
}

impl OctreeBuilder for RecordingBuilder {
    type Octree = FlatOctree;

    fn new(topology: GridTopology) -> Self {
        Self {
            topology,
            counts: vec![],
            batches: vec![],
        }
    }

    fn preallocate(&mut self, capacities: &[usize]) {
        self.counts = vec![0; capacities.len()];
    }

    fn add(&mut self, batch: &OctBatch) -> usize {
        self.batches.push((batch.owner, batch.level, batch.len()));
        match batch
            .owner
            .checked_sub(1)
            .and_then(|i| self.counts.get_mut(i))
        {
            Some(count) => {
                *count += batch.len();
                batch.len()
            }
            None => 0,
        }
    }

    fn noct(&self) -> usize {
        self.counts.iter().sum()
    }

    fn finish(self) -> FlatOctree {
        FlatOctree {
            topology: self.topology,
            counts: self.counts,
            batches: self.batches,
            select_calls: AtomicUsize::new(0),
            domain_select_calls: AtomicUsize::new(0),
        }
    }
}

/// Octree without geometry: a selector takes every oct or none, and every oct
/// contributes [CELLS_PER_OCT] cells
#[derive(Debug)]
pub struct FlatOctree {
    topology: GridTopology,
    counts: Vec<usize>,
    batches: Vec<(DomainId, Level, usize)>,
    select_calls: AtomicUsize,
    domain_select_calls: AtomicUsize,
}

impl FlatOctree {
    /// `(owner, level, size)` of every batch, in submission order
    pub fn batches(&self) -> &[(DomainId, Level, usize)] {
        &self.batches
    }

    /// Number of calls to [Octree::select]
    pub fn select_calls(&self) -> usize {
        self.select_calls.load(Ordering::SeqCst)
    }

    /// Number of calls to [Octree::select_domain]
    pub fn domain_select_calls(&self) -> usize {
        self.domain_select_calls.load(Ordering::SeqCst)
    }

    fn check(&self, domain: DomainId) -> Result<usize> {
        domain
            .checked_sub(1)
            .and_then(|i| self.counts.get(i))
            .copied()
            .ok_or(Error::UnknownDomain(domain))
    }

    fn takes_all<S: Selector + ?Sized>(&self, selector: &S) -> bool {
        selector.select_bbox(self.topology.left_edge, self.topology.right_edge)
    }

    fn cells<T: Clone>(&self, domain: DomainId, indices: &[usize], value: T) -> Result<Vec<T>> {
        self.check(domain)?;
        Ok(vec![value; indices.len() * CELLS_PER_OCT])
    }
}

impl Octree for FlatOctree {
    fn topology(&self) -> &GridTopology {
        &self.topology
    }

    fn ndomains(&self) -> usize {
        self.counts.len()
    }

    fn noct(&self) -> usize {
        self.counts.iter().sum()
    }

    fn domain_noct(&self, domain: DomainId) -> Result<usize> {
        self.check(domain)
    }

    fn select<S: Selector + ?Sized>(&self, selector: &S) -> OctMask {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        let all = self.takes_all(selector);
        (0..self.noct()).map(|_| all).collect()
    }

    fn select_domain<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        selector: &S,
    ) -> Result<OctMask> {
        self.domain_select_calls.fetch_add(1, Ordering::SeqCst);
        let noct = self.check(domain)?;
        let all = self.takes_all(selector);
        Ok((0..noct).map(|_| all).collect())
    }

    fn split(&self, mask: &OctMask) -> Vec<Vec<usize>> {
        let mut start = 0;
        self.counts
            .iter()
            .map(|count| {
                let local = (0..*count).filter(|i| mask.get(start + i)).collect();
                start += count;
                local
            })
            .collect()
    }

    fn count_cells<S: Selector + ?Sized>(&self, _selector: &S, mask: &OctMask) -> usize {
        mask.count() * CELLS_PER_OCT
    }

    fn icoords<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        _selector: &S,
    ) -> Result<Vec<[i64; 3]>> {
        self.cells(domain, indices, [0; 3])
    }

    fn fcoords<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        _selector: &S,
    ) -> Result<Vec<[f64; 3]>> {
        self.cells(domain, indices, [0.0; 3])
    }

    fn fwidth<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        _selector: &S,
    ) -> Result<Vec<[f64; 3]>> {
        self.cells(domain, indices, [0.0; 3])
    }

    fn ires<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        _selector: &S,
    ) -> Result<Vec<Level>> {
        self.cells(domain, indices, 0)
    }
}
