//! Writer for synthetic AMR domain files
//!
//! Produces files with the same record layout RAMSES writes, so that readers can be
//! exercised without simulation output on disk.
use crate::io::record::RecordWriter;
use crate::types::Level;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Width of the Fortran character variable holding the ordering scheme.
const ORDERING_WIDTH: usize = 128;

/// Grids written for one `(level, owner)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridBatch {
    /// File grid indices
    pub indices: Vec<i32>,
    /// Oct centres in box units, before scaling by the domain width
    pub positions: Vec<[f64; 3]>,
    /// Child grid index per octant
    pub children: Vec<[i32; 8]>,
    /// One-based owning domain per octant
    pub owner_map: Vec<[i32; 8]>,
}

impl GridBatch {
    /// Number of grids
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Are there no grids
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Builder of a single domain's `amr_*.out*` file.
#[derive(Debug, Clone)]
pub struct AmrFileBuilder {
    ncpu: usize,
    nlevelmax: usize,
    nboundary: usize,
    nx: [usize; 3],
    boxlen: f64,
    ordering: String,
    next_index: i32,
    grids: BTreeMap<(Level, usize), GridBatch>,
}

impl AmrFileBuilder {
    /// An empty file for a snapshot of `ncpu` domains and `nlevelmax` levels
    pub fn new(ncpu: usize, nlevelmax: usize) -> Self {
        Self {
            ncpu,
            nlevelmax,
            nboundary: 0,
            nx: [1, 1, 1],
            boxlen: 1.0,
            ordering: "hilbert".to_string(),
            next_index: 1,
            grids: BTreeMap::new(),
        }
    }

    /// Set the number of boundary domains
    pub fn with_boundaries(mut self, nboundary: usize) -> Self {
        self.nboundary = nboundary;
        self
    }

    /// Set the coarse grid shape
    pub fn with_nx(mut self, nx: [usize; 3]) -> Self {
        self.nx = nx;
        self
    }

    /// Set the box length
    pub fn with_boxlen(mut self, boxlen: f64) -> Self {
        self.boxlen = boxlen;
        self
    }

    /// Set the ordering scheme name
    pub fn with_ordering(mut self, ordering: &str) -> Self {
        self.ordering = ordering.to_string();
        self
    }

    /// Append grids owned by zero-based `owner_index` at `level`.
    ///
    /// Grid indices are assigned sequentially and every octant is marked as owned
    /// by `owner_index + 1`.
    pub fn add_grids(
        &mut self,
        owner_index: usize,
        level: Level,
        positions: &[[f64; 3]],
    ) -> &mut Self {
        let owner = owner_index as i32 + 1;
        let batch = self.grids.entry((level, owner_index)).or_default();
        for position in positions {
            batch.indices.push(self.next_index);
            batch.positions.push(*position);
            batch.children.push([0; 8]);
            batch.owner_map.push([owner; 8]);
            self.next_index += 1;
        }
        self
    }

    /// Grids that will be written for `(level, owner_index)`.
    pub fn grids(&self, owner_index: usize, level: Level) -> Option<&GridBatch> {
        self.grids.get(&(level, owner_index))
    }

    /// Grid counts of real domains, flattened as `level * ncpu + cpu`.
    pub fn numbl(&self) -> Vec<i32> {
        let mut numbl = vec![0; self.nlevelmax * self.ncpu];
        for ((level, owner), batch) in &self.grids {
            if *owner < self.ncpu {
                numbl[level * self.ncpu + owner] = batch.len() as i32;
            }
        }
        numbl
    }

    /// Grid counts of boundary domains, flattened as `boundary + nboundary * level`.
    pub fn ngridbound(&self) -> Vec<i32> {
        let mut ngridbound = vec![0; self.nlevelmax * self.nboundary];
        for ((level, owner), batch) in &self.grids {
            if *owner >= self.ncpu {
                ngridbound[owner - self.ncpu + self.nboundary * level] = batch.len() as i32;
            }
        }
        ngridbound
    }

    /// Write the file, returning the byte offset of the first grid record.
    pub fn write<W: Write>(&self, out: W) -> std::io::Result<u64> {
        let mut w = RecordWriter::new(out);
        let ngrid: usize = self.grids.values().map(GridBatch::len).sum();
        let zeros_i = |n: usize| vec![0i32; n];
        let zeros_d = |n: usize| vec![0.0f64; n];

        w.write_vector(&[self.ncpu as i32])?;
        w.write_vector(&[3i32])?;
        w.write_vector(&self.nx.map(|n| n as i32))?;
        w.write_vector(&[self.nlevelmax as i32])?;
        w.write_vector(&[ngrid.max(1) as i32])?;
        w.write_vector(&[self.nboundary as i32])?;
        w.write_vector(&[ngrid as i32])?;
        w.write_vector(&[self.boxlen])?;
        w.write_vector(&[1i32, 1, 1])?;

        w.write_vector(&[0.0f64])?;
        w.write_vector(&[1.0f64])?;
        w.write_vector(&[0.0f64])?;
        w.write_vector(&zeros_d(self.nlevelmax))?;
        w.write_vector(&zeros_d(self.nlevelmax))?;
        w.write_vector(&zeros_i(2))?;
        w.write_vector(&zeros_d(3))?;
        w.write_vector(&zeros_d(7))?;
        w.write_vector(&zeros_d(5))?;
        w.write_vector(&self.numbl())?;

        // headl/taill
        w.write_vector(&zeros_i(self.nlevelmax * self.ncpu * 2))?;
        if self.nboundary > 0 {
            w.write_vector(&zeros_i(self.nlevelmax * self.nboundary))?;
            w.write_vector(&zeros_i(self.nlevelmax * self.nboundary))?;
            w.write_vector(&self.ngridbound())?;
        }
        w.write_vector(&[0i32, 0, 0, 0, 0])?;
        let mut ordering = self.ordering.clone().into_bytes();
        ordering.resize(ORDERING_WIDTH.max(ordering.len()), b' ');
        w.write_vector(&ordering)?;
        w.write_vector(&zeros_d(self.ncpu + 1))?;
        let ncoarse = self.nx.iter().product::<usize>();
        for _ in 0..3 {
            w.write_vector(&zeros_i(ncoarse))?;
        }
        let amr_offset = w.position();

        for level in 0..self.nlevelmax {
            for owner in 0..self.ncpu + self.nboundary {
                let Some(batch) = self.grids.get(&(level, owner)) else {
                    continue;
                };
                if batch.is_empty() {
                    continue;
                }
                let ng = batch.len();
                w.write_vector(&batch.indices)?;
                w.write_vector(&zeros_i(ng))?;
                w.write_vector(&zeros_i(ng))?;
                for axis in 0..3 {
                    let x = batch.positions.iter().map(|p| p[axis]).collect::<Vec<_>>();
                    w.write_vector(&x)?;
                }
                w.write_vector(&zeros_i(ng))?;
                for _ in 0..6 {
                    w.write_vector(&zeros_i(ng))?;
                }
                for octant in 0..8 {
                    let c = batch.children.iter().map(|c| c[octant]).collect::<Vec<_>>();
                    w.write_vector(&c)?;
                }
                for octant in 0..8 {
                    let c = batch.owner_map.iter().map(|c| c[octant]).collect::<Vec<_>>();
                    w.write_vector(&c)?;
                }
                for _ in 0..8 {
                    w.write_vector(&zeros_i(ng))?;
                }
            }
        }
        w.flush()?;
        Ok(amr_offset)
    }

    /// Write the file to `path`, returning the byte offset of the first grid record.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> std::io::Result<u64> {
        let file = File::create(path)?;
        self.write(BufWriter::new(file))
    }
}
