//! RAMSES octree container
use super::{octant_offset, OctBatch, OctMask};
use crate::traits::{Octree, OctreeBuilder, Selector};
use crate::types::{DomainId, Error, GridTopology, Level, Result};
use log::debug;
use std::collections::HashSet;
use std::ops::Range;

/// Position of an oct in the tree: its level and integer coordinates at that level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct OctKey {
    level: Level,
    ipos: [i64; 3],
}

impl OctKey {
    fn child(&self, octant: usize) -> Self {
        let offset = octant_offset(octant);
        Self {
            level: self.level + 1,
            ipos: [
                2 * self.ipos[0] + offset[0] as i64,
                2 * self.ipos[1] + offset[1] as i64,
                2 * self.ipos[2] + offset[2] as i64,
            ],
        }
    }
}

/// A registered oct
#[derive(Debug, Clone, PartialEq)]
pub struct Oct {
    /// Grid index in the domain file it was read from
    pub file_index: i64,
    /// Refinement level
    pub level: Level,
    /// Integer coordinates at `level`
    pub ipos: [i64; 3],
    /// Centre, scaled by the domain width
    pub center: [f64; 3],
    /// One-based owning domain of each octant
    pub owner_map: [i32; 8],
    refined: u8,
}

impl Oct {
    /// Is the child cell `octant` refined into another oct
    pub fn is_refined(&self, octant: usize) -> bool {
        self.refined & (1 << octant) != 0
    }

    fn key(&self) -> OctKey {
        OctKey {
            level: self.level,
            ipos: self.ipos,
        }
    }
}

/// Builder for a [RamsesOctree]
///
/// Octs are deduplicated by position: a ghost replica submitted by one reader is not
/// registered again when its owner submits it.
#[derive(Debug)]
pub struct RamsesOctreeBuilder {
    topology: GridTopology,
    domains: Vec<Vec<Oct>>,
    keys: HashSet<OctKey>,
}

impl OctreeBuilder for RamsesOctreeBuilder {
    type Octree = RamsesOctree;

    fn new(topology: GridTopology) -> Self {
        Self {
            topology,
            domains: vec![],
            keys: HashSet::new(),
        }
    }

    fn preallocate(&mut self, capacities: &[usize]) {
        self.domains = capacities.iter().map(|c| Vec::with_capacity(*c)).collect();
        self.keys.reserve(capacities.iter().sum());
    }

    fn add(&mut self, batch: &OctBatch) -> usize {
        if batch.owner == 0 || batch.owner > self.domains.len() {
            debug!(
                "Ignoring {} octs of boundary domain {} at level {}",
                batch.len(),
                batch.owner,
                batch.level
            );
            return 0;
        }
        let width = self.topology.oct_width(batch.level);
        let octs = &mut self.domains[batch.owner - 1];
        let mut added = 0;
        for ((index, center), owner_map) in batch
            .indices
            .iter()
            .zip(&batch.positions)
            .zip(&batch.owner_map)
        {
            let ipos = [
                (center[0] / width[0]).floor() as i64,
                (center[1] / width[1]).floor() as i64,
                (center[2] / width[2]).floor() as i64,
            ];
            let key = OctKey {
                level: batch.level,
                ipos,
            };
            if self.keys.insert(key) {
                octs.push(Oct {
                    file_index: *index,
                    level: batch.level,
                    ipos,
                    center: *center,
                    owner_map: *owner_map,
                    refined: 0,
                });
                added += 1;
            }
        }
        added
    }

    fn noct(&self) -> usize {
        self.keys.len()
    }

    fn finish(self) -> RamsesOctree {
        let mut offsets = Vec::with_capacity(self.domains.len() + 1);
        offsets.push(0);
        let mut octs = Vec::with_capacity(self.keys.len());
        for domain in self.domains {
            octs.extend(domain);
            offsets.push(octs.len());
        }
        for oct in octs.iter_mut() {
            let key = oct.key();
            for octant in 0..8 {
                if self.keys.contains(&key.child(octant)) {
                    oct.refined |= 1 << octant;
                }
            }
        }
        RamsesOctree {
            topology: self.topology,
            octs,
            offsets,
        }
    }
}

/// Octree over every domain of a snapshot
#[derive(Debug)]
pub struct RamsesOctree {
    topology: GridTopology,
    octs: Vec<Oct>,
    offsets: Vec<usize>,
}

impl RamsesOctree {
    fn domain_range(&self, domain: DomainId) -> Result<Range<usize>> {
        if domain == 0 || domain >= self.offsets.len() {
            return Err(Error::UnknownDomain(domain));
        }
        Ok(self.offsets[domain - 1]..self.offsets[domain])
    }

    /// All octs owned by a domain, in registration order
    pub fn octs(&self, domain: DomainId) -> Result<&[Oct]> {
        Ok(&self.octs[self.domain_range(domain)?])
    }

    fn cell_width(&self, level: Level) -> [f64; 3] {
        let w = self.topology.oct_width(level);
        [0.5 * w[0], 0.5 * w[1], 0.5 * w[2]]
    }

    fn cell_center(&self, oct: &Oct, octant: usize) -> [f64; 3] {
        let w = self.cell_width(oct.level);
        let offset = octant_offset(octant);
        [
            oct.center[0] + (offset[0] as f64 - 0.5) * w[0],
            oct.center[1] + (offset[1] as f64 - 0.5) * w[1],
            oct.center[2] + (offset[2] as f64 - 0.5) * w[2],
        ]
    }

    /// Call `f` for every selected leaf cell of the given octs.
    fn for_each_cell<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
        mut f: impl FnMut(&Oct, usize),
    ) -> Result<()> {
        let octs = self.octs(domain)?;
        for index in indices {
            let oct = octs.get(*index).ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "oct index {index} out of range for domain {domain}"
                ))
            })?;
            let width = self.cell_width(oct.level);
            for octant in 0..8 {
                if !oct.is_refined(octant)
                    && selector.select_cell(self.cell_center(oct, octant), width)
                {
                    f(oct, octant);
                }
            }
        }
        Ok(())
    }

    fn select_range<S: Selector + ?Sized>(&self, range: Range<usize>, selector: &S) -> OctMask {
        self.octs[range]
            .iter()
            .map(|oct| selector.select_oct(oct.center, self.topology.oct_width(oct.level)))
            .collect()
    }
}

impl Octree for RamsesOctree {
    fn topology(&self) -> &GridTopology {
        &self.topology
    }

    fn ndomains(&self) -> usize {
        self.offsets.len() - 1
    }

    fn noct(&self) -> usize {
        self.octs.len()
    }

    fn domain_noct(&self, domain: DomainId) -> Result<usize> {
        Ok(self.domain_range(domain)?.len())
    }

    fn select<S: Selector + ?Sized>(&self, selector: &S) -> OctMask {
        self.select_range(0..self.octs.len(), selector)
    }

    fn select_domain<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        selector: &S,
    ) -> Result<OctMask> {
        Ok(self.select_range(self.domain_range(domain)?, selector))
    }

    fn split(&self, mask: &OctMask) -> Vec<Vec<usize>> {
        self.offsets
            .windows(2)
            .map(|w| {
                (w[0]..w[1])
                    .filter(|i| mask.get(*i))
                    .map(|i| i - w[0])
                    .collect()
            })
            .collect()
    }

    fn count_cells<S: Selector + ?Sized>(&self, selector: &S, mask: &OctMask) -> usize {
        mask.iter_selected()
            .filter_map(|i| self.octs.get(i))
            .map(|oct| {
                let width = self.cell_width(oct.level);
                (0..8)
                    .filter(|octant| {
                        !oct.is_refined(*octant)
                            && selector.select_cell(self.cell_center(oct, *octant), width)
                    })
                    .count()
            })
            .sum()
    }

    fn icoords<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<[i64; 3]>> {
        let mut out = vec![];
        self.for_each_cell(domain, indices, selector, |oct, octant| {
            let offset = octant_offset(octant);
            out.push([
                2 * oct.ipos[0] + offset[0] as i64,
                2 * oct.ipos[1] + offset[1] as i64,
                2 * oct.ipos[2] + offset[2] as i64,
            ]);
        })?;
        Ok(out)
    }

    fn fcoords<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<[f64; 3]>> {
        let mut out = vec![];
        self.for_each_cell(domain, indices, selector, |oct, octant| {
            out.push(self.cell_center(oct, octant));
        })?;
        Ok(out)
    }

    fn fwidth<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<[f64; 3]>> {
        let mut out = vec![];
        self.for_each_cell(domain, indices, selector, |oct, _| {
            out.push(self.cell_width(oct.level));
        })?;
        Ok(out)
    }

    fn ires<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<Level>> {
        let mut out = vec![];
        self.for_each_cell(domain, indices, selector, |oct, _| out.push(oct.level))?;
        Ok(out)
    }
}
