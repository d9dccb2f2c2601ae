//! Octree container
use super::Selector;
use crate::octree::{OctBatch, OctMask};
use crate::types::{DomainId, GridTopology, Level, Result};

pub trait OctreeBuilder {
    //! Accumulates ownership-tagged oct batches and finalises into an [Octree]
    //!
    //! Batches for one domain are submitted together, in ascending domain order.

    /// The type of the octree that the builder creates
    type Octree: Octree;

    /// Create a new builder for a grid topology
    fn new(topology: GridTopology) -> Self;

    /// Reserve one slot per domain; `capacities[i]` is the oct count of domain `i + 1`
    fn preallocate(&mut self, capacities: &[usize]);

    /// Add a batch of octs, returning how many were newly registered
    fn add(&mut self, batch: &OctBatch) -> usize;

    /// Number of octs registered so far
    fn noct(&self) -> usize;

    /// Create the octree
    fn finish(self) -> Self::Octree;
}

pub trait Octree {
    //! An immutable, queryable octree spanning all domains
    //!
    //! Octs are addressed by `(domain, index)` where `index` is local to the domain.
    //! Masks address octs in global order: every oct of domain 1, then domain 2, and so on.

    /// The grid topology
    fn topology(&self) -> &GridTopology;

    /// Number of domains
    fn ndomains(&self) -> usize;

    /// Total number of octs
    fn noct(&self) -> usize;

    /// Number of octs owned by a domain
    fn domain_noct(&self, domain: DomainId) -> Result<usize>;

    /// Mask of every oct intersecting the selector, in global order
    fn select<S: Selector + ?Sized>(&self, selector: &S) -> OctMask;

    /// Mask of the octs of a single domain intersecting the selector
    fn select_domain<S: Selector + ?Sized>(&self, domain: DomainId, selector: &S)
        -> Result<OctMask>;

    /// Number of selected octs
    fn count(&self, mask: &OctMask) -> usize {
        mask.count()
    }

    /// Split a global mask into the selected local indices of each domain
    fn split(&self, mask: &OctMask) -> Vec<Vec<usize>>;

    /// Number of selected leaf cells in the selected octs
    ///
    /// Cells that are themselves refined are not counted.
    fn count_cells<S: Selector + ?Sized>(&self, selector: &S, mask: &OctMask) -> usize;

    /// Integer coordinates of the selected leaf cells of some octs of a domain
    fn icoords<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<[i64; 3]>>;

    /// Centres of the selected leaf cells of some octs of a domain
    fn fcoords<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<[f64; 3]>>;

    /// Widths of the selected leaf cells of some octs of a domain
    fn fwidth<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<[f64; 3]>>;

    /// Refinement levels of the selected leaf cells of some octs of a domain
    fn ires<S: Selector + ?Sized>(
        &self,
        domain: DomainId,
        indices: &[usize],
        selector: &S,
    ) -> Result<Vec<Level>>;
}
