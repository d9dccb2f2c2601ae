//! Domain subsets
use super::DomainFile;
use crate::geometry::GeometryHandler;
use crate::traits::{Octree, OctreeBuilder, Selector};
use crate::types::{DomainId, Level, Result};

/// The octs of one domain selected by a query
///
/// A subset stores only the domain id and local oct indices. Coordinates are resolved on
/// demand through the [GeometryHandler] that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSubset {
    domain_id: DomainId,
    indices: Vec<usize>,
}

impl DomainSubset {
    /// A subset of `domain_id` holding its octs at `indices`
    pub fn new(domain_id: DomainId, indices: Vec<usize>) -> Self {
        Self { domain_id, indices }
    }

    /// One-based domain id
    pub fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    /// Selected oct indices, local to the domain
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of selected octs
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Is no oct selected
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// The domain file this subset was selected from
    pub fn domain<'a, B: OctreeBuilder>(
        &self,
        handler: &'a GeometryHandler<B>,
    ) -> Result<&'a DomainFile> {
        handler.domain(self.domain_id)
    }

    /// Integer coordinates of the selected leaf cells
    pub fn icoords<B: OctreeBuilder, S: Selector + ?Sized>(
        &self,
        handler: &GeometryHandler<B>,
        selector: &S,
    ) -> Result<Vec<[i64; 3]>> {
        handler
            .octree()
            .icoords(self.domain_id, &self.indices, selector)
    }

    /// Centres of the selected leaf cells
    pub fn fcoords<B: OctreeBuilder, S: Selector + ?Sized>(
        &self,
        handler: &GeometryHandler<B>,
        selector: &S,
    ) -> Result<Vec<[f64; 3]>> {
        handler
            .octree()
            .fcoords(self.domain_id, &self.indices, selector)
    }

    /// Widths of the selected leaf cells
    pub fn fwidth<B: OctreeBuilder, S: Selector + ?Sized>(
        &self,
        handler: &GeometryHandler<B>,
        selector: &S,
    ) -> Result<Vec<[f64; 3]>> {
        handler
            .octree()
            .fwidth(self.domain_id, &self.indices, selector)
    }

    /// Refinement levels of the selected leaf cells
    pub fn ires<B: OctreeBuilder, S: Selector + ?Sized>(
        &self,
        handler: &GeometryHandler<B>,
        selector: &S,
    ) -> Result<Vec<Level>> {
        handler.octree().ires(self.domain_id, &self.indices, selector)
    }
}
