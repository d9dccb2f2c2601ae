//! Chunks and selections
use crate::domain::DomainSubset;
use crate::traits::Selector;
use crate::types::ChunkingStrategy;
use std::cell::OnceCell;

/// The result of resolving a selector against an octree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    /// One subset per domain with at least one selected oct, in domain order
    pub subsets: Vec<DomainSubset>,
    /// Number of selected octs
    pub oct_count: usize,
    /// Number of selected leaf cells
    pub cell_count: usize,
}

/// A batch of domain subsets handed to payload I/O
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    strategy: ChunkingStrategy,
    subsets: Vec<DomainSubset>,
    size: usize,
}

impl Chunk {
    /// A chunk of `size` leaf cells
    pub fn new(strategy: ChunkingStrategy, subsets: Vec<DomainSubset>, size: usize) -> Self {
        Self {
            strategy,
            subsets,
            size,
        }
    }

    /// Strategy that produced the chunk
    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    /// Selected octs, per domain
    pub fn subsets(&self) -> &[DomainSubset] {
        &self.subsets
    }

    /// Number of selected leaf cells in the chunk
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of selected octs in the chunk
    pub fn noct(&self) -> usize {
        self.subsets.iter().map(DomainSubset::len).sum()
    }
}

/// A selector plus its resolved selection, computed at most once
///
/// Repeated chunking of the same request sees the same subsets and size.
#[derive(Debug)]
pub struct Selection<S> {
    selector: S,
    pub(crate) resolved: OnceCell<ResolvedSelection>,
}

impl<S: Selector> Selection<S> {
    /// An unresolved selection
    pub fn new(selector: S) -> Self {
        Self {
            selector,
            resolved: OnceCell::new(),
        }
    }

    /// The selector
    pub fn selector(&self) -> &S {
        &self.selector
    }

    /// The resolved selection, if it has been computed
    pub fn resolved(&self) -> Option<&ResolvedSelection> {
        self.resolved.get()
    }

    /// Number of selected leaf cells, if the selection has been resolved
    pub fn size(&self) -> Option<usize> {
        self.resolved.get().map(|r| r.cell_count)
    }
}
