//! Geometry handler
use super::chunk::{Chunk, ResolvedSelection, Selection};
use super::OwnershipLedger;
use crate::domain::{DomainFile, DomainSubset};
use crate::octree::{OctBatch, OctMask, RamsesOctreeBuilder};
use crate::snapshot::SnapshotParameters;
use crate::traits::{Octree, OctreeBuilder, Selector};
use crate::types::{ChunkingStrategy, DomainId, Error, GridTopology, LoadOptions, Result};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::Arc;

/// Builds the octree of a snapshot from its domain files and turns selectors into chunks
pub struct GeometryHandler<B: OctreeBuilder = RamsesOctreeBuilder> {
    domains: Vec<DomainFile>,
    octree: B::Octree,
    total_octs: usize,
    discarded_octs: usize,
    warnings: Vec<Error>,
}

impl<B: OctreeBuilder> GeometryHandler<B> {
    /// Open every domain of a snapshot and assemble their octs into one octree
    pub fn initialize(parameters: &SnapshotParameters, options: LoadOptions) -> Result<Self> {
        parameters.validate()?;
        let open = |domain_id| DomainFile::open(parameters, domain_id);
        let domains = if options.parallel {
            (1..=parameters.ncpu)
                .into_par_iter()
                .map(open)
                .collect::<Vec<_>>()
        } else {
            (1..=parameters.ncpu).map(open).collect()
        };
        let domains = domains.into_iter().collect::<Result<Vec<_>>>()?;
        Self::from_domains(domains, parameters, options)
    }

    /// Assemble the octree from already opened domain files, given in ascending
    /// domain order
    ///
    /// Any selection the domain files cached is dropped.
    pub fn from_domains(
        mut domains: Vec<DomainFile>,
        parameters: &SnapshotParameters,
        options: LoadOptions,
    ) -> Result<Self> {
        let nx = domains
            .first()
            .map(|d| d.header().nx)
            .ok_or_else(|| Error::InvalidParameter("a snapshot needs at least one domain".into()))?;
        let topology = GridTopology::new(
            nx,
            parameters.domain_left_edge,
            parameters.domain_right_edge,
        );
        if parameters.domain_left_edge != [0.0; 3] {
            warn!(
                "Domain left edge is {:?}; oct positions are scaled but not translated",
                parameters.domain_left_edge
            );
        }

        domains.iter_mut().for_each(DomainFile::clear_selection);

        let capacities = domains
            .iter()
            .map(DomainFile::local_oct_count)
            .collect::<Vec<_>>();
        let total_octs = capacities.iter().sum();
        debug!("Allocating {} octs", total_octs);
        let mut builder = B::new(topology);
        builder.preallocate(&capacities);

        let width = topology.domain_width();
        let mut ledger = OwnershipLedger::new(domains.len());
        if options.parallel {
            // Replicas are dropped while decoding so they are never held in memory.
            let decoded = domains
                .par_iter()
                .map(|d| d.read_owned_batches(width))
                .collect::<Vec<Result<(Vec<OctBatch>, usize)>>>();
            for (domain, decoded) in domains.iter().zip(decoded) {
                let (batches, discarded) = decoded?;
                ledger.begin_domain(domain.domain_id())?;
                ledger.discard(domain.domain_id(), discarded)?;
                for batch in &batches {
                    ledger.submit(domain.domain_id(), &mut builder, batch)?;
                }
            }
        } else {
            for domain in &domains {
                domain.populate(&mut builder, &mut ledger, width)?;
            }
        }
        let octree = builder.finish();

        let mut warnings = vec![];
        if let Err(err) = ledger.reconcile(total_octs, octree.noct()) {
            if options.strict_ownership {
                return Err(err);
            }
            warn!("{}", err);
            warnings.push(err);
        }
        info!(
            "Assembled {} octs from {} domains ({} replicated octs discarded)",
            octree.noct(),
            domains.len(),
            ledger.discarded()
        );

        Ok(Self {
            domains,
            octree,
            total_octs,
            discarded_octs: ledger.discarded(),
            warnings,
        })
    }

    /// The domain files, in ascending domain order
    pub fn domains(&self) -> &[DomainFile] {
        &self.domains
    }

    /// One domain file
    pub fn domain(&self, domain_id: DomainId) -> Result<&DomainFile> {
        domain_id
            .checked_sub(1)
            .and_then(|i| self.domains.get(i))
            .ok_or(Error::UnknownDomain(domain_id))
    }

    /// The assembled octree
    pub fn octree(&self) -> &B::Octree {
        &self.octree
    }

    /// Sum of the oct counts declared by every domain header
    pub fn total_octs(&self) -> usize {
        self.total_octs
    }

    /// Octs in replica batches that were read but not submitted
    pub fn discarded_octs(&self) -> usize {
        self.discarded_octs
    }

    /// Non-fatal problems found while assembling the octree
    pub fn warnings(&self) -> &[Error] {
        &self.warnings
    }

    /// Mask of one domain's octs matching `selector`, cached by the domain
    pub fn select_domain<S: Selector + ?Sized>(
        &mut self,
        domain_id: DomainId,
        selector: &S,
    ) -> Result<Arc<OctMask>> {
        let octree = &self.octree;
        let domain = domain_id
            .checked_sub(1)
            .and_then(|i| self.domains.get_mut(i))
            .ok_or(Error::UnknownDomain(domain_id))?;
        domain.select(octree, selector)
    }

    /// Number of one domain's octs matching `selector`
    pub fn count_domain<S: Selector + ?Sized>(
        &mut self,
        domain_id: DomainId,
        selector: &S,
    ) -> Result<usize> {
        let octree = &self.octree;
        let domain = domain_id
            .checked_sub(1)
            .and_then(|i| self.domains.get_mut(i))
            .ok_or(Error::UnknownDomain(domain_id))?;
        domain.count(octree, selector)
    }

    /// Select octs matching `selector` and group them by domain
    ///
    /// Computed fresh on every call; see [GeometryHandler::identify_base_chunk] for a
    /// cached variant.
    pub fn resolve_selection<S: Selector + ?Sized>(&self, selector: &S) -> ResolvedSelection {
        let mask = self.octree.select(selector);
        let subsets = self
            .octree
            .split(&mask)
            .into_iter()
            .enumerate()
            .filter(|(_, indices)| !indices.is_empty())
            .map(|(i, indices)| DomainSubset::new(i + 1, indices))
            .collect();
        ResolvedSelection {
            subsets,
            oct_count: self.octree.count(&mask),
            cell_count: self.octree.count_cells(selector, &mask),
        }
    }

    /// Number of leaf cells matching `selector`, without building subsets
    pub fn count_selection<S: Selector + ?Sized>(&self, selector: &S) -> usize {
        let mask = self.octree.select(selector);
        self.octree.count_cells(selector, &mask)
    }

    /// Split a resolved selection into chunks
    ///
    /// Only [ChunkingStrategy::All] is supported; it yields exactly one chunk.
    pub fn chunk(
        &self,
        selection: ResolvedSelection,
        strategy: ChunkingStrategy,
    ) -> Result<impl Iterator<Item = Chunk>> {
        match strategy {
            ChunkingStrategy::All => Ok(std::iter::once(Chunk::new(
                strategy,
                selection.subsets,
                selection.cell_count,
            ))),
            other => Err(Error::UnsupportedChunkingStrategy(other)),
        }
    }

    /// The single chunk covering a selection, resolving it on first use only
    pub fn identify_base_chunk<S: Selector>(&self, selection: &Selection<S>) -> Chunk {
        let resolved = selection
            .resolved
            .get_or_init(|| self.resolve_selection(selection.selector()));
        Chunk::new(
            ChunkingStrategy::All,
            resolved.subsets.clone(),
            resolved.cell_count,
        )
    }
}
