//! Cross-domain ownership accounting
use crate::octree::OctBatch;
use crate::traits::OctreeBuilder;
use crate::types::{DomainId, Error, Result};
use log::trace;

/// Decides which oct batches reach the octree and checks the totals afterwards.
///
/// Domain files replicate octs of their neighbours. A batch read from domain `reader`
/// and owned by domain `owner` is submitted only when `owner >= reader`: replicas of
/// lower domains were already submitted by their owner. This is only sound if domains
/// are populated in ascending order, so the ledger rejects any other order.
#[derive(Debug, Clone, Default)]
pub struct OwnershipLedger {
    ndomains: usize,
    current: Option<DomainId>,
    batches: usize,
    submitted: usize,
    registered: usize,
    discarded: usize,
}

impl OwnershipLedger {
    /// A ledger for `ndomains` domains, none started
    pub fn new(ndomains: usize) -> Self {
        Self {
            ndomains,
            ..Default::default()
        }
    }

    /// Is a batch owned by `owner` and read from domain `reader` submitted
    pub fn accepts(reader: DomainId, owner: DomainId) -> bool {
        owner >= reader
    }

    /// Start populating `domain`, which must follow every domain started before it.
    pub fn begin_domain(&mut self, domain: DomainId) -> Result<()> {
        if domain == 0 || domain > self.ndomains {
            return Err(Error::UnknownDomain(domain));
        }
        let previous = self.current.unwrap_or(0);
        if domain <= previous {
            return Err(Error::OwnershipOrder {
                previous,
                next: domain,
            });
        }
        self.current = Some(domain);
        Ok(())
    }

    /// Submit a batch read from `reader` if the ownership rule accepts it, returning the
    /// number of octs the builder newly registered.
    pub fn submit<B: OctreeBuilder>(
        &mut self,
        reader: DomainId,
        builder: &mut B,
        batch: &OctBatch,
    ) -> Result<usize> {
        let current = self.current.unwrap_or(0);
        if reader != current {
            return Err(Error::OwnershipOrder {
                previous: current,
                next: reader,
            });
        }
        if !Self::accepts(reader, batch.owner) {
            trace!(
                "Domain {}: discarding {} replicated octs of domain {} at level {}",
                reader,
                batch.len(),
                batch.owner,
                batch.level
            );
            self.discarded += batch.len();
            return Ok(0);
        }
        let added = builder.add(batch);
        trace!(
            "Domain {}: submitted {} octs of domain {} at level {} ({} new)",
            reader,
            batch.len(),
            batch.owner,
            batch.level,
            added
        );
        self.batches += 1;
        self.submitted += batch.len();
        self.registered += added;
        Ok(added)
    }

    /// Record replica octs that `reader` dropped without submitting them.
    pub fn discard(&mut self, reader: DomainId, octs: usize) -> Result<()> {
        let current = self.current.unwrap_or(0);
        if reader != current {
            return Err(Error::OwnershipOrder {
                previous: current,
                next: reader,
            });
        }
        self.discarded += octs;
        Ok(())
    }

    /// Number of batches submitted
    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Octs in submitted batches
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    /// Octs newly registered by the builder
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// Octs in discarded replica batches
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Compare the octs the headers declared with the octs the octree holds.
    pub fn reconcile(&self, expected: usize, noct: usize) -> Result<()> {
        if expected != noct {
            return Err(Error::OwnershipAccountingMismatch {
                expected,
                registered: noct,
            });
        }
        Ok(())
    }
}
