use std::collections::BTreeMap;

use tracing::trace;

use edb_types::{EdbObject, Oid, RevisionId, Timestamp};

use crate::chain::{Version, VersionChain, VersionState};
use crate::error::{StoreError, StoreResult};
use crate::traits::ObjectStore;

/// In-memory object store keyed by OID.
///
/// A `BTreeMap` keeps head sets and scans in OID order, so repeated reads of
/// the same state return identical sequences.
#[derive(Clone, Debug, Default)]
pub struct InMemoryObjectStore {
    chains: BTreeMap<Oid, VersionChain>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of OIDs ever written.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Total versions across all chains, tombstones included.
    pub fn total_versions(&self) -> usize {
        self.chains.values().map(VersionChain::len).sum()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put_version(
        &mut self,
        mut object: EdbObject,
        timestamp: Timestamp,
        revision: RevisionId,
    ) -> StoreResult<()> {
        object.timestamp = Some(timestamp);
        let oid = object.oid.clone();
        trace!(%oid, timestamp, "append version");
        self.chains
            .entry(oid.clone())
            .or_insert_with(|| VersionChain::new(oid))
            .push(Version {
                timestamp,
                revision,
                state: VersionState::Live(object),
            })
    }

    fn delete_at(
        &mut self,
        oid: &Oid,
        timestamp: Timestamp,
        revision: RevisionId,
    ) -> StoreResult<()> {
        let chain = self
            .chains
            .get_mut(oid)
            .filter(|c| c.is_live())
            .ok_or_else(|| StoreError::NotLive(oid.clone()))?;
        trace!(%oid, timestamp, "append tombstone");
        chain.push(Version {
            timestamp,
            revision,
            state: VersionState::Tombstone,
        })
    }

    fn chain(&self, oid: &Oid) -> Option<&VersionChain> {
        self.chains.get(oid)
    }

    fn oids(&self) -> Vec<&Oid> {
        self.chains.keys().collect()
    }
}
