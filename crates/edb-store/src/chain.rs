//! Per-OID version chains.
//!
//! A chain is the append-only list of versions of one object, ordered by
//! strictly increasing timestamp. Deletions append a tombstone; a later
//! insert of the same OID appends a live version after it (resurrection).
//! Time-travel reads are binary searches over the timestamps.

use serde::{Deserialize, Serialize};

use edb_types::{EdbObject, Oid, RevisionId, Timestamp};

use crate::error::{StoreError, StoreResult};

/// What a version records.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VersionState {
    Live(EdbObject),
    Tombstone,
}

/// One entry of a version chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub timestamp: Timestamp,
    pub revision: RevisionId,
    pub state: VersionState,
}

impl Version {
    pub fn object(&self) -> Option<&EdbObject> {
        match &self.state {
            VersionState::Live(object) => Some(object),
            VersionState::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self.state, VersionState::Tombstone)
    }
}

/// Ordered versions of one object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionChain {
    oid: Oid,
    versions: Vec<Version>,
}

impl VersionChain {
    pub fn new(oid: Oid) -> Self {
        Self {
            oid,
            versions: Vec::new(),
        }
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    /// Append a version. Its timestamp must be strictly after the latest.
    pub fn push(&mut self, version: Version) -> StoreResult<()> {
        if let Some(latest) = self.versions.last() {
            if version.timestamp <= latest.timestamp {
                return Err(StoreError::NonMonotonicVersion {
                    oid: self.oid.clone(),
                    latest: latest.timestamp,
                    attempted: version.timestamp,
                });
            }
        }
        self.versions.push(version);
        Ok(())
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Latest version if it is live.
    pub fn head(&self) -> Option<&EdbObject> {
        self.latest().and_then(Version::object)
    }

    /// `true` if the object currently exists (latest version is live).
    pub fn is_live(&self) -> bool {
        self.head().is_some()
    }

    /// Latest version at or before `timestamp`, resolved through a binary
    /// search. `None` if the object did not exist yet or was tombstoned.
    pub fn at(&self, timestamp: Timestamp) -> Option<&EdbObject> {
        let idx = self.versions.partition_point(|v| v.timestamp <= timestamp);
        if idx == 0 {
            return None;
        }
        self.versions[idx - 1].object()
    }

    /// All versions (tombstones included) with timestamp in `[from, to]`.
    pub fn range(&self, from: Timestamp, to: Timestamp) -> &[Version] {
        if from > to {
            return &[];
        }
        let lo = self.versions.partition_point(|v| v.timestamp < from);
        let hi = self.versions.partition_point(|v| v.timestamp <= to);
        &self.versions[lo..hi.max(lo)]
    }

    /// Live versions with timestamp in `[from, to]`, oldest first.
    pub fn history(&self, from: Timestamp, to: Timestamp) -> impl Iterator<Item = &EdbObject> {
        self.range(from, to).iter().filter_map(Version::object)
    }

    /// `true` if a tombstone is ever followed by a live version.
    pub fn is_resurrected(&self) -> bool {
        self.versions
            .windows(2)
            .any(|pair| pair[0].is_tombstone() && !pair[1].is_tombstone())
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
