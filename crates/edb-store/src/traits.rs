use edb_types::{EdbObject, Oid, RevisionId, Timestamp};

use crate::chain::{Version, VersionChain};
use crate::error::StoreResult;

/// Per-stage temporal object store.
///
/// All implementations must satisfy these invariants:
/// - Versions are append-only; a stored version is never modified.
/// - Each chain is ordered by strictly increasing timestamp.
/// - The store does not validate commits; the commit log does that before
///   any version is appended.
///
/// Write methods take `&mut self`: the owning stage serializes writers and
/// publishes behind its own lock.
pub trait ObjectStore: Send + Sync {
    /// Append a live version of `object` stamped with `timestamp`.
    fn put_version(
        &mut self,
        object: EdbObject,
        timestamp: Timestamp,
        revision: RevisionId,
    ) -> StoreResult<()>;

    /// Append a tombstone for `oid`. The object must be live.
    fn delete_at(&mut self, oid: &Oid, timestamp: Timestamp, revision: RevisionId)
        -> StoreResult<()>;

    /// The version chain of `oid`, if the OID was ever written.
    fn chain(&self, oid: &Oid) -> Option<&VersionChain>;

    /// Every OID ever written, in OID order.
    fn oids(&self) -> Vec<&Oid>;

    /// Latest live version, `None` if deleted or unknown.
    fn head_of(&self, oid: &Oid) -> Option<EdbObject> {
        self.chain(oid).and_then(VersionChain::head).cloned()
    }

    /// Version visible at `timestamp`.
    fn at(&self, oid: &Oid, timestamp: Timestamp) -> Option<EdbObject> {
        self.chain(oid).and_then(|c| c.at(timestamp)).cloned()
    }

    fn is_live(&self, oid: &Oid) -> bool {
        self.chain(oid).is_some_and(VersionChain::is_live)
    }

    /// Every object visible at `timestamp` (or currently, if `None`).
    fn head_set(&self, timestamp: Option<Timestamp>) -> Vec<EdbObject> {
        self.oids()
            .into_iter()
            .filter_map(|oid| match timestamp {
                Some(ts) => self.at(oid, ts),
                None => self.head_of(oid),
            })
            .collect()
    }

    /// Live versions of `oid` with timestamp in `[from, to]`, oldest first.
    fn history(&self, oid: &Oid, from: Timestamp, to: Timestamp) -> Vec<EdbObject> {
        self.chain(oid)
            .map(|c| c.history(from, to).cloned().collect())
            .unwrap_or_default()
    }

    /// Raw versions of `oid` with timestamp in `[from, to]`, tombstones
    /// included.
    fn versions(&self, oid: &Oid, from: Timestamp, to: Timestamp) -> Vec<Version> {
        self.chain(oid)
            .map(|c| c.range(from, to).to_vec())
            .unwrap_or_default()
    }

    /// Number of versions of `oid`, tombstones included.
    fn version_count(&self, oid: &Oid) -> usize {
        self.chain(oid).map_or(0, VersionChain::len)
    }

    /// OIDs that were deleted and later inserted again.
    fn resurrected(&self) -> Vec<Oid> {
        self.oids()
            .into_iter()
            .filter(|oid| self.chain(oid).is_some_and(VersionChain::is_resurrected))
            .cloned()
            .collect()
    }
}
