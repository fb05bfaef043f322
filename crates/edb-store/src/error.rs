use edb_types::{Oid, RevisionId, Timestamp};

/// Errors from object store and revision index operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A version was appended at or before the chain's latest timestamp.
    #[error("non-monotonic version for {oid}: latest is {latest}, attempted {attempted}")]
    NonMonotonicVersion {
        oid: Oid,
        latest: Timestamp,
        attempted: Timestamp,
    },

    /// A commit was indexed at or before the index's latest timestamp.
    #[error("non-monotonic commit: latest is {latest}, attempted {attempted}")]
    NonMonotonicCommit {
        latest: Timestamp,
        attempted: Timestamp,
    },

    /// A tombstone was requested for an object that is not live.
    #[error("object is not live: {0}")]
    NotLive(Oid),

    /// Only frozen commits (revision and timestamp assigned) can be indexed.
    #[error("commit is not committed")]
    Uncommitted,

    /// The revision is already indexed.
    #[error("duplicate revision: {0}")]
    DuplicateRevision(RevisionId),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
