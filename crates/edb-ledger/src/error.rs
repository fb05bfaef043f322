use edb_store::StoreError;
use edb_types::{RevisionId, StageId};

use crate::validation::ConflictReport;

/// Errors produced by commit log operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// One or more operations conflict with the stage head. Nothing was applied.
    #[error("validation conflict: {0}")]
    ValidationConflict(ConflictReport),

    /// The commit was built against a head that is no longer current.
    #[error("head mismatch: commit expects parent {expected:?}, stage head is {actual:?}")]
    HeadMismatch {
        expected: Option<RevisionId>,
        actual: Option<RevisionId>,
    },

    #[error("commit is already committed")]
    AlreadyCommitted,

    #[error("commit targets stage {commit} but was submitted to stage {log}")]
    WrongStage { commit: StageId, log: StageId },

    #[error("commit hook {hook} rejected the commit: {reason}")]
    HookRejected { hook: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("journal corrupt at offset {offset}: {reason}")]
    JournalCorrupt { offset: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

impl LedgerError {
    /// `true` for failures of the storage layer rather than of the commit.
    pub fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            Self::Store(_)
                | Self::JournalCorrupt { .. }
                | Self::Serialization(_)
                | Self::Io(_)
                | Self::LockPoisoned(_)
        )
    }
}

/// Result alias for commit log operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
