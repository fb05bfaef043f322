use thiserror::Error;

use edb_ledger::{ConflictReport, LedgerError};
use edb_query::QueryError;
use edb_stage::StageError;
use edb_types::{RevisionId, StageId};

/// Errors surfaced by the database facade.
#[derive(Debug, Error)]
pub enum EdbError {
    /// The commit conflicts with the stage head; nothing was applied.
    #[error("validation conflict: {0}")]
    ValidationConflict(ConflictReport),

    #[error("head mismatch: commit expects parent {expected:?}, stage head is {actual:?}")]
    HeadMismatch {
        expected: Option<RevisionId>,
        actual: Option<RevisionId>,
    },

    #[error("commit is already committed")]
    AlreadyCommitted,

    #[error("commit hook {hook} rejected the commit: {reason}")]
    HookRejected { hook: String, reason: String },

    #[error("stage not found: {0}")]
    StageNotFound(StageId),

    #[error("stage already exists: {0}")]
    StageExists(StageId),

    #[error("invalid stage id {id:?}: {reason}")]
    InvalidStageId { id: String, reason: String },

    #[error("revision not found: {0}")]
    RevisionNotFound(RevisionId),

    #[error(transparent)]
    MalformedQuery(#[from] QueryError),

    /// I/O, corruption, serialization or lock poisoning.
    #[error("storage fault: {0}")]
    StorageFault(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EdbError {
    /// The conflict lists, if this is a validation conflict.
    pub fn conflicts(&self) -> Option<&ConflictReport> {
        match self {
            Self::ValidationConflict(report) => Some(report),
            _ => None,
        }
    }
}

impl From<LedgerError> for EdbError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ValidationConflict(report) => Self::ValidationConflict(report),
            LedgerError::HeadMismatch { expected, actual } => Self::HeadMismatch { expected, actual },
            LedgerError::AlreadyCommitted => Self::AlreadyCommitted,
            LedgerError::HookRejected { hook, reason } => Self::HookRejected { hook, reason },
            LedgerError::WrongStage { commit, .. } => Self::StageNotFound(commit),
            other => Self::StorageFault(other.to_string()),
        }
    }
}

impl From<StageError> for EdbError {
    fn from(e: StageError) -> Self {
        match e {
            StageError::NotFound(id) => Self::StageNotFound(id),
            StageError::AlreadyExists(id) => Self::StageExists(id),
            StageError::InvalidStageId { id, reason } => Self::InvalidStageId { id, reason },
            StageError::Ledger(inner) => inner.into(),
            other => Self::StorageFault(other.to_string()),
        }
    }
}

pub type EdbResult<T> = Result<T, EdbError>;
