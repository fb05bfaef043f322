//! Error types for stage operations.

use thiserror::Error;

use edb_ledger::LedgerError;
use edb_types::StageId;

/// Errors that can occur during stage operations.
#[derive(Debug, Error)]
pub enum StageError {
    /// No stage with this id exists.
    #[error("stage not found: {0}")]
    NotFound(StageId),

    /// A stage with this id already exists.
    #[error("stage already exists: {0}")]
    AlreadyExists(StageId),

    #[error("invalid stage id {id:?}: {reason}")]
    InvalidStageId { id: String, reason: String },

    /// Opening or replaying a stage's commit log failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The stage manifest could not be read or written.
    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Convenience type alias for stage operations.
pub type StageResult<T> = std::result::Result<T, StageError>;
