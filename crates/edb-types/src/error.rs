use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("object id must not be empty")]
    EmptyOid,

    #[error("invalid revision id {input:?}: {reason}")]
    InvalidRevision { input: String, reason: String },

    #[error("unknown entry type tag: {0}")]
    UnknownEntryType(String),

    #[error("cannot interpret {text:?} as {expected}")]
    Coercion { text: String, expected: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
