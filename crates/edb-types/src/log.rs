use std::fmt;

use serde::{Deserialize, Serialize};

use crate::oid::Oid;
use crate::revision::RevisionId;
use crate::temporal::Timestamp;

/// How a commit touched an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One record of the change feed: a single (object, commit) touch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub oid: Oid,
    pub timestamp: Timestamp,
    pub revision: RevisionId,
    pub kind: LogKind,
}
