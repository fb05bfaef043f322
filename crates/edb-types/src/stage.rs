use std::fmt;

use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

/// Name of the stage that always exists.
pub const ROOT_STAGE: &str = "root";

/// Identifier of a stage (an isolated branch of the store).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_STAGE.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_STAGE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StageId {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageId({})", self.0)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Descriptor of a stage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub creator: String,
    pub created_at: Timestamp,
}

impl Stage {
    pub fn new(id: StageId, creator: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id,
            creator: creator.into(),
            created_at,
        }
    }
}
