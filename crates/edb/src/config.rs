use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use edb_ledger::{JournalSync, LogSettings};

use crate::error::{EdbError, EdbResult};

/// Database configuration.
///
/// ```toml
/// data_dir = "/var/lib/edb"
/// revision_check = true
/// journal_sync = "every-commit"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdbConfig {
    /// Directory holding the stage manifest and journals. `None` keeps the
    /// whole database in memory.
    pub data_dir: Option<PathBuf>,
    /// Reject commits whose parent is not the current stage head.
    pub revision_check: bool,
    pub journal_sync: JournalSync,
}

impl Default for EdbConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            revision_check: true,
            journal_sync: JournalSync::default(),
        }
    }
}

impl EdbConfig {
    /// An in-memory configuration.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A journal-backed configuration rooted at `data_dir`.
    pub fn persistent(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> EdbResult<Self> {
        toml::from_str(text).map_err(|e| EdbError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> EdbResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EdbError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> EdbResult<String> {
        toml::to_string(self).map_err(|e| EdbError::Config(e.to_string()))
    }

    pub(crate) fn log_settings(&self) -> LogSettings {
        LogSettings {
            revision_check: self.revision_check,
            sync: self.journal_sync,
        }
    }
}
