//! The stage manifest: `<data_dir>/stages.json`, a JSON array of stages.
//!
//! The manifest is rewritten whole on every stage creation through a temp
//! file in the same directory followed by a rename, so a crash leaves either
//! the old or the new list.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use edb_types::Stage;

use crate::error::{StageError, StageResult};

pub const MANIFEST_FILE: &str = "stages.json";

/// Read the manifest at `path`. A missing file is an empty manifest.
pub fn load(path: &Path) -> StageResult<Vec<Stage>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let bytes = fs::read(path)?;
    let stages: Vec<Stage> =
        serde_json::from_slice(&bytes).map_err(|e| StageError::Manifest(e.to_string()))?;
    debug!(path = %path.display(), stages = stages.len(), "manifest loaded");
    Ok(stages)
}

/// Replace the manifest at `path` with `stages`.
pub fn save(path: &Path, stages: &[Stage]) -> StageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StageError::Manifest(format!("no parent directory: {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let json =
        serde_json::to_vec_pretty(stages).map_err(|e| StageError::Manifest(e.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StageError::Io(e.error))?;
    debug!(path = %path.display(), stages = stages.len(), "manifest saved");
    Ok(())
}
