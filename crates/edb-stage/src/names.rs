//! Stage id validation.
//!
//! Stage ids name journal files on disk, so they follow file-name rules:
//! - Must be non-empty and at most [`MAX_STAGE_ID_LEN`] bytes
//! - Must not contain whitespace, control characters, path separators or
//!   any of `: * ? " < > |`
//! - Must not contain `..` or start with `.`

use crate::error::{StageError, StageResult};

/// Longest accepted stage id, in bytes.
pub const MAX_STAGE_ID_LEN: usize = 128;

/// Characters that are forbidden anywhere in a stage id.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Validate a stage id, returning `Ok(())` if valid.
///
/// ```
/// use edb_stage::names::validate_stage_id;
///
/// assert!(validate_stage_id("release-2.1").is_ok());
/// assert!(validate_stage_id("").is_err());
/// assert!(validate_stage_id("a/b").is_err());
/// ```
pub fn validate_stage_id(id: &str) -> StageResult<()> {
    let invalid = |reason: String| StageError::InvalidStageId {
        id: id.to_string(),
        reason,
    };

    if id.is_empty() {
        return Err(invalid("stage id must not be empty".into()));
    }
    if id.len() > MAX_STAGE_ID_LEN {
        return Err(invalid(format!("longer than {MAX_STAGE_ID_LEN} bytes")));
    }
    if let Some(ch) = id.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid(format!("contains whitespace or control character {ch:?}")));
    }
    if let Some(ch) = id.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(format!("contains forbidden character {ch:?}")));
    }
    if id.contains("..") {
        return Err(invalid("must not contain '..'".into()));
    }
    if id.starts_with('.') {
        return Err(invalid("must not start with '.'".into()));
    }
    Ok(())
}
