//! Stage management for the Engineering Database.
//!
//! A stage is an isolated, named branch of the store with its own object
//! store, revision index and commit log. The root stage (`"root"`) exists
//! from initialization and cannot be removed; every other stage is created
//! explicitly and lives for the lifetime of the database.
//!
//! # Modules
//!
//! - [`error`]: Error types for stage operations
//! - [`names`]: Stage id validation
//! - [`manifest`]: The persisted list of stages (`stages.json`)
//! - [`manager`]: [`StageManager`], the registry of open stages

pub mod error;
pub mod manager;
pub mod manifest;
pub mod names;

pub use error::{StageError, StageResult};
pub use manager::{StageHandle, StageManager};
pub use names::{validate_stage_id, MAX_STAGE_ID_LEN};
