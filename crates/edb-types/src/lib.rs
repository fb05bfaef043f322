//! Foundation types for the Engineering Database (EDB).
//!
//! Every other EDB crate depends on `edb-types`.
//!
//! # Key Types
//!
//! - [`Oid`]: Object identifier, stable across versions
//! - [`EntryValue`] / [`EntryType`]: Typed entry values and their tags
//! - [`EdbObject`]: One version of an object (OID + entries)
//! - [`Commit`]: Atomic batch of inserts/updates/deletions
//! - [`RevisionId`]: Identity of an applied commit (UUID v7)
//! - [`StageId`] / [`Stage`]: Isolated branches of the store
//! - [`LogEntry`]: One record of an object's change feed
//! - [`Clock`]: Time source for commit stamping

pub mod commit;
pub mod entry;
pub mod error;
pub mod log;
pub mod object;
pub mod oid;
pub mod revision;
pub mod stage;
pub mod temporal;

pub use commit::{Commit, CommitMetaInfo};
pub use entry::{EntryType, EntryValue};
pub use error::TypeError;
pub use log::{LogEntry, LogKind};
pub use object::{EdbObject, MODEL_VERSION_KEY};
pub use oid::Oid;
pub use revision::RevisionId;
pub use stage::{Stage, StageId, ROOT_STAGE};
pub use temporal::{next_timestamp, Clock, ManualClock, SystemClock, Timestamp};
