//! Commit log for the Engineering Database.
//!
//! Every stage owns one [`CommitLog`]. The log is the only writer of the
//! stage's object store and revision index. A commit passes through:
//!
//! 1. `begin` hooks, with the commit as submitted
//! 2. validation against the head state, collecting every conflict
//! 3. the revision check: a conflict-free commit's parent must be the stage
//!    head
//! 4. `pre_commit` hooks
//! 5. stamping: timestamp `max(clock, last + 1)`, a fresh revision id, and a
//!    check that both can still be appended to the revision index
//! 6. the journal, when the stage is persistent
//! 7. publication under the snapshot's write lock
//! 8. `post_commit` hooks
//!
//! A failure at any step leaves the stage untouched and notifies the
//! `on_error` hooks.

pub mod error;
pub mod hooks;
pub mod journal;
pub mod log;
pub mod validation;

pub use error::{LedgerError, LedgerResult};
pub use hooks::{CommitHook, HookDecision, HookPipeline};
pub use journal::{Journal, JournalSync};
pub use log::{CommitLog, LogContext, LogSettings, StageSnapshot};
pub use validation::{
    validate_commit, verify_chain, ChainReport, ChainViolation, ChainViolationKind,
    ConflictReport, PreparedCommit,
};
