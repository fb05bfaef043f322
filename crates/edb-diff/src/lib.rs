//! Diff engine for the Engineering Database.
//!
//! Provides:
//! - State diffs: compare two head sets object by object
//! - Entry diffs: key-level changes within one changed object
//! - Change logs: insert/update/delete records derived from a version chain

pub mod change_log;
pub mod entry_diff;
pub mod state_diff;

pub use change_log::change_log;
pub use entry_diff::{diff_entries, EntryChange, EntryDiff};
pub use state_diff::{diff_states, ChangedObject, Diff};
