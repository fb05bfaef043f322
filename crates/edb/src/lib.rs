//! Embedding API for the Engineering Database.
//!
//! [`Edb`] ties the subsystems together: stages from `edb-stage`, commit
//! logs from `edb-ledger`, queries from `edb-query` and diffs from
//! `edb-diff`. Applications build commits with [`CommitBuilder`] and read
//! objects back at any point in time.
//!
//! ```
//! use edb::{CommitBuilder, Edb, EdbObject, Oid};
//!
//! let edb = Edb::in_memory();
//! let mut commit = edb
//!     .build_commit(CommitBuilder::new("alice").insert(EdbObject::new("A").with_entry("name", "foo")))
//!     .unwrap();
//! let at = edb.commit(&mut commit).unwrap();
//!
//! let object = edb.get_object_at(&Oid::from("A"), at, None).unwrap().unwrap();
//! assert_eq!(object.get("name").unwrap().render(), "foo");
//! ```

pub mod commit;
pub mod config;
pub mod database;
pub mod error;

pub use commit::CommitBuilder;
pub use config::EdbConfig;
pub use database::{Edb, EdbBuilder};
pub use error::{EdbError, EdbResult};

// Re-export key types
pub use edb_diff::{ChangedObject, Diff, EntryChange, EntryDiff};
pub use edb_ledger::{ChainReport, CommitHook, ConflictReport, HookDecision, JournalSync, LedgerError};
pub use edb_query::{parse_query, CommitQuery, Predicates};
pub use edb_types::{
    Clock, Commit, CommitMetaInfo, EdbObject, EntryType, EntryValue, LogEntry, LogKind, ManualClock,
    Oid, RevisionId, Stage, StageId, SystemClock, Timestamp,
};
