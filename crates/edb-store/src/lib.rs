//! Temporal object storage for the Engineering Database.
//!
//! Every stage owns one [`InMemoryObjectStore`] and one [`RevisionIndex`]:
//!
//! - The object store maps each OID to its [`VersionChain`], an append-only
//!   list of versions ordered by timestamp. Deletions append tombstones.
//! - The revision index lists the stage's commits in timestamp order and
//!   resolves revisions by id.
//!
//! Both structures are append-only. Time-travel reads (`at`, `head_set`,
//! `at_or_before`) are binary searches over the timestamps, so a read at any
//! point in history costs `O(log versions)` per object.
//!
//! # Design Rules
//!
//! 1. Versions and commits are immutable once appended.
//! 2. Timestamps strictly increase per chain and per index.
//! 3. The store never validates commits; the commit log does.
//! 4. Concurrency is the owner's concern: writes take `&mut self`.

pub mod chain;
pub mod error;
pub mod index;
pub mod memory;
pub mod traits;

pub use chain::{Version, VersionChain, VersionState};
pub use error::{StoreError, StoreResult};
pub use index::RevisionIndex;
pub use memory::InMemoryObjectStore;
pub use traits::ObjectStore;
