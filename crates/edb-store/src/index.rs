//! Per-stage revision index: committed commits in timestamp order.

use std::collections::HashMap;
use std::sync::Arc;

use edb_types::{Commit, RevisionId, Timestamp};

use crate::error::{StoreError, StoreResult};

/// Timestamp-sorted index over the commits applied to one stage.
///
/// Commits are shared behind `Arc` so readers can hold them past the lock
/// that guards the index.
#[derive(Clone, Debug, Default)]
pub struct RevisionIndex {
    timestamps: Vec<Timestamp>,
    commits: Vec<Arc<Commit>>,
    positions: HashMap<RevisionId, usize>,
}

impl RevisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a frozen commit. Its timestamp must be after the latest.
    pub fn push(&mut self, commit: Arc<Commit>) -> StoreResult<()> {
        let (Some(revision), Some(timestamp)) = (commit.revision, commit.timestamp) else {
            return Err(StoreError::Uncommitted);
        };
        if !commit.is_committed() {
            return Err(StoreError::Uncommitted);
        }
        if let Some(&latest) = self.timestamps.last() {
            if timestamp <= latest {
                return Err(StoreError::NonMonotonicCommit {
                    latest,
                    attempted: timestamp,
                });
            }
        }
        if self.positions.contains_key(&revision) {
            return Err(StoreError::DuplicateRevision(revision));
        }
        self.positions.insert(revision, self.commits.len());
        self.timestamps.push(timestamp);
        self.commits.push(commit);
        Ok(())
    }

    /// The latest commit.
    pub fn head(&self) -> Option<&Arc<Commit>> {
        self.commits.last()
    }

    pub fn head_revision(&self) -> Option<RevisionId> {
        self.head().and_then(|c| c.revision)
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.last().copied()
    }

    /// Latest commit with timestamp at or before `timestamp`.
    pub fn at_or_before(&self, timestamp: Timestamp) -> Option<&Arc<Commit>> {
        let idx = self.timestamps.partition_point(|t| *t <= timestamp);
        idx.checked_sub(1).map(|i| &self.commits[i])
    }

    pub fn by_revision(&self, revision: &RevisionId) -> Option<&Arc<Commit>> {
        self.positions.get(revision).map(|&i| &self.commits[i])
    }

    /// Commits with timestamp in `[from, to]`.
    pub fn range(&self, from: Timestamp, to: Timestamp) -> &[Arc<Commit>] {
        if from > to {
            return &[];
        }
        let lo = self.timestamps.partition_point(|t| *t < from);
        let hi = self.timestamps.partition_point(|t| *t <= to);
        &self.commits[lo..hi.max(lo)]
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<Commit>> {
        self.commits.iter()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}
