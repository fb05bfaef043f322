use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info};

use edb_store::{InMemoryObjectStore, ObjectStore, RevisionIndex, StoreError};
use edb_types::{next_timestamp, Clock, Commit, RevisionId, StageId, Timestamp};

use crate::error::{LedgerError, LedgerResult};
use crate::hooks::HookPipeline;
use crate::journal::{Journal, JournalSync};
use crate::validation::{validate_commit, verify_chain, ChainReport, PreparedCommit};

/// Settings shared by every commit log of a database.
#[derive(Clone, Debug)]
pub struct LogSettings {
    /// Reject commits whose parent is not the stage head.
    pub revision_check: bool,
    pub sync: JournalSync,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            revision_check: true,
            sync: JournalSync::default(),
        }
    }
}

/// Collaborators a commit log needs besides its own state.
#[derive(Clone)]
pub struct LogContext {
    pub clock: Arc<dyn Clock>,
    pub hooks: Arc<HookPipeline>,
    pub settings: LogSettings,
}

/// The published state of one stage: its objects and its commits.
#[derive(Clone, Debug, Default)]
pub struct StageSnapshot {
    pub store: InMemoryObjectStore,
    pub index: RevisionIndex,
}

impl StageSnapshot {
    /// Apply a frozen commit. The commit must already be validated against
    /// this snapshot.
    fn apply(&mut self, prepared: PreparedCommit, frozen: Arc<Commit>) -> LedgerResult<()> {
        let (Some(revision), Some(timestamp)) = (frozen.revision, frozen.timestamp) else {
            return Err(StoreError::Uncommitted.into());
        };
        self.check_appendable(revision, timestamp)?;
        for object in prepared.inserts.into_iter().chain(prepared.updates) {
            self.store.put_version(object, timestamp, revision)?;
        }
        for oid in &prepared.deletions {
            self.store.delete_at(oid, timestamp, revision)?;
        }
        self.index.push(frozen)?;
        Ok(())
    }

    /// Fail unless a commit stamped `(revision, timestamp)` can be appended.
    ///
    /// Every version in the store belongs to an indexed commit, so a
    /// timestamp past the index head is past every chain as well.
    fn check_appendable(&self, revision: RevisionId, timestamp: Timestamp) -> LedgerResult<()> {
        if let Some(latest) = self.index.last_timestamp() {
            if timestamp <= latest {
                return Err(StoreError::NonMonotonicCommit {
                    latest,
                    attempted: timestamp,
                }
                .into());
            }
        }
        if self.index.by_revision(&revision).is_some() {
            return Err(StoreError::DuplicateRevision(revision).into());
        }
        Ok(())
    }
}

/// The commit log of one stage.
///
/// Writers are serialized by an internal mutex that also owns the journal.
/// Validation reads the snapshot under a shared lock; the validated commit is
/// journaled first and only then published under the exclusive lock, so a
/// reader sees either all of a commit or none of it.
pub struct CommitLog {
    stage: StageId,
    writer: Mutex<Option<Journal>>,
    snapshot: RwLock<StageSnapshot>,
    context: LogContext,
}

impl CommitLog {
    /// A log that keeps its commits in memory only.
    pub fn in_memory(stage: StageId, context: LogContext) -> Self {
        Self {
            stage,
            writer: Mutex::new(None),
            snapshot: RwLock::new(StageSnapshot::default()),
            context,
        }
    }

    /// Open a journaled log at `path`, replaying every commit it holds.
    pub fn open(stage: StageId, path: &Path, context: LogContext) -> LedgerResult<Self> {
        let (journal, commits) = Journal::open(path, context.settings.sync)?;
        let mut snapshot = StageSnapshot::default();
        for (position, commit) in commits.into_iter().enumerate() {
            replay(&mut snapshot, commit).map_err(|e| LedgerError::JournalCorrupt {
                offset: position as u64,
                reason: format!("replay of commit {position} failed: {e}"),
            })?;
        }
        info!(
            stage = %stage,
            commits = snapshot.index.len(),
            objects = snapshot.store.len(),
            "stage log recovered"
        );
        Ok(Self {
            stage,
            writer: Mutex::new(Some(journal)),
            snapshot: RwLock::new(snapshot),
            context,
        })
    }

    pub fn stage(&self) -> &StageId {
        &self.stage
    }

    /// Validate and apply `pending`, all-or-nothing.
    ///
    /// On success `pending` is replaced by the frozen commit (revision,
    /// parent and timestamp set) and its timestamp is returned. On failure no
    /// state changes and `pending` is left as submitted.
    pub fn commit(&self, pending: &mut Commit) -> LedgerResult<Timestamp> {
        if pending.is_committed() {
            return Err(LedgerError::AlreadyCommitted);
        }
        let result = self.try_commit(pending);
        match &result {
            Ok(frozen) => {
                self.context.hooks.post_commit(frozen);
                info!(
                    stage = %self.stage,
                    revision = ?frozen.revision,
                    timestamp = ?frozen.timestamp,
                    inserts = frozen.inserts.len(),
                    updates = frozen.updates.len(),
                    deletions = frozen.deletions.len(),
                    "commit applied"
                );
            }
            Err(e) => {
                debug!(stage = %self.stage, error = %e, "commit failed");
                self.context.hooks.error(pending, e);
            }
        }
        let frozen = result?;
        let timestamp = frozen.timestamp.ok_or(StoreError::Uncommitted)?;
        *pending = frozen;
        Ok(timestamp)
    }

    fn try_commit(&self, pending: &Commit) -> LedgerResult<Commit> {
        if pending.stage != self.stage {
            return Err(LedgerError::WrongStage {
                commit: pending.stage.clone(),
                log: self.stage.clone(),
            });
        }

        let mut journal = self
            .writer
            .lock()
            .map_err(|e| LedgerError::LockPoisoned(e.to_string()))?;

        self.context.hooks.begin(pending)?;

        // Conflicts take precedence over a stale parent.
        let (prepared, head, last_timestamp) = self.read(|snapshot| {
            let prepared = validate_commit(pending, &snapshot.store)
                .map_err(LedgerError::ValidationConflict)?;
            let head = snapshot.index.head_revision();
            if self.context.settings.revision_check && pending.parent != head {
                return Err(LedgerError::HeadMismatch {
                    expected: pending.parent,
                    actual: head,
                });
            }
            Ok((prepared, head, snapshot.index.last_timestamp()))
        })??;

        self.context.hooks.pre_commit(pending)?;

        let timestamp = next_timestamp(self.context.clock.now_millis(), last_timestamp);
        let revision = RevisionId::new();
        self.read(|snapshot| snapshot.check_appendable(revision, timestamp))??;
        let mut frozen = pending.clone();
        frozen.inserts = prepared.inserts.clone();
        frozen.updates = prepared.updates.clone();
        frozen.deletions = prepared.deletions.clone();
        frozen.mark_committed(revision, head, timestamp);

        if let Some(journal) = journal.as_mut() {
            journal.append(&frozen)?;
        }

        let mut snapshot = self
            .snapshot
            .write()
            .map_err(|e| LedgerError::LockPoisoned(e.to_string()))?;
        snapshot.apply(prepared, Arc::new(frozen.clone()))?;
        Ok(frozen)
    }

    /// Run `f` against the current snapshot under the shared lock.
    pub fn read<R>(&self, f: impl FnOnce(&StageSnapshot) -> R) -> LedgerResult<R> {
        let snapshot = self
            .snapshot
            .read()
            .map_err(|e| LedgerError::LockPoisoned(e.to_string()))?;
        Ok(f(&snapshot))
    }

    pub fn head_revision(&self) -> LedgerResult<Option<RevisionId>> {
        self.read(|s| s.index.head_revision())
    }

    pub fn last_timestamp(&self) -> LedgerResult<Option<Timestamp>> {
        self.read(|s| s.index.last_timestamp())
    }

    /// Check that the stage's commits form one linear revision chain.
    pub fn verify(&self) -> LedgerResult<ChainReport> {
        self.read(|s| verify_chain(&self.stage, s.index.iter().map(|c| c.as_ref())))
    }
}

/// Re-apply a journaled commit without re-validating its operations.
fn replay(snapshot: &mut StageSnapshot, commit: Commit) -> LedgerResult<()> {
    if !commit.is_committed() {
        return Err(StoreError::Uncommitted.into());
    }
    let head = snapshot.index.head_revision();
    if commit.parent != head {
        return Err(LedgerError::HeadMismatch {
            expected: commit.parent,
            actual: head,
        });
    }
    let prepared = PreparedCommit {
        inserts: commit.inserts.clone(),
        updates: commit.updates.clone(),
        deletions: commit.deletions.clone(),
    };
    snapshot.apply(prepared, Arc::new(commit))
}

impl std::fmt::Debug for CommitLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitLog")
            .field("stage", &self.stage)
            .field("settings", &self.context.settings)
            .finish_non_exhaustive()
    }
}
