//! Commit validation and revision-chain verification.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use edb_store::ObjectStore;
use edb_types::{Commit, EdbObject, Oid, RevisionId, StageId, Timestamp};

/// Every operation of a commit that conflicts with the stage head.
///
/// Validation collects all failures instead of stopping at the first, so the
/// caller can fix a whole batch at once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Inserts whose OID is already live (or repeated within the commit).
    pub failed_inserts: Vec<EdbObject>,
    /// Updates whose OID is absent, or that were built on a stale version
    /// and change entries since rewritten.
    pub failed_updates: Vec<EdbObject>,
    /// Deletions whose OID is absent.
    pub failed_deletes: Vec<Oid>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.failed_inserts.is_empty() && self.failed_updates.is_empty() && self.failed_deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failed_inserts.len() + self.failed_updates.len() + self.failed_deletes.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.failed_inserts.is_empty() {
            parts.push(format!(
                "insert failed, objects already exist: {}",
                join(self.failed_inserts.iter().map(|o| &o.oid))
            ));
        }
        if !self.failed_updates.is_empty() {
            parts.push(format!(
                "update failed, objects missing or stale: {}",
                join(self.failed_updates.iter().map(|o| &o.oid))
            ));
        }
        if !self.failed_deletes.is_empty() {
            parts.push(format!(
                "delete failed, objects missing: {}",
                join(self.failed_deletes.iter())
            ));
        }
        f.write_str(&parts.join("; "))
    }
}

fn join<'a>(oids: impl Iterator<Item = &'a Oid>) -> String {
    oids.map(Oid::as_str).collect::<Vec<_>>().join(", ")
}

/// The objects of a validated commit, stamped with their model versions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreparedCommit {
    pub inserts: Vec<EdbObject>,
    pub updates: Vec<EdbObject>,
    pub deletions: Vec<Oid>,
}

/// Check `commit` against the current state of `store`.
///
/// - An insert requires the OID to be absent (never written, or tombstoned).
/// - An update or delete requires the OID to be live.
/// - An OID may appear at most once per commit.
/// - An update carrying a model version other than the head's is accepted
///   only if every entry it sets still equals the head's value.
///
/// On success inserts are stamped model version `1` and updates the head's
/// version plus one.
pub fn validate_commit<S: ObjectStore + ?Sized>(
    commit: &Commit,
    store: &S,
) -> Result<PreparedCommit, ConflictReport> {
    let mut seen: HashSet<&Oid> = HashSet::new();
    let mut report = ConflictReport::default();
    let mut prepared = PreparedCommit::default();

    for object in &commit.inserts {
        if !seen.insert(&object.oid) || store.is_live(&object.oid) {
            report.failed_inserts.push(object.clone());
            continue;
        }
        let mut stamped = object.clone();
        stamped.timestamp = None;
        stamped.set_model_version(1);
        prepared.inserts.push(stamped);
    }

    for object in &commit.updates {
        let head = match store.head_of(&object.oid) {
            Some(head) if seen.insert(&object.oid) => head,
            _ => {
                report.failed_updates.push(object.clone());
                continue;
            }
        };
        let current = head.model_version().unwrap_or(0);
        if object.model_version().is_some_and(|v| v != current) && is_stale(object, &head) {
            report.failed_updates.push(object.clone());
            continue;
        }
        let mut stamped = object.clone();
        stamped.timestamp = None;
        stamped.set_model_version(current + 1);
        prepared.updates.push(stamped);
    }

    for oid in &commit.deletions {
        if !seen.insert(oid) || !store.is_live(oid) {
            report.failed_deletes.push(oid.clone());
            continue;
        }
        prepared.deletions.push(oid.clone());
    }

    if report.is_empty() {
        Ok(prepared)
    } else {
        Err(report)
    }
}

/// A stale update conflicts when any entry it carries differs from the head.
fn is_stale(update: &EdbObject, head: &EdbObject) -> bool {
    update
        .user_entries()
        .any(|(key, value)| head.get(key) != Some(value))
}

/// Result of verifying a stage's revision chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub stage: StageId,
    pub commit_count: u64,
    pub violations: Vec<ChainViolation>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainViolation {
    /// Zero-based position of the offending commit.
    pub position: u64,
    pub kind: ChainViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainViolationKind {
    Uncommitted,
    ParentMismatch,
    NonMonotonicTimestamp,
    DuplicateRevision,
}

/// Verify that `commits`, in log order, form one linear revision chain.
///
/// Checks that every commit is frozen, that each parent is the previous
/// commit's revision, that timestamps strictly increase and that no
/// revision appears twice.
pub fn verify_chain<'a>(
    stage: &StageId,
    commits: impl IntoIterator<Item = &'a Commit>,
) -> ChainReport {
    let mut violations = Vec::new();
    let mut seen: HashSet<RevisionId> = HashSet::new();
    let mut previous_revision: Option<RevisionId> = None;
    let mut previous_timestamp: Option<Timestamp> = None;
    let mut count = 0u64;

    for (position, commit) in commits.into_iter().enumerate() {
        let position = position as u64;
        count += 1;

        let (Some(revision), Some(timestamp)) = (commit.revision, commit.timestamp) else {
            violations.push(ChainViolation {
                position,
                kind: ChainViolationKind::Uncommitted,
                description: "commit has no revision or timestamp".into(),
            });
            continue;
        };
        if !commit.is_committed() {
            violations.push(ChainViolation {
                position,
                kind: ChainViolationKind::Uncommitted,
                description: format!("commit {revision} is not marked committed"),
            });
        }
        if commit.parent != previous_revision {
            violations.push(ChainViolation {
                position,
                kind: ChainViolationKind::ParentMismatch,
                description: format!(
                    "commit {revision} has parent {:?}, expected {:?}",
                    commit.parent, previous_revision
                ),
            });
        }
        if let Some(prev) = previous_timestamp {
            if timestamp <= prev {
                violations.push(ChainViolation {
                    position,
                    kind: ChainViolationKind::NonMonotonicTimestamp,
                    description: format!("timestamp {timestamp} does not follow {prev}"),
                });
            }
        }
        if !seen.insert(revision) {
            violations.push(ChainViolation {
                position,
                kind: ChainViolationKind::DuplicateRevision,
                description: format!("revision {revision} appears twice"),
            });
        }

        previous_revision = Some(revision);
        previous_timestamp = Some(timestamp);
    }

    ChainReport {
        stage: stage.clone(),
        commit_count: count,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edb_store::InMemoryObjectStore;

    fn store_with(objects: &[(&str, &str)]) -> InMemoryObjectStore {
        let mut store = InMemoryObjectStore::new();
        for (i, (oid, name)) in objects.iter().enumerate() {
            let mut object = EdbObject::new(*oid).with_entry("name", *name);
            object.set_model_version(1);
            store
                .put_version(object, 100 + i as Timestamp, RevisionId::new())
                .unwrap();
        }
        store
    }

    fn commit() -> Commit {
        Commit::new("alice", StageId::root(), None)
    }

    #[test]
    fn insert_of_new_oid_is_stamped_version_one() {
        let store = InMemoryObjectStore::new();
        let mut c = commit();
        c.insert(EdbObject::new("A").with_entry("name", "foo"));
        let prepared = validate_commit(&c, &store).unwrap();
        assert_eq!(prepared.inserts[0].model_version(), Some(1));
    }

    #[test]
    fn insert_of_live_oid_conflicts() {
        let store = store_with(&[("A", "foo")]);
        let mut c = commit();
        c.insert(EdbObject::new("A").with_entry("name", "bar"));
        let report = validate_commit(&c, &store).unwrap_err();
        assert_eq!(report.failed_inserts.len(), 1);
        assert!(report.to_string().contains("already exist: A"));
    }

    #[test]
    fn insert_after_delete_is_allowed() {
        let mut store = store_with(&[("A", "foo")]);
        store.delete_at(&Oid::from("A"), 200, RevisionId::new()).unwrap();
        let mut c = commit();
        c.insert(EdbObject::new("A").with_entry("name", "bar"));
        assert!(validate_commit(&c, &store).is_ok());
    }

    #[test]
    fn update_and_delete_require_live_object() {
        let store = InMemoryObjectStore::new();
        let mut c = commit();
        c.update(EdbObject::new("A").with_entry("name", "foo"));
        c.delete("B");
        let report = validate_commit(&c, &store).unwrap_err();
        assert_eq!(report.failed_updates.len(), 1);
        assert_eq!(report.failed_deletes, vec![Oid::from("B")]);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn update_increments_model_version() {
        let store = store_with(&[("A", "foo")]);
        let mut c = commit();
        c.update(EdbObject::new("A").with_entry("name", "bar"));
        let prepared = validate_commit(&c, &store).unwrap();
        assert_eq!(prepared.updates[0].model_version(), Some(2));
    }

    #[test]
    fn stale_update_with_changed_entries_conflicts() {
        let store = store_with(&[("A", "foo")]);
        let mut c = commit();
        let mut stale = EdbObject::new("A").with_entry("name", "bar");
        stale.set_model_version(0);
        c.update(stale);
        let report = validate_commit(&c, &store).unwrap_err();
        assert_eq!(report.failed_updates.len(), 1);
    }

    #[test]
    fn stale_update_with_unchanged_entries_passes() {
        let store = store_with(&[("A", "foo")]);
        let mut c = commit();
        let mut stale = EdbObject::new("A").with_entry("name", "foo");
        stale.set_model_version(7);
        c.update(stale);
        let prepared = validate_commit(&c, &store).unwrap();
        assert_eq!(prepared.updates[0].model_version(), Some(2));
    }

    #[test]
    fn duplicate_oid_within_commit_conflicts() {
        let store = store_with(&[("A", "foo")]);
        let mut c = commit();
        c.update(EdbObject::new("A").with_entry("name", "bar"));
        c.delete("A");
        let report = validate_commit(&c, &store).unwrap_err();
        assert!(report.failed_updates.is_empty());
        assert_eq!(report.failed_deletes, vec![Oid::from("A")]);
    }

    #[test]
    fn all_conflicts_are_collected() {
        let store = store_with(&[("A", "foo")]);
        let mut c = commit();
        c.insert(EdbObject::new("A"));
        c.update(EdbObject::new("X"));
        c.delete("Y");
        let report = validate_commit(&c, &store).unwrap_err();
        assert_eq!(report.len(), 3);
    }

    fn frozen(parent: Option<RevisionId>, ts: Timestamp) -> Commit {
        let mut c = commit();
        c.mark_committed(RevisionId::new(), parent, ts);
        c
    }

    #[test]
    fn linear_chain_verifies() {
        let first = frozen(None, 10);
        let second = frozen(first.revision, 20);
        let report = verify_chain(&StageId::root(), [&first, &second]);
        assert!(report.is_valid());
        assert_eq!(report.commit_count, 2);
    }

    #[test]
    fn broken_parent_and_time_are_reported() {
        let first = frozen(None, 10);
        let second = frozen(None, 5);
        let report = verify_chain(&StageId::root(), [&first, &second]);
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
        assert_eq!(
            kinds,
            vec![ChainViolationKind::ParentMismatch, ChainViolationKind::NonMonotonicTimestamp]
        );
    }

    #[test]
    fn pending_commit_is_reported() {
        let pending = commit();
        let report = verify_chain(&StageId::root(), [&pending]);
        assert_eq!(report.violations[0].kind, ChainViolationKind::Uncommitted);
    }
}
