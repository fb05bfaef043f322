use std::sync::Arc;

use tracing::{debug, info};

use edb_diff::{change_log, diff_states, Diff};
use edb_ledger::{ChainReport, CommitHook, HookPipeline, LogContext};
use edb_query::{
    last_matching_commit, matching_commits, parse_query, query, revisions_of_matching_commits,
    CommitQuery, Predicates,
};
use edb_stage::{StageHandle, StageManager};
use edb_store::ObjectStore;
use edb_types::{
    Clock, Commit, CommitMetaInfo, EdbObject, EntryValue, LogEntry, Oid, RevisionId, Stage,
    StageId, SystemClock, Timestamp,
};

use crate::commit::CommitBuilder;
use crate::config::EdbConfig;
use crate::error::{EdbError, EdbResult};

/// Configures and opens an [`Edb`].
pub struct EdbBuilder {
    config: EdbConfig,
    clock: Arc<dyn Clock>,
    hooks: HookPipeline,
}

impl EdbBuilder {
    pub fn new(config: EdbConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            hooks: HookPipeline::new(),
        }
    }

    /// Replace the wall clock used to stamp commits.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a commit hook. Hooks run in registration order on every
    /// stage.
    pub fn hook(mut self, hook: Arc<dyn CommitHook>) -> Self {
        self.hooks.add(hook);
        self
    }

    pub fn open(self) -> EdbResult<Edb> {
        let context = LogContext {
            clock: self.clock,
            hooks: Arc::new(self.hooks),
            settings: self.config.log_settings(),
        };
        let stages = match &self.config.data_dir {
            Some(dir) => StageManager::open(dir, context)?,
            None => StageManager::in_memory(context),
        };
        info!(
            persistent = self.config.data_dir.is_some(),
            revision_check = self.config.revision_check,
            "edb opened"
        );
        Ok(Edb {
            stages,
            config: self.config,
        })
    }
}

/// The Engineering Database.
///
/// Every read takes an optional stage; `None` means the root stage. An
/// unknown stage fails with [`EdbError::StageNotFound`], except for the two
/// revision-number lookups, which report `None`.
pub struct Edb {
    stages: StageManager,
    config: EdbConfig,
}

impl Edb {
    /// Open a database with the system clock and no hooks.
    pub fn open(config: EdbConfig) -> EdbResult<Self> {
        EdbBuilder::new(config).open()
    }

    pub fn in_memory() -> Self {
        Self {
            stages: StageManager::in_memory(LogContext {
                clock: Arc::new(SystemClock),
                hooks: Arc::new(HookPipeline::new()),
                settings: EdbConfig::default().log_settings(),
            }),
            config: EdbConfig::default(),
        }
    }

    pub fn builder(config: EdbConfig) -> EdbBuilder {
        EdbBuilder::new(config)
    }

    pub fn config(&self) -> &EdbConfig {
        &self.config
    }

    // ---- Stages ----

    pub fn create_stage(&self, id: impl Into<StageId>, creator: &str) -> EdbResult<Stage> {
        Ok(self.stages.create_stage(id.into(), creator)?)
    }

    /// Every stage, sorted by id.
    pub fn stages(&self) -> EdbResult<Vec<Stage>> {
        Ok(self.stages.stages()?)
    }

    // ---- Commits ----

    /// A pending commit whose parent is the target stage's current head.
    pub fn build_commit(&self, builder: CommitBuilder) -> EdbResult<Commit> {
        let handle = self.stages.get(builder.target_stage())?;
        let parent = handle.log().head_revision()?;
        Ok(builder.build(parent))
    }

    /// Validate and apply `pending` to its stage. On success `pending` is the
    /// frozen commit and its timestamp is returned.
    pub fn commit(&self, pending: &mut Commit) -> EdbResult<Timestamp> {
        let handle = self.stages.get(&pending.stage)?;
        Ok(handle.log().commit(pending)?)
    }

    // ---- Objects ----

    /// Current version of `oid`, `None` if deleted or unknown.
    pub fn get_object(&self, oid: &Oid, stage: Option<&StageId>) -> EdbResult<Option<EdbObject>> {
        self.read(stage, |s| s.store.head_of(oid))
    }

    /// Version of `oid` visible at `timestamp`.
    pub fn get_object_at(
        &self,
        oid: &Oid,
        timestamp: Timestamp,
        stage: Option<&StageId>,
    ) -> EdbResult<Option<EdbObject>> {
        self.read(stage, |s| s.store.at(oid, timestamp))
    }

    /// Current versions of the given OIDs that exist, in request order.
    pub fn get_objects(&self, oids: &[Oid], stage: Option<&StageId>) -> EdbResult<Vec<EdbObject>> {
        self.read(stage, |s| oids.iter().filter_map(|oid| s.store.head_of(oid)).collect())
    }

    /// Every object visible at `timestamp` (or currently), in OID order.
    pub fn get_head(&self, timestamp: Option<Timestamp>, stage: Option<&StageId>) -> EdbResult<Vec<EdbObject>> {
        self.read(stage, |s| s.store.head_set(timestamp))
    }

    /// Live versions of `oid` in `[from, to]`, oldest first. Open bounds
    /// default to the whole history.
    pub fn get_history(
        &self,
        oid: &Oid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
        stage: Option<&StageId>,
    ) -> EdbResult<Vec<EdbObject>> {
        let (from, to) = bounds(from, to);
        self.read(stage, |s| s.store.history(oid, from, to))
    }

    /// Insert/update/delete records of `oid` in `[from, to]`.
    pub fn get_log(
        &self,
        oid: &Oid,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
        stage: Option<&StageId>,
    ) -> EdbResult<Vec<LogEntry>> {
        let (from, to) = bounds(from, to);
        self.read(stage, |s| {
            s.store
                .chain(oid)
                .map(|chain| change_log(chain, from, to))
                .unwrap_or_default()
        })
    }

    /// OIDs deleted and later inserted again.
    pub fn get_resurrected_oids(&self, stage: Option<&StageId>) -> EdbResult<Vec<Oid>> {
        self.read(stage, |s| s.store.resurrected())
    }

    // ---- Queries ----

    /// Objects visible at `timestamp` (or currently) matching every predicate.
    pub fn query(
        &self,
        predicates: &Predicates,
        timestamp: Option<Timestamp>,
        stage: Option<&StageId>,
    ) -> EdbResult<Vec<EdbObject>> {
        self.read(stage, |s| query(predicates, s.store.head_set(timestamp)))
    }

    /// Like [`query`](Self::query), with predicates parsed from
    /// `key:value (and key:value)*`.
    pub fn query_str(
        &self,
        text: &str,
        timestamp: Option<Timestamp>,
        stage: Option<&StageId>,
    ) -> EdbResult<Vec<EdbObject>> {
        let predicates = parse_query(text)?;
        self.query(&predicates, timestamp, stage)
    }

    pub fn query_by_key_value(
        &self,
        key: &str,
        value: impl Into<EntryValue>,
        timestamp: Option<Timestamp>,
        stage: Option<&StageId>,
    ) -> EdbResult<Vec<EdbObject>> {
        self.query(&Predicates::new().with(key, value), timestamp, stage)
    }

    // ---- Commit history ----

    /// Commits matching every predicate, oldest first.
    pub fn get_commits(&self, predicates: &Predicates, stage: Option<&StageId>) -> EdbResult<Vec<Commit>> {
        self.read(stage, |s| {
            matching_commits(predicates, s.index.iter())
                .into_iter()
                .map(|c| c.as_ref().clone())
                .collect()
        })
    }

    /// The latest commit matching every predicate.
    pub fn get_last_commit(&self, predicates: &Predicates, stage: Option<&StageId>) -> EdbResult<Option<Commit>> {
        self.read(stage, |s| {
            last_matching_commit(predicates, s.index.iter()).map(|c| c.as_ref().clone())
        })
    }

    /// The latest commit with timestamp at or before `timestamp`.
    pub fn get_commit(&self, timestamp: Timestamp, stage: Option<&StageId>) -> EdbResult<Option<Commit>> {
        self.read(stage, |s| s.index.at_or_before(timestamp).map(|c| c.as_ref().clone()))
    }

    pub fn get_commit_by_revision(&self, revision: &RevisionId, stage: Option<&StageId>) -> EdbResult<Commit> {
        self.read(stage, |s| s.index.by_revision(revision).map(|c| c.as_ref().clone()))?
            .ok_or(EdbError::RevisionNotFound(*revision))
    }

    /// The stage's head revision. An unknown stage reports `None`.
    pub fn get_current_revision_number(&self, stage: Option<&StageId>) -> EdbResult<Option<RevisionId>> {
        match self.stages.try_resolve(stage)? {
            Some(handle) => Ok(handle.log().head_revision()?),
            None => {
                debug!(stage = ?stage, "revision lookup on unknown stage");
                Ok(None)
            }
        }
    }

    /// Revision of the latest commit made in `context`. An unknown stage
    /// reports `None`.
    pub fn get_last_revision_number_of_context(
        &self,
        context: &str,
        stage: Option<&StageId>,
    ) -> EdbResult<Option<RevisionId>> {
        let Some(handle) = self.stages.try_resolve(stage)? else {
            debug!(stage = ?stage, "context lookup on unknown stage");
            return Ok(None);
        };
        let predicates = Predicates::new().with("context", context);
        Ok(handle
            .log()
            .read(|s| last_matching_commit(&predicates, s.index.iter()).and_then(|c| c.revision))?)
    }

    /// The head set at the timestamp of the latest commit matching every
    /// predicate; empty if nothing matches.
    pub fn get_state_of_last_commit_matching(
        &self,
        predicates: &Predicates,
        stage: Option<&StageId>,
    ) -> EdbResult<Vec<EdbObject>> {
        self.read(stage, |s| {
            last_matching_commit(predicates, s.index.iter())
                .and_then(|c| c.timestamp)
                .map(|ts| s.store.head_set(Some(ts)))
                .unwrap_or_default()
        })
    }

    /// Metadata of every commit matching `query`, oldest first.
    pub fn get_revisions_of_matching_commits(
        &self,
        query: &CommitQuery,
        stage: Option<&StageId>,
    ) -> EdbResult<Vec<CommitMetaInfo>> {
        self.read(stage, |s| revisions_of_matching_commits(query, s.index.iter()))
    }

    // ---- Diffs ----

    /// Difference between the head set of `stage_a` at `ts_a` and the head
    /// set of `stage_b` at `ts_b`.
    pub fn get_diff(
        &self,
        ts_a: Timestamp,
        ts_b: Timestamp,
        stage_a: Option<&StageId>,
        stage_b: Option<&StageId>,
    ) -> EdbResult<Diff> {
        let before = self.get_head(Some(ts_a), stage_a)?;
        let after = self.get_head(Some(ts_b), stage_b)?;
        Ok(diff_states(before, after))
    }

    // ---- Integrity ----

    /// Check that the stage's commits form one linear revision chain.
    pub fn verify(&self, stage: Option<&StageId>) -> EdbResult<ChainReport> {
        Ok(self.stage(stage)?.log().verify()?)
    }

    fn stage(&self, stage: Option<&StageId>) -> EdbResult<Arc<StageHandle>> {
        Ok(self.stages.resolve(stage)?)
    }

    fn read<R>(&self, stage: Option<&StageId>, f: impl FnOnce(&edb_ledger::StageSnapshot) -> R) -> EdbResult<R> {
        Ok(self.stage(stage)?.log().read(f)?)
    }
}

fn bounds(from: Option<Timestamp>, to: Option<Timestamp>) -> (Timestamp, Timestamp) {
    (from.unwrap_or(Timestamp::MIN), to.unwrap_or(Timestamp::MAX))
}

impl std::fmt::Debug for Edb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Edb")
            .field("config", &self.config)
            .field("stages", &self.stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edb_ledger::HookDecision;
    use edb_types::{LogKind, ManualClock};
    use std::sync::Mutex;

    fn db_at(start: Timestamp, revision_check: bool) -> (Edb, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let config = EdbConfig {
            revision_check,
            ..EdbConfig::default()
        };
        let edb = Edb::builder(config).clock(clock.clone()).open().unwrap();
        (edb, clock)
    }

    fn named(oid: &str, name: &str) -> EdbObject {
        EdbObject::new(oid).with_entry("name", name)
    }

    fn commit(edb: &Edb, builder: CommitBuilder) -> Commit {
        let mut pending = edb.build_commit(builder).unwrap();
        edb.commit(&mut pending).unwrap();
        pending
    }

    fn name_of(object: Option<EdbObject>) -> Option<String> {
        object.and_then(|o| o.get("name").map(EntryValue::render))
    }

    /// Insert "A" at 100, update it at 200.
    fn foo_bar() -> (Edb, Arc<ManualClock>) {
        let (edb, clock) = db_at(100, true);
        commit(&edb, CommitBuilder::new("alice").insert(named("A", "foo")));
        clock.set(200);
        commit(&edb, CommitBuilder::new("alice").update(named("A", "bar")));
        (edb, clock)
    }

    #[test]
    fn time_travel_scenario() {
        let (edb, _) = foo_bar();
        let a = Oid::from("A");
        assert_eq!(name_of(edb.get_object_at(&a, 150, None).unwrap()).as_deref(), Some("foo"));
        assert_eq!(name_of(edb.get_object_at(&a, 250, None).unwrap()).as_deref(), Some("bar"));
        assert_eq!(name_of(edb.get_object(&a, None).unwrap()).as_deref(), Some("bar"));
        assert!(edb.get_object_at(&a, 99, None).unwrap().is_none());

        let diff = edb.get_diff(100, 200, None, None).unwrap();
        assert_eq!(diff.changed.len(), 1);
        let change = &diff.changed[0];
        assert_eq!(change.oid().as_str(), "A");
        assert_eq!(name_of(Some(change.before.clone())).as_deref(), Some("foo"));
        assert_eq!(name_of(Some(change.after.clone())).as_deref(), Some("bar"));
        assert!(diff.added.is_empty() && diff.removed.is_empty());
    }

    #[test]
    fn revision_chain_links_commits() {
        let (edb, clock) = db_at(10, true);
        assert!(edb.get_current_revision_number(None).unwrap().is_none());

        let mut revisions = Vec::new();
        for i in 0..4 {
            clock.advance(10);
            let c = commit(&edb, CommitBuilder::new("alice").insert(named(&format!("o{i}"), "x")));
            assert_eq!(edb.get_current_revision_number(None).unwrap(), c.revision);
            revisions.push(c.revision.unwrap());
        }

        let mut expected_parent = None;
        for revision in &revisions {
            let stored = edb.get_commit_by_revision(revision, None).unwrap();
            assert_eq!(stored.parent, expected_parent);
            expected_parent = Some(*revision);
        }
        assert!(edb.verify(None).unwrap().is_valid());
    }

    #[test]
    fn head_at_timestamp_is_union_of_versions() {
        let (edb, clock) = db_at(100, true);
        commit(&edb, CommitBuilder::new("a").insert(named("A", "1")).insert(named("B", "1")));
        clock.set(200);
        commit(&edb, CommitBuilder::new("a").delete("B").insert(named("C", "1")));
        clock.set(300);
        commit(&edb, CommitBuilder::new("a").update(named("A", "2")));

        for t in [50, 100, 150, 200, 250, 300, 400] {
            let head = edb.get_head(Some(t), None).unwrap();
            let expected: Vec<EdbObject> = ["A", "B", "C"]
                .iter()
                .filter_map(|oid| edb.get_object_at(&Oid::from(*oid), t, None).unwrap())
                .collect();
            assert_eq!(head, expected, "t = {t}");
        }
        let oids: Vec<String> = edb
            .get_head(Some(250), None)
            .unwrap()
            .iter()
            .map(|o| o.oid.to_string())
            .collect();
        assert_eq!(oids, vec!["A", "C"]);
        assert_eq!(edb.get_head(None, None).unwrap(), edb.get_head(Some(300), None).unwrap());
    }

    #[test]
    fn repeated_reads_and_recommit() {
        let (edb, _) = foo_bar();
        let a = Oid::from("A");
        let first = edb.get_object_at(&a, 150, None).unwrap();
        let second = edb.get_object_at(&a, 150, None).unwrap();
        assert_eq!(first, second);

        let mut frozen = edb.get_commit(i64::MAX, None).unwrap().unwrap();
        let head = edb.get_current_revision_number(None).unwrap();
        assert!(matches!(edb.commit(&mut frozen), Err(EdbError::AlreadyCommitted)));
        assert_eq!(edb.get_current_revision_number(None).unwrap(), head);
    }

    #[test]
    fn self_diff_is_empty() {
        let (edb, _) = foo_bar();
        for t in [0, 100, 150, 200, 999] {
            assert!(edb.get_diff(t, t, None, None).unwrap().is_empty());
        }
    }

    #[test]
    fn concurrent_insert_with_revision_check() {
        let (edb, _) = db_at(100, true);
        let mut first = edb.build_commit(CommitBuilder::new("a").insert(named("X", "1"))).unwrap();
        let mut second = edb.build_commit(CommitBuilder::new("b").insert(named("X", "2"))).unwrap();
        edb.commit(&mut first).unwrap();
        let err = edb.commit(&mut second).unwrap_err();
        let report = err.conflicts().unwrap();
        assert_eq!(report.failed_inserts.len(), 1);
        assert_eq!(report.failed_inserts[0].oid.as_str(), "X");
        assert!(!second.is_committed());
    }

    #[test]
    fn clean_commit_on_stale_parent_is_rejected() {
        let (edb, _) = db_at(100, true);
        let mut first = edb.build_commit(CommitBuilder::new("a").insert(named("X", "1"))).unwrap();
        let mut second = edb.build_commit(CommitBuilder::new("b").insert(named("Y", "1"))).unwrap();
        edb.commit(&mut first).unwrap();
        let err = edb.commit(&mut second).unwrap_err();
        assert!(matches!(err, EdbError::HeadMismatch { expected: None, .. }));
        assert!(edb.get_object(&Oid::from("Y"), None).unwrap().is_none());
    }

    #[test]
    fn nan_entry_self_diff_is_empty() {
        let (edb, _) = db_at(100, true);
        let mut pending = edb
            .build_commit(CommitBuilder::new("a").insert(EdbObject::new("A").with_entry("f", f64::NAN)))
            .unwrap();
        let ts = edb.commit(&mut pending).unwrap();
        assert!(edb.get_diff(ts, ts, None, None).unwrap().is_empty());
        assert_eq!(edb.get_diff(ts - 1, ts, None, None).unwrap().added.len(), 1);
    }

    #[test]
    fn concurrent_insert_without_revision_check() {
        let (edb, _) = db_at(100, false);
        let mut first = edb.build_commit(CommitBuilder::new("a").insert(named("X", "1"))).unwrap();
        let mut second = edb.build_commit(CommitBuilder::new("b").insert(named("X", "2"))).unwrap();
        edb.commit(&mut first).unwrap();
        let err = edb.commit(&mut second).unwrap_err();
        let report = err.conflicts().unwrap();
        assert_eq!(report.failed_inserts.len(), 1);
        assert_eq!(report.failed_inserts[0].oid.as_str(), "X");
    }

    #[test]
    fn resurrection_is_detected() {
        let (edb, clock) = db_at(1, true);
        commit(&edb, CommitBuilder::new("a").insert(named("X", "1")).insert(named("Y", "1")));
        clock.set(2);
        commit(&edb, CommitBuilder::new("a").delete("X").delete("Y"));
        clock.set(3);
        commit(&edb, CommitBuilder::new("a").insert(named("X", "again")));

        assert_eq!(edb.get_resurrected_oids(None).unwrap(), vec![Oid::from("X")]);
        let kinds: Vec<LogKind> = edb
            .get_log(&Oid::from("X"), None, None, None)
            .unwrap()
            .iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(kinds, vec![LogKind::Insert, LogKind::Delete, LogKind::Insert]);
    }

    #[test]
    fn history_is_ordered_and_exact() {
        let (edb, clock) = db_at(100, true);
        commit(&edb, CommitBuilder::new("a").insert(named("A", "1")));
        for (t, name) in [(200, "2"), (300, "3")] {
            clock.set(t);
            commit(&edb, CommitBuilder::new("a").update(named("A", name)));
        }
        let a = Oid::from("A");
        let all = edb.get_history(&a, None, None, None).unwrap();
        let stamps: Vec<_> = all.iter().map(|o| o.timestamp.unwrap()).collect();
        assert_eq!(stamps, vec![100, 200, 300]);

        let exact = edb.get_history(&a, Some(200), Some(200), None).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(name_of(exact.into_iter().next()).as_deref(), Some("2"));
        assert_eq!(exact_model_versions(&all), vec![1, 2, 3]);
    }

    fn exact_model_versions(objects: &[EdbObject]) -> Vec<i64> {
        objects.iter().filter_map(EdbObject::model_version).collect()
    }

    #[test]
    fn queries_over_objects() {
        let (edb, clock) = db_at(100, true);
        commit(
            &edb,
            CommitBuilder::new("a")
                .insert(EdbObject::new("P1").with_entry("kind", "pump").with_entry("rating", 3))
                .insert(EdbObject::new("P2").with_entry("kind", "pump").with_entry("rating", 5))
                .insert(EdbObject::new("V1").with_entry("kind", "valve").with_entry("rating", 3)),
        );
        clock.set(200);
        commit(&edb, CommitBuilder::new("a").delete("P2"));

        let pumps = edb.query_str(r#"kind:"pump""#, None, None).unwrap();
        assert_eq!(pumps.len(), 1);
        let pumps_then = edb.query_str("kind:pump", Some(150), None).unwrap();
        assert_eq!(pumps_then.len(), 2);
        let rated = edb.query_str("kind:pump and rating:3", None, None).unwrap();
        assert_eq!(rated[0].oid.as_str(), "P1");
        assert_eq!(edb.query_by_key_value("rating", 3, None, None).unwrap().len(), 2);
        assert_eq!(edb.query(&Predicates::new(), None, None).unwrap().len(), 2);
        assert!(matches!(
            edb.query_str("kind pump", None, None),
            Err(EdbError::MalformedQuery(_))
        ));
    }

    #[test]
    fn commit_queries() {
        let (edb, clock) = db_at(100, true);
        commit(&edb, CommitBuilder::new("alice").context("c1").insert(named("A", "1")));
        clock.set(200);
        let second = commit(&edb, CommitBuilder::new("bob").context("c1").update(named("A", "2")));
        clock.set(300);
        let third = commit(&edb, CommitBuilder::new("alice").context("c2").insert(named("B", "1")));

        let by_alice = Predicates::new().with("committer", "alice");
        assert_eq!(edb.get_commits(&by_alice, None).unwrap().len(), 2);
        assert_eq!(edb.get_last_commit(&by_alice, None).unwrap().unwrap().revision, third.revision);
        assert!(edb
            .get_last_commit(&Predicates::new().with("committer", "carol"), None)
            .unwrap()
            .is_none());

        assert_eq!(edb.get_commit(250, None).unwrap().unwrap().revision, second.revision);
        assert!(edb.get_commit(50, None).unwrap().is_none());

        assert_eq!(edb.get_last_revision_number_of_context("c1", None).unwrap(), second.revision);
        assert_eq!(edb.get_last_revision_number_of_context("c9", None).unwrap(), None);

        let state = edb
            .get_state_of_last_commit_matching(&Predicates::new().with("context", "c1"), None)
            .unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(name_of(state.into_iter().next()).as_deref(), Some("2"));

        let infos = edb
            .get_revisions_of_matching_commits(&CommitQuery::new().committer("alice").between(0, 1_000), None)
            .unwrap();
        let stamps: Vec<_> = infos.iter().map(|i| i.timestamp).collect();
        assert_eq!(stamps, vec![Some(100), Some(300)]);

        let missing = RevisionId::new();
        assert!(matches!(
            edb.get_commit_by_revision(&missing, None),
            Err(EdbError::RevisionNotFound(r)) if r == missing
        ));
    }

    #[test]
    fn stages_are_isolated() {
        let (edb, clock) = db_at(100, true);
        edb.create_stage("dev", "alice").unwrap();
        let dev = StageId::from("dev");

        commit(&edb, CommitBuilder::new("a").stage("dev").insert(named("A", "dev")));
        clock.set(200);
        commit(&edb, CommitBuilder::new("a").insert(named("A", "root")));

        let a = Oid::from("A");
        assert_eq!(name_of(edb.get_object(&a, Some(&dev)).unwrap()).as_deref(), Some("dev"));
        assert_eq!(name_of(edb.get_object(&a, None).unwrap()).as_deref(), Some("root"));

        let diff = edb.get_diff(300, 300, None, Some(&dev)).unwrap();
        assert_eq!(diff.changed.len(), 1);

        let ids: Vec<String> = edb.stages().unwrap().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(ids, vec!["dev", "root"]);
        assert!(matches!(edb.create_stage("dev", "bob"), Err(EdbError::StageExists(_))));
        assert!(matches!(edb.create_stage("a b", "bob"), Err(EdbError::InvalidStageId { .. })));
    }

    #[test]
    fn unknown_stage_policy() {
        let edb = Edb::in_memory();
        let ghost = StageId::from("ghost");
        let a = Oid::from("A");
        assert!(matches!(edb.get_object(&a, Some(&ghost)), Err(EdbError::StageNotFound(_))));
        assert!(matches!(edb.get_head(None, Some(&ghost)), Err(EdbError::StageNotFound(_))));
        assert!(matches!(
            edb.build_commit(CommitBuilder::new("a").stage("ghost")),
            Err(EdbError::StageNotFound(_))
        ));
        assert_eq!(edb.get_current_revision_number(Some(&ghost)).unwrap(), None);
        assert_eq!(edb.get_last_revision_number_of_context("c", Some(&ghost)).unwrap(), None);
    }

    #[test]
    fn conflicts_collect_every_failure() {
        let (edb, _) = foo_bar();
        let mut bad = edb
            .build_commit(
                CommitBuilder::new("a")
                    .insert(named("A", "dup"))
                    .update(named("Missing", "x"))
                    .delete("Gone"),
            )
            .unwrap();
        let head = edb.get_head(None, None).unwrap();
        let err = edb.commit(&mut bad).unwrap_err();
        let report = err.conflicts().unwrap();
        assert_eq!(report.failed_inserts.len(), 1);
        assert_eq!(report.failed_updates.len(), 1);
        assert_eq!(report.failed_deletes, vec![Oid::from("Gone")]);
        assert_eq!(edb.get_head(None, None).unwrap(), head);
        assert!(!bad.is_committed());
    }

    struct Audit(Mutex<Vec<String>>);

    impl CommitHook for Audit {
        fn name(&self) -> &str {
            "audit"
        }

        fn on_begin(&self, commit: &Commit) -> HookDecision {
            if commit.committer == "mallory" {
                HookDecision::reject("unknown committer")
            } else {
                HookDecision::Continue
            }
        }

        fn on_post_commit(&self, commit: &Commit) {
            self.0.lock().unwrap().push(format!("ok {}", commit.committer));
        }

        fn on_error(&self, commit: &Commit, _error: &edb_ledger::LedgerError) {
            self.0.lock().unwrap().push(format!("err {}", commit.committer));
        }
    }

    #[test]
    fn hooks_observe_and_reject() {
        let audit = Arc::new(Audit(Mutex::new(Vec::new())));
        let edb = Edb::builder(EdbConfig::default())
            .clock(Arc::new(ManualClock::new(1)))
            .hook(audit.clone())
            .open()
            .unwrap();

        commit(&edb, CommitBuilder::new("alice").insert(named("A", "1")));
        let mut rejected = edb
            .build_commit(CommitBuilder::new("mallory").insert(named("B", "1")))
            .unwrap();
        let err = edb.commit(&mut rejected).unwrap_err();
        assert!(matches!(err, EdbError::HookRejected { ref hook, .. } if hook == "audit"));
        assert!(edb.get_object(&Oid::from("B"), None).unwrap().is_none());
        assert_eq!(*audit.0.lock().unwrap(), vec!["ok alice", "err mallory"]);
    }

    #[test]
    fn journal_replay_restores_everything() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(100));
        let open = || {
            Edb::builder(EdbConfig::persistent(dir.path()))
                .clock(clock.clone())
                .open()
                .unwrap()
        };

        let (head, history, revisions) = {
            let edb = open();
            edb.create_stage("dev", "alice").unwrap();
            commit(&edb, CommitBuilder::new("a").insert(named("A", "1")).insert(named("B", "1")));
            clock.set(200);
            commit(&edb, CommitBuilder::new("a").update(named("A", "2")).delete("B"));
            clock.set(300);
            commit(&edb, CommitBuilder::new("a").stage("dev").insert(named("D", "1")));
            let revisions: Vec<_> = edb
                .get_commits(&Predicates::new(), None)
                .unwrap()
                .iter()
                .map(|c| (c.revision, c.parent, c.timestamp))
                .collect();
            (
                edb.get_head(None, None).unwrap(),
                edb.get_history(&Oid::from("A"), None, None, None).unwrap(),
                revisions,
            )
        };

        let edb = open();
        assert_eq!(edb.get_head(None, None).unwrap(), head);
        assert_eq!(edb.get_history(&Oid::from("A"), None, None, None).unwrap(), history);
        let replayed: Vec<_> = edb
            .get_commits(&Predicates::new(), None)
            .unwrap()
            .iter()
            .map(|c| (c.revision, c.parent, c.timestamp))
            .collect();
        assert_eq!(replayed, revisions);
        assert!(edb.get_object(&Oid::from("D"), Some(&StageId::from("dev"))).unwrap().is_some());

        // The replayed head accepts new commits.
        clock.set(400);
        commit(&edb, CommitBuilder::new("a").update(named("A", "3")));
        assert!(edb.verify(None).unwrap().is_valid());
    }

    #[test]
    fn parallel_commits_serialize() {
        let (edb, _) = db_at(1, false);
        let edb = Arc::new(edb);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let edb = Arc::clone(&edb);
                std::thread::spawn(move || {
                    let mut pending = edb
                        .build_commit(CommitBuilder::new(format!("w{i}")).insert(named(&format!("o{i}"), "x")))
                        .unwrap();
                    edb.commit(&mut pending).unwrap()
                })
            })
            .collect();
        let mut stamps: Vec<Timestamp> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        stamps.sort_unstable();
        stamps.dedup();
        assert_eq!(stamps.len(), 8);
        assert_eq!(edb.get_head(None, None).unwrap().len(), 8);
        assert!(edb.verify(None).unwrap().is_valid());
    }
}
