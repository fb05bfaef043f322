use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use edb_types::{Commit, CommitMetaInfo, EdbObject, EntryValue, Timestamp};

use crate::predicate::Predicates;

/// Objects among `candidates` that satisfy every predicate, in input order.
pub fn query(predicates: &Predicates, candidates: impl IntoIterator<Item = EdbObject>) -> Vec<EdbObject> {
    let matched: Vec<EdbObject> = candidates
        .into_iter()
        .filter(|object| predicates.matches_object(object))
        .collect();
    debug!(predicates = predicates.len(), matched = matched.len(), "object query");
    matched
}

pub fn query_by_key_value(
    key: impl Into<String>,
    value: impl Into<EntryValue>,
    candidates: impl IntoIterator<Item = EdbObject>,
) -> Vec<EdbObject> {
    query(&Predicates::new().with(key, value), candidates)
}

/// Commits satisfying every predicate, in input (timestamp) order.
pub fn matching_commits<'a>(
    predicates: &Predicates,
    commits: impl IntoIterator<Item = &'a Arc<Commit>>,
) -> Vec<Arc<Commit>> {
    commits
        .into_iter()
        .filter(|commit| predicates.matches_commit(commit))
        .cloned()
        .collect()
}

/// The latest commit satisfying every predicate.
///
/// `commits` must be in timestamp order; it is searched from the back.
pub fn last_matching_commit<'a, I>(predicates: &Predicates, commits: I) -> Option<Arc<Commit>>
where
    I: IntoIterator<Item = &'a Arc<Commit>>,
    I::IntoIter: DoubleEndedIterator,
{
    commits
        .into_iter()
        .rev()
        .find(|commit| predicates.matches_commit(commit))
        .cloned()
}

/// Filter for [`revisions_of_matching_commits`].
///
/// Unset fields do not restrict; `from` and `to` are inclusive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitQuery {
    pub committer: Option<String>,
    pub context: Option<String>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
}

impl CommitQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committer(mut self, committer: impl Into<String>) -> Self {
        self.committer = Some(committer.into());
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn between(mut self, from: Timestamp, to: Timestamp) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, commit: &Commit) -> bool {
        if self.committer.as_ref().is_some_and(|c| *c != commit.committer) {
            return false;
        }
        if self.context.is_some() && self.context != commit.context {
            return false;
        }
        let Some(ts) = commit.timestamp else {
            return false;
        };
        self.from.map_or(true, |from| ts >= from) && self.to.map_or(true, |to| ts <= to)
    }
}

/// Metadata of every commit matching `query`, oldest first.
pub fn revisions_of_matching_commits<'a>(
    query: &CommitQuery,
    commits: impl IntoIterator<Item = &'a Arc<Commit>>,
) -> Vec<CommitMetaInfo> {
    commits
        .into_iter()
        .filter(|commit| query.matches(commit))
        .map(|commit| commit.meta_info())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use edb_types::{RevisionId, StageId};

    fn objects() -> Vec<EdbObject> {
        vec![
            EdbObject::new("A").with_entry("kind", "pump").with_entry("rating", 3),
            EdbObject::new("B").with_entry("kind", "valve").with_entry("rating", 3),
            EdbObject::new("C").with_entry("kind", "pump").with_entry("rating", 5),
        ]
    }

    fn oids(objects: &[EdbObject]) -> Vec<&str> {
        objects.iter().map(|o| o.oid.as_str()).collect()
    }

    #[test]
    fn query_filters_in_order() {
        let hits = query(&Predicates::new().with("kind", "pump"), objects());
        assert_eq!(oids(&hits), vec!["A", "C"]);
        let hits = query(&Predicates::new().with("kind", "pump").with("rating", "5"), objects());
        assert_eq!(oids(&hits), vec!["C"]);
        assert_eq!(query(&Predicates::new(), objects()).len(), 3);
    }

    #[test]
    fn key_value_shortcut() {
        let hits = query_by_key_value("rating", 3, objects());
        assert_eq!(oids(&hits), vec!["A", "B"]);
    }

    fn history() -> Vec<Arc<Commit>> {
        let mut parent = None;
        [("alice", "c1", 100), ("bob", "c1", 200), ("alice", "c2", 300)]
            .into_iter()
            .map(|(committer, context, ts)| {
                let mut commit = Commit::new(committer, StageId::root(), parent);
                commit.context = Some(context.to_string());
                commit.mark_committed(RevisionId::new(), parent, ts);
                parent = commit.revision;
                Arc::new(commit)
            })
            .collect()
    }

    #[test]
    fn commit_matching_and_last_match() {
        let commits = history();
        let by_alice = Predicates::new().with("committer", "alice");
        assert_eq!(matching_commits(&by_alice, &commits).len(), 2);

        let last = last_matching_commit(&by_alice, &commits).unwrap();
        assert_eq!(last.timestamp, Some(300));

        let before = Predicates::new().with("committer", "alice").with("timestamp", 250);
        let last = last_matching_commit(&before, &commits).unwrap();
        assert_eq!(last.timestamp, Some(100));

        let nobody = Predicates::new().with("committer", "carol");
        assert!(last_matching_commit(&nobody, &commits).is_none());
    }

    #[test]
    fn commit_query_returns_meta_info_in_order() {
        let commits = history();
        let infos = revisions_of_matching_commits(&CommitQuery::new().context("c1"), &commits);
        let stamps: Vec<_> = infos.iter().map(|i| i.timestamp).collect();
        assert_eq!(stamps, vec![Some(100), Some(200)]);
        assert_eq!(infos[1].parent, infos[0].revision);

        let window = CommitQuery::new().committer("alice").between(100, 299);
        assert_eq!(revisions_of_matching_commits(&window, &commits).len(), 1);
        let all = CommitQuery::new().between(100, 300);
        assert_eq!(revisions_of_matching_commits(&all, &commits).len(), 3);
    }
}
