use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use edb_types::{Commit, EdbObject, EntryValue};

/// Commit predicate key meaning "committed at or before".
pub const TIMESTAMP_KEY: &str = "timestamp";

/// AND-combined `key -> value` predicates. Empty predicates match everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predicates(BTreeMap<String, EntryValue>);

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<EntryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<EntryValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&EntryValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntryValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if `object` has every key with a matching value.
    pub fn matches_object(&self, object: &EdbObject) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| object.get(key).is_some_and(|stored| stored.matches(expected)))
    }

    /// `true` if every predicate holds on the commit's metadata.
    ///
    /// `timestamp` compares "at or before"; other keys compare equal against
    /// [`Commit::attribute`]. Unknown or unset attributes never match.
    pub fn matches_commit(&self, commit: &Commit) -> bool {
        self.0.iter().all(|(key, expected)| {
            if key == TIMESTAMP_KEY {
                let bound = EntryValue::parse_as(edb_types::EntryType::Integer, &expected.render())
                    .ok()
                    .and_then(|v| v.as_i64());
                return matches!((commit.timestamp, bound), (Some(ts), Some(bound)) if ts <= bound);
            }
            commit
                .attribute(key)
                .is_some_and(|stored| EntryValue::String(stored).matches(expected))
        })
    }
}

impl<K: Into<String>, V: Into<EntryValue>> FromIterator<(K, V)> for Predicates {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
