//! Entry-level diff: compare the entries of two versions of one object.
//!
//! The store-maintained model version is not a user entry and never shows up
//! as a change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use edb_types::{EntryValue, MODEL_VERSION_KEY};

/// The key-level changes between two versions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDiff {
    pub changes: Vec<EntryChange>,
}

impl EntryDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn additions(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, EntryChange::Added { .. }))
            .count()
    }

    pub fn removals(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, EntryChange::Removed { .. }))
            .count()
    }

    pub fn modifications(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, EntryChange::Modified { .. }))
            .count()
    }
}

/// A single entry change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EntryChange {
    Added { key: String, value: EntryValue },
    Removed { key: String, value: EntryValue },
    Modified {
        key: String,
        old: EntryValue,
        new: EntryValue,
    },
}

impl EntryChange {
    pub fn key(&self) -> &str {
        match self {
            Self::Added { key, .. } | Self::Removed { key, .. } | Self::Modified { key, .. } => key,
        }
    }
}

/// Compute the entry changes from `old` to `new`, in key order.
pub fn diff_entries(
    old: &BTreeMap<String, EntryValue>,
    new: &BTreeMap<String, EntryValue>,
) -> EntryDiff {
    let mut changes = Vec::new();

    for (key, old_val) in old.iter().filter(|(k, _)| is_user_key(k)) {
        match new.get(key) {
            Some(new_val) if old_val != new_val => changes.push(EntryChange::Modified {
                key: key.clone(),
                old: old_val.clone(),
                new: new_val.clone(),
            }),
            Some(_) => {}
            None => changes.push(EntryChange::Removed {
                key: key.clone(),
                value: old_val.clone(),
            }),
        }
    }

    for (key, new_val) in new.iter().filter(|(k, _)| is_user_key(k)) {
        if !old.contains_key(key) {
            changes.push(EntryChange::Added {
                key: key.clone(),
                value: new_val.clone(),
            });
        }
    }

    changes.sort_by(|a, b| a.key().cmp(b.key()));
    EntryDiff { changes }
}

fn is_user_key(key: &str) -> bool {
    key != MODEL_VERSION_KEY
}
