//! State diff: compare two head sets.
//!
//! Each side is computed independently (possibly on different stages and at
//! different timestamps). Every OID present on either side is classified:
//! only in `after` is added, only in `before` is removed, present on both
//! with differing entries is changed, identical is omitted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use edb_types::{EdbObject, Oid};

use crate::entry_diff::{diff_entries, EntryDiff};

/// An object present on both sides with different entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangedObject {
    pub before: EdbObject,
    pub after: EdbObject,
}

impl ChangedObject {
    pub fn oid(&self) -> &Oid {
        &self.after.oid
    }

    pub fn entry_changes(&self) -> EntryDiff {
        diff_entries(&self.before.entries, &self.after.entries)
    }
}

/// The difference between two head sets, each list in OID order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub added: Vec<EdbObject>,
    pub changed: Vec<ChangedObject>,
    /// The last version seen on the `before` side.
    pub removed: Vec<EdbObject>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Number of differing objects.
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }

    /// OIDs present only on the `before` side, in OID order.
    pub fn removed_oids(&self) -> Vec<&Oid> {
        self.removed.iter().map(|o| &o.oid).collect()
    }

    /// Key-level changes of every changed object.
    pub fn entry_changes(&self) -> Vec<(&Oid, EntryDiff)> {
        self.changed
            .iter()
            .map(|c| (c.oid(), c.entry_changes()))
            .collect()
    }
}

/// Classify every OID of `before` and `after`.
///
/// Objects are compared by user entries; a version whose only difference is
/// the store-maintained model version or its timestamp is unchanged.
pub fn diff_states(
    before: impl IntoIterator<Item = EdbObject>,
    after: impl IntoIterator<Item = EdbObject>,
) -> Diff {
    let mut left: BTreeMap<Oid, EdbObject> =
        before.into_iter().map(|o| (o.oid.clone(), o)).collect();
    let mut diff = Diff::default();

    let right: BTreeMap<Oid, EdbObject> =
        after.into_iter().map(|o| (o.oid.clone(), o)).collect();

    for object in right.into_values() {
        match left.remove(&object.oid) {
            None => diff.added.push(object),
            Some(previous) => {
                if !diff_entries(&previous.entries, &object.entries).is_empty() {
                    diff.changed.push(ChangedObject {
                        before: previous,
                        after: object,
                    });
                }
            }
        }
    }
    diff.removed = left.into_values().collect();

    debug!(
        added = diff.added.len(),
        changed = diff.changed.len(),
        removed = diff.removed.len(),
        "state diff"
    );
    diff
}
