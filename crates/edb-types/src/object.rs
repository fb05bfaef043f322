use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entry::EntryValue;
use crate::oid::Oid;
use crate::temporal::Timestamp;

/// Entry key under which the store keeps each object's model version.
///
/// Inserts are stamped `1`; every accepted update is stamped one higher than
/// the version it replaced.
pub const MODEL_VERSION_KEY: &str = "edbVersion";

/// One version of a logical object: its OID plus its entries.
///
/// Entry keys are unique; a `BTreeMap` keeps iteration deterministic so two
/// reads of the same version compare and serialize identically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdbObject {
    pub oid: Oid,
    pub entries: BTreeMap<String, EntryValue>,
    /// Timestamp of the committed version this object was read from; `None`
    /// while the object is still part of a pending commit.
    pub timestamp: Option<Timestamp>,
}

impl EdbObject {
    pub fn new(oid: impl Into<Oid>) -> Self {
        Self {
            oid: oid.into(),
            entries: BTreeMap::new(),
            timestamp: None,
        }
    }

    /// Builder-style entry insertion.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<EntryValue>) -> Self {
        self.put(key, value);
        self
    }

    /// Set an entry, returning the previous value under that key.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<EntryValue>) -> Option<EntryValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&EntryValue> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<EntryValue> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The store-maintained model version, if stamped.
    pub fn model_version(&self) -> Option<i64> {
        self.entries.get(MODEL_VERSION_KEY).and_then(EntryValue::as_i64)
    }

    pub fn set_model_version(&mut self, version: i64) {
        self.entries
            .insert(MODEL_VERSION_KEY.to_string(), EntryValue::Integer(version));
    }

    /// Entries excluding the model version.
    pub fn user_entries(&self) -> impl Iterator<Item = (&String, &EntryValue)> {
        self.entries
            .iter()
            .filter(|(key, _)| key.as_str() != MODEL_VERSION_KEY)
    }

    /// `true` if both objects carry exactly the same entries.
    ///
    /// Timestamps are ignored: two versions written at different times with
    /// identical content are the same state.
    pub fn same_entries(&self, other: &EdbObject) -> bool {
        self.entries == other.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
