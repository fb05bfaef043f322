use serde::{Deserialize, Serialize};

use crate::object::EdbObject;
use crate::oid::Oid;
use crate::revision::RevisionId;
use crate::stage::StageId;
use crate::temporal::Timestamp;

/// An atomic batch of inserts, updates and deletions.
///
/// A commit is built pending, submitted once, and frozen by the commit log:
/// the log assigns `revision` and `timestamp`, rewrites `parent` to the head
/// it was applied on, and marks it committed. A committed commit can never be
/// submitted again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub revision: Option<RevisionId>,
    pub parent: Option<RevisionId>,
    pub timestamp: Option<Timestamp>,
    pub committer: String,
    pub context: Option<String>,
    pub stage: StageId,
    pub domain_id: Option<String>,
    pub connector_id: Option<String>,
    pub instance_id: Option<String>,
    pub comment: Option<String>,
    pub inserts: Vec<EdbObject>,
    pub updates: Vec<EdbObject>,
    pub deletions: Vec<Oid>,
    committed: bool,
}

impl Commit {
    /// A pending commit against `stage` expecting `parent` as the head.
    pub fn new(committer: impl Into<String>, stage: StageId, parent: Option<RevisionId>) -> Self {
        Self {
            revision: None,
            parent,
            timestamp: None,
            committer: committer.into(),
            context: None,
            stage,
            domain_id: None,
            connector_id: None,
            instance_id: None,
            comment: None,
            inserts: Vec::new(),
            updates: Vec::new(),
            deletions: Vec::new(),
            committed: false,
        }
    }

    pub fn insert(&mut self, object: EdbObject) {
        self.inserts.push(object);
    }

    pub fn update(&mut self, object: EdbObject) {
        self.updates.push(object);
    }

    pub fn delete(&mut self, oid: impl Into<Oid>) {
        self.deletions.push(oid.into());
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Freeze this commit. Only the commit log (and journal replay) call this.
    pub fn mark_committed(
        &mut self,
        revision: RevisionId,
        parent: Option<RevisionId>,
        timestamp: Timestamp,
    ) {
        self.revision = Some(revision);
        self.parent = parent;
        self.timestamp = Some(timestamp);
        for object in self.inserts.iter_mut().chain(self.updates.iter_mut()) {
            object.timestamp = Some(timestamp);
        }
        self.committed = true;
    }

    /// Every OID this commit touches, in insert/update/delete order.
    pub fn touched_oids(&self) -> impl Iterator<Item = &Oid> {
        self.inserts
            .iter()
            .map(|o| &o.oid)
            .chain(self.updates.iter().map(|o| &o.oid))
            .chain(self.deletions.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletions.is_empty()
    }

    /// Metadata attribute by query key, rendered as text.
    ///
    /// Keys: `committer`, `context`, `stage`, `domainId`, `connectorId`,
    /// `instanceId`, `comment`, `revision`, `parent`, `timestamp`.
    pub fn attribute(&self, key: &str) -> Option<String> {
        match key {
            "committer" => Some(self.committer.clone()),
            "context" => self.context.clone(),
            "stage" => Some(self.stage.to_string()),
            "domainId" => self.domain_id.clone(),
            "connectorId" => self.connector_id.clone(),
            "instanceId" => self.instance_id.clone(),
            "comment" => self.comment.clone(),
            "revision" => self.revision.map(|r| r.to_string()),
            "parent" => self.parent.map(|r| r.to_string()),
            "timestamp" => self.timestamp.map(|t| t.to_string()),
            _ => None,
        }
    }

    pub fn meta_info(&self) -> CommitMetaInfo {
        CommitMetaInfo {
            committer: self.committer.clone(),
            timestamp: self.timestamp,
            context: self.context.clone(),
            comment: self.comment.clone(),
            revision: self.revision,
            parent: self.parent,
            domain_id: self.domain_id.clone(),
            connector_id: self.connector_id.clone(),
            instance_id: self.instance_id.clone(),
        }
    }
}

/// Commit metadata without the object payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetaInfo {
    pub committer: String,
    pub timestamp: Option<Timestamp>,
    pub context: Option<String>,
    pub comment: Option<String>,
    pub revision: Option<RevisionId>,
    pub parent: Option<RevisionId>,
    pub domain_id: Option<String>,
    pub connector_id: Option<String>,
    pub instance_id: Option<String>,
}
