use edb_types::{Commit, EdbObject, Oid, RevisionId, StageId};

/// Fluent construction of a pending commit.
///
/// Pass the finished builder to [`Edb::build_commit`](crate::Edb::build_commit),
/// which fills in the target stage's current head as the parent.
#[derive(Clone, Debug)]
pub struct CommitBuilder {
    committer: String,
    stage: StageId,
    context: Option<String>,
    domain_id: Option<String>,
    connector_id: Option<String>,
    instance_id: Option<String>,
    comment: Option<String>,
    inserts: Vec<EdbObject>,
    updates: Vec<EdbObject>,
    deletions: Vec<Oid>,
}

impl CommitBuilder {
    /// A builder targeting the root stage.
    pub fn new(committer: impl Into<String>) -> Self {
        Self {
            committer: committer.into(),
            stage: StageId::root(),
            context: None,
            domain_id: None,
            connector_id: None,
            instance_id: None,
            comment: None,
            inserts: Vec::new(),
            updates: Vec::new(),
            deletions: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: impl Into<StageId>) -> Self {
        self.stage = stage.into();
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn domain(mut self, domain_id: impl Into<String>) -> Self {
        self.domain_id = Some(domain_id.into());
        self
    }

    pub fn connector(mut self, connector_id: impl Into<String>) -> Self {
        self.connector_id = Some(connector_id.into());
        self
    }

    pub fn instance(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn insert(mut self, object: EdbObject) -> Self {
        self.inserts.push(object);
        self
    }

    pub fn update(mut self, object: EdbObject) -> Self {
        self.updates.push(object);
        self
    }

    pub fn delete(mut self, oid: impl Into<Oid>) -> Self {
        self.deletions.push(oid.into());
        self
    }

    pub fn target_stage(&self) -> &StageId {
        &self.stage
    }

    /// The pending commit, expecting `parent` as the stage head.
    pub fn build(self, parent: Option<RevisionId>) -> Commit {
        let mut commit = Commit::new(self.committer, self.stage, parent);
        commit.context = self.context;
        commit.domain_id = self.domain_id;
        commit.connector_id = self.connector_id;
        commit.instance_id = self.instance_id;
        commit.comment = self.comment;
        commit.inserts = self.inserts;
        commit.updates = self.updates;
        commit.deletions = self.deletions;
        commit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_metadata_and_operations() {
        let parent = RevisionId::new();
        let commit = CommitBuilder::new("alice")
            .stage("dev")
            .context("ctx")
            .domain("scm")
            .connector("git")
            .instance("git-1")
            .comment("initial import")
            .insert(EdbObject::new("A"))
            .update(EdbObject::new("B"))
            .delete("C")
            .build(Some(parent));

        assert_eq!(commit.committer, "alice");
        assert_eq!(commit.stage.as_str(), "dev");
        assert_eq!(commit.parent, Some(parent));
        assert_eq!(commit.attribute("connectorId").as_deref(), Some("git"));
        assert_eq!(commit.comment.as_deref(), Some("initial import"));
        assert_eq!(commit.touched_oids().count(), 3);
        assert!(!commit.is_committed());
    }

    #[test]
    fn defaults_to_root_stage() {
        let builder = CommitBuilder::new("alice");
        assert!(builder.target_stage().is_root());
        assert!(builder.build(None).is_empty());
    }
}
