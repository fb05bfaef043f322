//! Commit hooks.
//!
//! Hooks observe every commit submitted to a stage. `on_begin` and
//! `on_pre_commit` may reject the commit; `on_post_commit` and `on_error`
//! are notifications only. Hooks run in registration order and the first
//! rejection stops the pipeline.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use edb_types::Commit;

use crate::error::{LedgerError, LedgerResult};

/// The outcome of a rejecting hook phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookDecision {
    Continue,
    Reject { reason: String },
}

impl HookDecision {
    pub fn reject(reason: impl Into<String>) -> Self {
        Self::Reject {
            reason: reason.into(),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// A participant in the commit lifecycle.
pub trait CommitHook: Send + Sync {
    /// Name reported when this hook rejects a commit.
    fn name(&self) -> &str;

    /// Before any validation, with the commit as submitted.
    fn on_begin(&self, _commit: &Commit) -> HookDecision {
        HookDecision::Continue
    }

    /// After validation succeeded, before anything is written.
    fn on_pre_commit(&self, _commit: &Commit) -> HookDecision {
        HookDecision::Continue
    }

    /// After the commit was applied, with the frozen commit.
    fn on_post_commit(&self, _commit: &Commit) {}

    /// After the commit failed at any point.
    fn on_error(&self, _commit: &Commit, _error: &LedgerError) {}
}

/// An ordered list of commit hooks.
#[derive(Clone, Default)]
pub struct HookPipeline {
    hooks: Vec<Arc<dyn CommitHook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: Arc<dyn CommitHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn add(&mut self, hook: Arc<dyn CommitHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn begin(&self, commit: &Commit) -> LedgerResult<()> {
        self.decide(commit, "begin", |hook, c| hook.on_begin(c))
    }

    pub fn pre_commit(&self, commit: &Commit) -> LedgerResult<()> {
        self.decide(commit, "pre_commit", |hook, c| hook.on_pre_commit(c))
    }

    pub fn post_commit(&self, commit: &Commit) {
        for hook in &self.hooks {
            hook.on_post_commit(commit);
        }
    }

    pub fn error(&self, commit: &Commit, error: &LedgerError) {
        for hook in &self.hooks {
            hook.on_error(commit, error);
        }
    }

    fn decide(
        &self,
        commit: &Commit,
        phase: &str,
        run: impl Fn(&dyn CommitHook, &Commit) -> HookDecision,
    ) -> LedgerResult<()> {
        for hook in &self.hooks {
            if let HookDecision::Reject { reason } = run(hook.as_ref(), commit) {
                debug!(hook = hook.name(), phase, %reason, "commit rejected by hook");
                return Err(LedgerError::HookRejected {
                    hook: hook.name().to_string(),
                    reason,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}
