//! The registry of open stages.
//!
//! [`StageManager`] owns every stage's [`CommitLog`] behind a `RwLock`ed map.
//! Lookups take the read lock and hand out an `Arc<StageHandle>`, so work on
//! one stage never holds the registry lock. Creating a stage takes the write
//! lock for the duration of the journal and manifest writes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::info;

use edb_ledger::{CommitLog, LogContext};
use edb_types::{Stage, StageId};

use crate::error::{StageError, StageResult};
use crate::manifest::{self, MANIFEST_FILE};
use crate::names::validate_stage_id;

/// Creator recorded for the root stage.
const SYSTEM_CREATOR: &str = "system";

/// One open stage: its descriptor and its commit log.
#[derive(Debug)]
pub struct StageHandle {
    meta: Stage,
    log: CommitLog,
}

impl StageHandle {
    pub fn stage(&self) -> &Stage {
        &self.meta
    }

    pub fn id(&self) -> &StageId {
        &self.meta.id
    }

    pub fn log(&self) -> &CommitLog {
        &self.log
    }
}

/// Registry of the stages of one database.
pub struct StageManager {
    stages: RwLock<BTreeMap<StageId, Arc<StageHandle>>>,
    context: LogContext,
    data_dir: Option<PathBuf>,
}

impl StageManager {
    /// A manager whose stages live in memory only. The root stage is created
    /// immediately.
    pub fn in_memory(context: LogContext) -> Self {
        let root = Stage::new(StageId::root(), SYSTEM_CREATOR, context.clock.now_millis());
        let handle = StageHandle {
            log: CommitLog::in_memory(root.id.clone(), context.clone()),
            meta: root,
        };
        let mut stages = BTreeMap::new();
        stages.insert(StageId::root(), Arc::new(handle));
        Self {
            stages: RwLock::new(stages),
            context,
            data_dir: None,
        }
    }

    /// Open (or initialize) the database under `data_dir`, replaying every
    /// stage journal listed in the manifest.
    pub fn open(data_dir: &Path, context: LogContext) -> StageResult<Self> {
        let manifest_path = data_dir.join(MANIFEST_FILE);
        let mut listed = manifest::load(&manifest_path)?;
        if !listed.iter().any(|s| s.id.is_root()) {
            listed.insert(
                0,
                Stage::new(StageId::root(), SYSTEM_CREATOR, context.clock.now_millis()),
            );
            manifest::save(&manifest_path, &listed)?;
        }

        let mut stages = BTreeMap::new();
        for meta in listed {
            validate_stage_id(meta.id.as_str())?;
            let log = CommitLog::open(meta.id.clone(), &journal_path(data_dir, &meta.id), context.clone())?;
            stages.insert(meta.id.clone(), Arc::new(StageHandle { meta, log }));
        }
        info!(data_dir = %data_dir.display(), stages = stages.len(), "database opened");

        Ok(Self {
            stages: RwLock::new(stages),
            context,
            data_dir: Some(data_dir.to_path_buf()),
        })
    }

    /// Create a new, empty stage.
    pub fn create_stage(&self, id: StageId, creator: &str) -> StageResult<Stage> {
        validate_stage_id(id.as_str())?;
        let mut stages = self
            .stages
            .write()
            .map_err(|e| StageError::LockPoisoned(e.to_string()))?;
        if stages.contains_key(&id) {
            return Err(StageError::AlreadyExists(id));
        }

        let meta = Stage::new(id.clone(), creator, self.context.clock.now_millis());
        let log = match &self.data_dir {
            Some(dir) => {
                let log = CommitLog::open(id.clone(), &journal_path(dir, &id), self.context.clone())?;
                let mut listed: Vec<Stage> = stages.values().map(|h| h.meta.clone()).collect();
                listed.push(meta.clone());
                manifest::save(&dir.join(MANIFEST_FILE), &listed)?;
                log
            }
            None => CommitLog::in_memory(id.clone(), self.context.clone()),
        };

        stages.insert(
            id.clone(),
            Arc::new(StageHandle {
                meta: meta.clone(),
                log,
            }),
        );
        info!(stage = %id, creator, "stage created");
        Ok(meta)
    }

    /// The stage named `id`.
    pub fn get(&self, id: &StageId) -> StageResult<Arc<StageHandle>> {
        self.find(id)?.ok_or_else(|| StageError::NotFound(id.clone()))
    }

    /// The stage named `id`, or root when `id` is `None`.
    pub fn resolve(&self, id: Option<&StageId>) -> StageResult<Arc<StageHandle>> {
        match id {
            Some(id) => self.get(id),
            None => self.get(&StageId::root()),
        }
    }

    /// Like [`resolve`](Self::resolve), but an unknown stage is `Ok(None)`.
    pub fn try_resolve(&self, id: Option<&StageId>) -> StageResult<Option<Arc<StageHandle>>> {
        match id {
            Some(id) => self.find(id),
            None => self.find(&StageId::root()),
        }
    }

    pub fn root(&self) -> StageResult<Arc<StageHandle>> {
        self.resolve(None)
    }

    pub fn contains(&self, id: &StageId) -> StageResult<bool> {
        Ok(self.find(id)?.is_some())
    }

    /// Every stage, sorted by id.
    pub fn stages(&self) -> StageResult<Vec<Stage>> {
        let stages = self
            .stages
            .read()
            .map_err(|e| StageError::LockPoisoned(e.to_string()))?;
        Ok(stages.values().map(|h| h.meta.clone()).collect())
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    fn find(&self, id: &StageId) -> StageResult<Option<Arc<StageHandle>>> {
        let stages = self
            .stages
            .read()
            .map_err(|e| StageError::LockPoisoned(e.to_string()))?;
        Ok(stages.get(id).cloned())
    }
}

/// `<data_dir>/stages/<stage>.journal`
pub fn journal_path(data_dir: &Path, id: &StageId) -> PathBuf {
    data_dir.join("stages").join(format!("{}.journal", id.as_str()))
}

impl std::fmt::Debug for StageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageManager")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}
