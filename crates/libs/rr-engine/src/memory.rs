//! In-memory collaborators.
//!
//! Stand-ins for the run-management service and the script directory, used by
//! tests and local experiments.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use chrono::Utc;
use rr_models::{
    ProjectId, RunId, ScriptId,
    report::ScriptInfo,
    run::{Run, RunCompletion, RunQuery, RunStatus},
};
use tokio::sync::{Mutex, broadcast};
use tracing::debug;
use uuid::Uuid;

use crate::{
    collaborators::{RunManager, ScriptDirectory},
    prelude::*,
};

/// Run storage kept in memory.
pub struct MemoryRunManager {
    runs: Mutex<Vec<Run>>,
    scripts: Mutex<HashMap<ScriptId, ProjectId>>,
    completions: Option<broadcast::Sender<RunCompletion>>,
    fail_creation: AtomicBool,
}

impl Default for MemoryRunManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRunManager {
    /// Run storage that publishes run completions.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self::with_completions(Some(tx))
    }

    /// Run storage that only supports status polling.
    pub fn without_notifications() -> Self {
        Self::with_completions(None)
    }

    fn with_completions(completions: Option<broadcast::Sender<RunCompletion>>) -> Self {
        Self {
            runs: Mutex::new(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            completions,
            fail_creation: AtomicBool::new(false),
        }
    }

    /// Make `script_id` runnable. New runs of it belong to `project_id`.
    pub async fn register_script(&self, script_id: ScriptId, project_id: ProjectId) {
        self.scripts.lock().await.insert(script_id, project_id);
    }

    /// Store an existing run as is.
    pub async fn insert(&self, run: Run) {
        self.scripts
            .lock()
            .await
            .entry(run.script_id)
            .or_insert(run.project_id);
        self.runs.lock().await.push(run);
    }

    /// Make every following `create_run` call fail.
    pub fn fail_creation(&self, fail: bool) {
        self.fail_creation.store(fail, Ordering::Relaxed);
    }

    /// Move a run to `status`, publishing a completion when it is terminal.
    pub async fn set_status(&self, run_id: RunId, status: RunStatus) -> Result<()> {
        {
            let mut runs = self.runs.lock().await;
            let run = runs
                .iter_mut()
                .find(|run| run.id == run_id)
                .ok_or(Error::RunNotFound(run_id))?;
            run.status = status;
            if status.is_terminal() {
                run.completed_at = Some(Utc::now());
            }
        }
        if status.is_terminal() {
            if let Some(tx) = &self.completions {
                // No subscribers is fine
                let _ = tx.send(RunCompletion { run_id, status });
            }
        }
        Ok(())
    }

    pub async fn runs(&self) -> Vec<Run> {
        self.runs.lock().await.clone()
    }
}

impl RunManager for MemoryRunManager {
    async fn create_run(&self, script_id: ScriptId) -> Result<Run> {
        if self.fail_creation.load(Ordering::Relaxed) {
            return Err(Error::Collaborator(String::from("run creation rejected")));
        }
        let project_id = *self
            .scripts
            .lock()
            .await
            .get(&script_id)
            .ok_or(Error::ScriptNotFound(script_id))?;

        let run = Run {
            id: Uuid::new_v4(),
            script_id,
            project_id,
            status: RunStatus::Queued,
            started_at: Utc::now(),
            completed_at: None,
            report_url: None,
        };
        debug!("Created {run}");
        self.runs.lock().await.push(run.clone());
        Ok(run)
    }

    async fn get_run(&self, run_id: RunId) -> Result<Run> {
        self.runs
            .lock()
            .await
            .iter()
            .find(|run| run.id == run_id)
            .cloned()
            .ok_or(Error::RunNotFound(run_id))
    }

    async fn list_runs(&self, query: RunQuery) -> Result<Vec<Run>> {
        Ok(self
            .runs
            .lock()
            .await
            .iter()
            .filter(|run| query.matches(run))
            .cloned()
            .collect())
    }

    async fn set_report_url(&self, run_id: RunId, url: &str) -> Result<()> {
        let mut runs = self.runs.lock().await;
        let run = runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(Error::RunNotFound(run_id))?;
        run.report_url = Some(String::from(url));
        Ok(())
    }

    fn subscribe_completions(&self) -> Option<broadcast::Receiver<RunCompletion>> {
        self.completions.as_ref().map(|tx| tx.subscribe())
    }
}

/// Script directory kept in memory.
#[derive(Debug, Default)]
pub struct MemoryScriptDirectory {
    scripts: HashMap<ScriptId, ScriptInfo>,
}

impl MemoryScriptDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, info: ScriptInfo) -> Self {
        self.scripts.insert(info.id, info);
        self
    }
}

impl ScriptDirectory for MemoryScriptDirectory {
    async fn script(&self, script_id: ScriptId) -> Result<ScriptInfo> {
        self.scripts
            .get(&script_id)
            .cloned()
            .ok_or(Error::ScriptNotFound(script_id))
    }
}
