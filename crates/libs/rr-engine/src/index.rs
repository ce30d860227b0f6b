//! Per-project ledger of generated reports.
//!
//! Each project owns one ledger: a JSON array of [`ReportIndexEntry`], newest
//! first, with at most one entry per run. Ledger failures never reach the
//! caller; a ledger that can't be parsed is treated as empty and gets replaced
//! by the next successful write.

use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use rr_models::{
    ProjectId,
    report::{ProjectReports, ReportIndexEntry},
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::prelude::*;

const LEDGER_EXTENSION: &str = "json";

/// Storage holding one ledger document per project.
pub trait LedgerStore: Send + Sync {
    /// Raw ledger of a project, `None` if it was never written.
    fn load(
        &self,
        project_id: &ProjectId,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Replace a project's ledger. Readers see either the old or the new content.
    fn store(&self, project_id: &ProjectId, contents: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// Every project that has a ledger.
    fn projects(&self) -> impl Future<Output = Result<Vec<ProjectId>>> + Send;
}

/// Ledgers stored as `<dir>/<project_id>.json`.
#[derive(Debug, Clone)]
pub struct FsLedgerStore {
    dir: PathBuf,
}

impl FsLedgerStore {
    /// Open the store, creating its directory when needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ledger_path(&self, project_id: &ProjectId) -> PathBuf {
        self.dir.join(format!("{project_id}.{LEDGER_EXTENSION}"))
    }
}

impl LedgerStore for FsLedgerStore {
    async fn load(&self, project_id: &ProjectId) -> Result<Option<String>> {
        match fs::read_to_string(self.ledger_path(project_id)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn store(&self, project_id: &ProjectId, contents: &str) -> Result<()> {
        let path = self.ledger_path(project_id);
        // Same directory as the ledger so the rename never crosses filesystems
        let tmp_path = self
            .dir
            .join(format!(".{project_id}.{}.tmp", Uuid::new_v4().simple()));

        let written = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(contents.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &path).await
        }
        .await;
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err.into());
        }
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<ProjectId>> {
        let mut projects = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(LEDGER_EXTENSION) {
                continue;
            }
            let Some(project_id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok())
            else {
                debug!("Ignoring unexpected file {} in index", path.display());
                continue;
            };
            projects.push(project_id);
        }
        projects.sort();
        Ok(projects)
    }
}

/// Ledgers kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    ledgers: Mutex<HashMap<ProjectId, String>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    async fn load(&self, project_id: &ProjectId) -> Result<Option<String>> {
        let ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ledgers.get(project_id).cloned())
    }

    async fn store(&self, project_id: &ProjectId, contents: &str) -> Result<()> {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        ledgers.insert(*project_id, String::from(contents));
        Ok(())
    }

    async fn projects(&self) -> Result<Vec<ProjectId>> {
        let ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut projects: Vec<ProjectId> = ledgers.keys().copied().collect();
        projects.sort();
        Ok(projects)
    }
}

/// Report index over a [`LedgerStore`].
///
/// Appends to the same project are not serialized: two concurrent appends
/// both read the old ledger and the last write wins.
#[derive(Debug)]
pub struct ProjectIndex<S> {
    store: S,
}

impl<S: LedgerStore> ProjectIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn load(&self, project_id: &ProjectId) -> Result<Vec<ReportIndexEntry>> {
        match self.store.load(project_id).await? {
            None => Ok(Vec::new()),
            Some(contents) => serde_json::from_str(&contents).map_err(|source| {
                Error::IndexCorrupt {
                    project_id: *project_id,
                    source,
                }
            }),
        }
    }

    /// Insert or replace `entry` at the front of its project's ledger.
    pub async fn append(&self, project_id: ProjectId, entry: ReportIndexEntry) {
        let mut entries = match self.load(&project_id).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("{err}. Starting from an empty ledger");
                Vec::new()
            }
        };
        entries.retain(|existing| existing.id != entry.id);
        let run_id = entry.id;
        entries.insert(0, entry);

        let written = match serde_json::to_string_pretty(&entries) {
            Ok(contents) => self.store.store(&project_id, &contents).await,
            Err(err) => Err(err.into()),
        };
        match written {
            Ok(()) => debug!(
                "Indexed report of run {run_id} in project {project_id} ({} entries)",
                entries.len()
            ),
            Err(err) => error!("Failed to write report index of project {project_id} - {err}"),
        }
    }

    /// Ledger of a project, newest first. Empty when missing or unreadable.
    pub async fn read(&self, project_id: &ProjectId) -> Vec<ReportIndexEntry> {
        self.load(project_id).await.unwrap_or_else(|err| {
            warn!("Failed to read report index of project {project_id} - {err}");
            Vec::new()
        })
    }

    /// Ledgers of every project.
    pub async fn list_all(&self) -> Vec<ProjectReports> {
        let projects = match self.store.projects().await {
            Ok(projects) => projects,
            Err(err) => {
                warn!("Failed to enumerate report indexes - {err}");
                return Vec::new();
            }
        };
        let mut all = Vec::with_capacity(projects.len());
        for project_id in projects {
            all.push(ProjectReports {
                entries: self.read(&project_id).await,
                project_id,
            });
        }
        all
    }
}
