//! Report engine facade.
//!
//! Ties the selector, the waiter, the generator and the project index together
//! behind the operations exposed to callers.

use chrono::Utc;
use rr_config::RrConfig;
use rr_models::{
    ProjectId, RunId, ScriptId,
    report::{GeneratedReport, ReportIndexEntry, ScriptReport},
    run::{Run, RunQuery},
};
use tracing::{debug, info, warn};

use crate::{
    catalog::ReportCatalog,
    collaborators::{RunManager, ScriptDirectory},
    generator::ReportGenerator,
    index::{LedgerStore, ProjectIndex},
    prelude::*,
    retention,
    selector::{Selection, select_target},
    waiter::RunWaiter,
};

/// Report generation and indexing for script runs.
///
/// # Examples
///
/// ```rust,no_run
/// use rr_config::RrConfig;
/// use rr_engine::{
///     engine::ReportEngine,
///     index::FsLedgerStore,
///     memory::{MemoryRunManager, MemoryScriptDirectory},
/// };
///
/// # async fn example() -> rr_engine::prelude::Result<()> {
/// let config = RrConfig::default();
/// let store = FsLedgerStore::open(&config.storage.index_dir)?;
/// let engine = ReportEngine::from_config(
///     &config,
///     MemoryRunManager::new(),
///     MemoryScriptDirectory::new(),
///     store,
/// );
/// let reports = engine.list_reports(None).await?;
/// println!("{} reports", reports.len());
/// # Ok(())
/// # }
/// ```
pub struct ReportEngine<R, D, S> {
    runs: R,
    scripts: D,
    generator: ReportGenerator,
    waiter: RunWaiter,
    index: ProjectIndex<S>,
}

impl<R, D, S> ReportEngine<R, D, S>
where
    R: RunManager,
    D: ScriptDirectory,
    S: LedgerStore,
{
    pub fn new(
        runs: R,
        scripts: D,
        generator: ReportGenerator,
        waiter: RunWaiter,
        index: ProjectIndex<S>,
    ) -> Self {
        Self {
            runs,
            scripts,
            generator,
            waiter,
            index,
        }
    }

    pub fn from_config(config: &RrConfig, runs: R, scripts: D, store: S) -> Self {
        Self::new(
            runs,
            scripts,
            ReportGenerator::from_config(&config.storage, &config.tool, &config.server.public_url),
            RunWaiter::from_config(&config.waiter),
            ProjectIndex::new(store),
        )
    }

    pub fn runs(&self) -> &R {
        &self.runs
    }

    pub fn generator(&self) -> &ReportGenerator {
        &self.generator
    }

    pub fn index(&self) -> &ProjectIndex<S> {
        &self.index
    }

    /// Report of a script's latest run, running the script when it never ran.
    pub async fn report_for_script(
        &self,
        script_id: ScriptId,
        project_id: Option<ProjectId>,
    ) -> Result<ScriptReport> {
        let runs = self
            .runs
            .list_runs(RunQuery::for_script(script_id, project_id))
            .await?;
        debug!("Script {script_id} has {} run(s)", runs.len());

        match select_target(runs) {
            Selection::Cached { run, report_url } => {
                info!("Reusing report of run {} for script {script_id}", run.id);
                Ok(ScriptReport::Cached {
                    run_id: run.id,
                    report_url,
                })
            }
            Selection::Existing(run) => {
                info!("Building report of existing run {} for script {script_id}", run.id);
                let report = self.build_report(&run).await?;
                Ok(ScriptReport::Generated {
                    run_id: run.id,
                    created_run: false,
                    run_finished: run.status.is_terminal(),
                    report,
                })
            }
            Selection::CreateNew => {
                let run = self.runs.create_run(script_id).await?;
                info!("Script {script_id} never ran, created run {}", run.id);

                let outcome = self.waiter.wait(&self.runs, run.id).await;
                let run = match self.runs.get_run(run.id).await {
                    Ok(refreshed) => refreshed,
                    Err(err) => {
                        warn!("Failed to refresh run {} - {err}", run.id);
                        run
                    }
                };
                // The run may finish between the last poll and the refresh
                let run_finished = outcome.finished() || run.status.is_terminal();
                let report = self.build_report(&run).await?;
                Ok(ScriptReport::Generated {
                    run_id: run.id,
                    created_run: true,
                    run_finished,
                    report,
                })
            }
        }
    }

    /// Generate (or regenerate) the report of a run.
    pub async fn generate_report(&self, run_id: RunId) -> Result<GeneratedReport> {
        let run = self.runs.get_run(run_id).await?;
        self.build_report(&run).await
    }

    async fn build_report(&self, run: &Run) -> Result<GeneratedReport> {
        let report = self.generator.generate(run.id).await?;

        if let Err(err) = self.runs.set_report_url(run.id, &report.report_url).await {
            warn!("Failed to record report URL of run {} - {err}", run.id);
        }

        let script_name = match self.scripts.script(run.script_id).await {
            Ok(script) => script.name,
            Err(err) => {
                warn!("Couldn't resolve name of script {} - {err}", run.script_id);
                run.script_id.to_string()
            }
        };
        let entry = ReportIndexEntry::from_run(run, script_name, &report.report_url, Utc::now());
        self.index.append(run.project_id, entry).await;

        Ok(report)
    }

    /// URL of a run's report, empty when it has none.
    pub fn report_url(&self, run_id: &RunId) -> String {
        self.generator.report_url(run_id)
    }

    /// URL of a run's report, [`Error::ReportNotFound`] when it has none.
    pub fn require_report_url(&self, run_id: &RunId) -> Result<String> {
        let url = self.report_url(run_id);
        if url.is_empty() {
            return Err(Error::ReportNotFound(*run_id));
        }
        Ok(url)
    }

    /// Reports of a project, or of every project.
    pub async fn list_reports(&self, project_id: Option<ProjectId>) -> Result<Vec<ReportIndexEntry>> {
        ReportCatalog::new(&self.index, &self.runs, &self.scripts, &self.generator)
            .list(project_id)
            .await
    }

    /// Remove artifacts older than `days_to_keep` days. Returns how many were removed.
    pub async fn cleanup(&self, days_to_keep: u32) -> Result<usize> {
        let reports_dir = self.generator.reports_dir().to_path_buf();
        tokio::task::spawn_blocking(move || retention::cleanup_artifacts(&reports_dir, days_to_keep))
            .await?
    }
}
