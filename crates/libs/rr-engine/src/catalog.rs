//! Read path over generated reports.
//!
//! The project index answers most queries. When it has nothing for the query
//! (fresh index directory, lost ledgers) the list is rebuilt from run storage
//! and the artifacts present on disk.

use std::collections::HashMap;

use rr_models::{
    ProjectId, ScriptId,
    report::ReportIndexEntry,
    run::{Run, RunQuery},
};
use tracing::{debug, warn};

use crate::{
    collaborators::{RunManager, ScriptDirectory},
    generator::ReportGenerator,
    index::{LedgerStore, ProjectIndex},
    prelude::*,
};

pub struct ReportCatalog<'a, R, D, S> {
    index: &'a ProjectIndex<S>,
    runs: &'a R,
    scripts: &'a D,
    generator: &'a ReportGenerator,
}

impl<'a, R, D, S> ReportCatalog<'a, R, D, S>
where
    R: RunManager,
    D: ScriptDirectory,
    S: LedgerStore,
{
    pub fn new(
        index: &'a ProjectIndex<S>,
        runs: &'a R,
        scripts: &'a D,
        generator: &'a ReportGenerator,
    ) -> Self {
        Self {
            index,
            runs,
            scripts,
            generator,
        }
    }

    /// Reports of a project, or of every project when `project_id` is `None`.
    pub async fn list(&self, project_id: Option<ProjectId>) -> Result<Vec<ReportIndexEntry>> {
        let indexed = self.list_indexed(project_id).await;
        if !indexed.is_empty() {
            return Ok(indexed);
        }
        debug!("No indexed reports for {project_id:?}, rebuilding from run storage");
        self.list_from_runs(project_id).await
    }

    async fn list_indexed(&self, project_id: Option<ProjectId>) -> Vec<ReportIndexEntry> {
        match project_id {
            Some(project_id) => self.index.read(&project_id).await,
            None => {
                let mut entries: Vec<ReportIndexEntry> = self
                    .index
                    .list_all()
                    .await
                    .into_iter()
                    .flat_map(|project| project.entries)
                    .collect();
                entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                entries
            }
        }
    }

    async fn list_from_runs(&self, project_id: Option<ProjectId>) -> Result<Vec<ReportIndexEntry>> {
        let runs = self.runs.list_runs(RunQuery::for_project(project_id)).await?;

        let mut names: HashMap<ScriptId, String> = HashMap::new();
        let mut entries = Vec::new();
        for run in runs {
            let report_url = self.generator.report_url(&run.id);
            if report_url.is_empty() {
                continue;
            }
            let script_name = match names.get(&run.script_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self.script_name(&run).await;
                    names.insert(run.script_id, name.clone());
                    name
                }
            };
            let created_at = run.completed_at.unwrap_or(run.started_at);
            entries.push(ReportIndexEntry::from_run(
                &run,
                script_name,
                report_url,
                created_at,
            ));
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn script_name(&self, run: &Run) -> String {
        match self.scripts.script(run.script_id).await {
            Ok(script) => script.name,
            Err(err) => {
                warn!("Couldn't resolve name of script {} - {err}", run.script_id);
                run.script_id.to_string()
            }
        }
    }
}
