//! Report types exposed to callers.

use std::{fmt, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ProjectId, RunId, ScriptId,
    run::{Run, RunStatus},
};

/// Metadata of one generated report, stored in its project's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIndexEntry {
    /// Run identifier. Unique within a project ledger.
    pub id: RunId,
    pub project_id: ProjectId,
    pub script_id: ScriptId,
    pub script_name: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub report_url: String,
    /// When the report was generated.
    pub created_at: DateTime<Utc>,
}

impl ReportIndexEntry {
    /// Build an entry describing `run`'s report.
    pub fn from_run(
        run: &Run,
        script_name: impl Into<String>,
        report_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: run.id,
            project_id: run.project_id,
            script_id: run.script_id,
            script_name: script_name.into(),
            status: run.status,
            started_at: run.started_at,
            completed_at: run.completed_at,
            report_url: report_url.into(),
            created_at,
        }
    }
}

/// Every ledger entry of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReports {
    pub project_id: ProjectId,
    pub entries: Vec<ReportIndexEntry>,
}

/// Location of a generated report artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedReport {
    /// Path of the artifact's entry resource on disk.
    pub report_path: PathBuf,
    /// Public URL of the entry resource.
    pub report_url: String,
}

/// Result of a report request for a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScriptReport {
    /// The latest run already had a report; nothing was generated.
    Cached { run_id: RunId, report_url: String },
    /// A report was generated for an existing or freshly created run.
    Generated {
        run_id: RunId,
        /// Whether the run was created by this request.
        created_run: bool,
        /// Whether a created run reached a terminal status before generation.
        run_finished: bool,
        report: GeneratedReport,
    },
}

impl ScriptReport {
    pub fn run_id(&self) -> RunId {
        match self {
            ScriptReport::Cached { run_id, .. } | ScriptReport::Generated { run_id, .. } => *run_id,
        }
    }

    pub fn report_url(&self) -> &str {
        match self {
            ScriptReport::Cached { report_url, .. } => report_url,
            ScriptReport::Generated { report, .. } => &report.report_url,
        }
    }
}

impl fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptReport::Cached { run_id, report_url } => {
                write!(f, "Existing report for run {run_id}: {report_url}")
            }
            ScriptReport::Generated {
                run_id,
                created_run,
                run_finished,
                report,
            } => {
                let origin = if *created_run { "new" } else { "existing" };
                write!(
                    f,
                    "Generated report for {origin} run {run_id}: {}",
                    report.report_url
                )?;
                if *created_run && !run_finished {
                    write!(f, " (run still in progress when the report was built)")?;
                }
                Ok(())
            }
        }
    }
}

/// Display metadata of a script, resolved through the script directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptInfo {
    pub id: ScriptId,
    pub name: String,
    pub project_id: ProjectId,
}

/// Report URL of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportUrl {
    pub report_url: String,
}

/// Optional project scope of a report query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

/// Body of a retention cleanup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub days_to_keep: u32,
}

/// Body of a retention cleanup response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupResponse {
    /// Number of artifact directories removed.
    pub removed: usize,
}
