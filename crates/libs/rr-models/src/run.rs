//! Run types owned by the run-management collaborator.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ProjectId, RunId, ScriptId, prelude::*};

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created but not started yet.
    Queued,
    /// Currently executing.
    Running,
    /// Finished and every check passed.
    Passed,
    /// Finished with failures.
    Failed,
    /// Finished without a pass/fail verdict.
    Completed,
}

impl RunStatus {
    /// Whether the run has reached a final state.
    ///
    /// ```rust
    /// use rr_models::run::RunStatus;
    ///
    /// assert!(RunStatus::Failed.is_terminal());
    /// assert!(!RunStatus::Running.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Passed | RunStatus::Failed | RunStatus::Completed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "queued" => Ok(RunStatus::Queued),
            "running" => Ok(RunStatus::Running),
            "passed" => Ok(RunStatus::Passed),
            "failed" => Ok(RunStatus::Failed),
            "completed" => Ok(RunStatus::Completed),
            other => Err(Error::InvalidRunStatus(String::from(other))),
        }
    }
}

/// One recorded execution of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Unique run identifier.
    pub id: RunId,
    /// Script this run executed.
    pub script_id: ScriptId,
    /// Project owning the script.
    pub project_id: ProjectId,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// When the run started (or was queued).
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// URL of the generated report, if any was written back.
    pub report_url: Option<String>,
}

impl Run {
    /// Whether a report URL has been written back for this run.
    pub fn has_report(&self) -> bool {
        self.report_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = if self.has_report() {
            "with report"
        } else {
            "without report"
        };
        write!(
            f,
            "Run {} ({}) - Script: {} Project: {} {}",
            self.id, self.status, self.script_id, self.project_id, report
        )
    }
}

/// Filter used when listing runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunQuery {
    /// Only runs of this script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_id: Option<ScriptId>,
    /// Only runs of this project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl RunQuery {
    pub fn for_script(script_id: ScriptId, project_id: Option<ProjectId>) -> Self {
        Self {
            script_id: Some(script_id),
            project_id,
        }
    }

    pub fn for_project(project_id: Option<ProjectId>) -> Self {
        Self {
            script_id: None,
            project_id,
        }
    }

    pub fn matches(&self, run: &Run) -> bool {
        self.script_id.is_none_or(|id| id == run.script_id)
            && self.project_id.is_none_or(|id| id == run.project_id)
    }
}

/// Published by the run-management collaborator when a run reaches a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCompletion {
    /// Run that completed.
    pub run_id: RunId,
    /// Terminal status it reached.
    pub status: RunStatus,
}
