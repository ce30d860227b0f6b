//! Engine error types.

use std::{io, path::PathBuf};

use rr_models::{ProjectId, RunId, ScriptId};

/// Report engine errors.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The run-management collaborator doesn't know this run.
    #[error("Run {0} not found")]
    RunNotFound(RunId),

    /// The script directory doesn't know this script.
    #[error("Script {0} not found")]
    ScriptNotFound(ScriptId),

    /// No report artifact exists for this run.
    #[error("Report for run {0} not found")]
    ReportNotFound(RunId),

    /// The report-building tool couldn't produce a report.
    #[error("Report tool unavailable: {0}")]
    ToolUnavailable(String),

    /// The report artifact couldn't be written.
    #[error("Failed to write report artifact {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A project ledger couldn't be parsed.
    #[error("Report index of project {project_id} is corrupt: {source}")]
    IndexCorrupt {
        project_id: ProjectId,
        #[source]
        source: serde_json::Error,
    },

    /// An external collaborator failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error(transparent)]
    IO(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn persistence(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Error::Persistence { path, source }
    }

    /// Whether the error means a requested resource doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::RunNotFound(_) | Error::ScriptNotFound(_) | Error::ReportNotFound(_)
        )
    }
}
