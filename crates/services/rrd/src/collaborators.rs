//! HTTP clients of the run-management and script directory services.

use rr_engine::{
    collaborators::{RunManager, ScriptDirectory},
    error::Error as EngineError,
    prelude::Result as EngineResult,
};
use rr_models::{
    RunId, ScriptId,
    report::{ReportUrl, ScriptInfo},
    run::{Run, RunQuery},
};
use rr_requests::ApiClient;
use serde_json::json;
use tracing::debug;

use crate::prelude::*;

fn collaborator_error(err: rr_requests::Error) -> EngineError {
    EngineError::Collaborator(err.to_string())
}

/// `not_found` when the service answered 404, a collaborator failure otherwise.
fn map_error(err: rr_requests::Error, not_found: EngineError) -> EngineError {
    if err.is_not_found() {
        not_found
    } else {
        collaborator_error(err)
    }
}

/// Run-management service reached over HTTP.
///
/// It doesn't publish completions, so waits rely on polling alone.
#[derive(Debug, Clone)]
pub struct HttpRunManager {
    client: ApiClient,
}

impl HttpRunManager {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(url)?,
        })
    }
}

impl RunManager for HttpRunManager {
    async fn create_run(&self, script_id: ScriptId) -> EngineResult<Run> {
        let endpoint = format!("scripts/{script_id}/runs");
        self.client
            .post(&endpoint, &json!({}))
            .await
            .map_err(|err| map_error(err, EngineError::ScriptNotFound(script_id)))
    }

    async fn get_run(&self, run_id: RunId) -> EngineResult<Run> {
        self.client
            .get(&format!("runs/{run_id}"))
            .await
            .map_err(|err| map_error(err, EngineError::RunNotFound(run_id)))
    }

    async fn list_runs(&self, query: RunQuery) -> EngineResult<Vec<Run>> {
        let runs: Vec<Run> = self
            .client
            .get_with_params("runs", &query)
            .await
            .map_err(collaborator_error)?;
        debug!("Run management returned {} run(s) for {query:?}", runs.len());
        Ok(runs)
    }

    async fn set_report_url(&self, run_id: RunId, url: &str) -> EngineResult<()> {
        let body = ReportUrl {
            report_url: String::from(url),
        };
        self.client
            .put(&format!("runs/{run_id}/report_url"), &body)
            .await
            .map_err(|err| map_error(err, EngineError::RunNotFound(run_id)))
    }
}

/// Script directory reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScriptDirectory {
    client: ApiClient,
}

impl HttpScriptDirectory {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(url)?,
        })
    }
}

impl ScriptDirectory for HttpScriptDirectory {
    async fn script(&self, script_id: ScriptId) -> EngineResult<ScriptInfo> {
        self.client
            .get(&format!("scripts/{script_id}"))
            .await
            .map_err(|err| map_error(err, EngineError::ScriptNotFound(script_id)))
    }
}
