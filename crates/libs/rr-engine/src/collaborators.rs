//! Interfaces of the external systems the engine relies on.
//!
//! Runs are owned by a run-management service and scripts by a script/project
//! directory. The engine only reads them, asks for new runs and writes back
//! report URLs.

use std::{future::Future, sync::Arc};

use rr_models::{
    RunId, ScriptId,
    report::ScriptInfo,
    run::{Run, RunCompletion, RunQuery},
};
use tokio::sync::broadcast;

use crate::prelude::*;

/// Run-management collaborator.
pub trait RunManager: Send + Sync {
    /// Request a new run of `script_id`. The run starts out `queued`.
    fn create_run(&self, script_id: ScriptId) -> impl Future<Output = Result<Run>> + Send;

    /// Fetch a run. Unknown runs yield [`Error::RunNotFound`].
    fn get_run(&self, run_id: RunId) -> impl Future<Output = Result<Run>> + Send;

    fn list_runs(&self, query: RunQuery) -> impl Future<Output = Result<Vec<Run>>> + Send;

    /// Record the report URL of a run.
    fn set_report_url(&self, run_id: RunId, url: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// Stream of run completions, when the collaborator publishes them.
    fn subscribe_completions(&self) -> Option<broadcast::Receiver<RunCompletion>> {
        None
    }
}

/// Script/project collaborator, used for display metadata only.
pub trait ScriptDirectory: Send + Sync {
    fn script(&self, script_id: ScriptId) -> impl Future<Output = Result<ScriptInfo>> + Send;
}

impl<T: RunManager> RunManager for Arc<T> {
    fn create_run(&self, script_id: ScriptId) -> impl Future<Output = Result<Run>> + Send {
        T::create_run(self, script_id)
    }

    fn get_run(&self, run_id: RunId) -> impl Future<Output = Result<Run>> + Send {
        T::get_run(self, run_id)
    }

    fn list_runs(&self, query: RunQuery) -> impl Future<Output = Result<Vec<Run>>> + Send {
        T::list_runs(self, query)
    }

    fn set_report_url(
        &self,
        run_id: RunId,
        url: &str,
    ) -> impl Future<Output = Result<()>> + Send {
        T::set_report_url(self, run_id, url)
    }

    fn subscribe_completions(&self) -> Option<broadcast::Receiver<RunCompletion>> {
        T::subscribe_completions(self)
    }
}

impl<T: ScriptDirectory> ScriptDirectory for Arc<T> {
    fn script(&self, script_id: ScriptId) -> impl Future<Output = Result<ScriptInfo>> + Send {
        T::script(self, script_id)
    }
}
