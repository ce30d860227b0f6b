//! Bounded wait for a run to finish.
//!
//! The run status is polled on a fixed interval for a fixed number of
//! attempts. When the run-management collaborator publishes completions, a
//! completion of the awaited run ends the wait right away. Reaching the
//! ceiling isn't an error: the caller goes on with whatever status the run has.

use std::time::Duration;

use rr_config::rr_config::RrWaiterConfig;
use rr_models::{
    RunId,
    run::{RunCompletion, RunStatus},
};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::sleep,
};
use tracing::{debug, info, trace, warn};

use crate::collaborators::RunManager;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The run reached a terminal status.
    Finished(RunStatus),
    /// The ceiling was reached. Holds the last status observed, if any.
    TimedOut(Option<RunStatus>),
}

impl WaitOutcome {
    pub fn finished(&self) -> bool {
        matches!(self, WaitOutcome::Finished(_))
    }
}

/// Waits for runs to reach a terminal status.
#[derive(Debug, Clone, Copy)]
pub struct RunWaiter {
    poll_interval: Duration,
    max_attempts: u32,
}

impl Default for RunWaiter {
    fn default() -> Self {
        Self::from_config(&RrWaiterConfig::default())
    }
}

impl RunWaiter {
    pub fn new(poll_interval: Duration, max_attempts: u32) -> Self {
        Self {
            poll_interval,
            max_attempts,
        }
    }

    pub fn from_config(config: &RrWaiterConfig) -> Self {
        Self::new(config.poll_interval(), config.max_attempts)
    }

    /// Longest time a wait can take.
    pub fn ceiling(&self) -> Duration {
        self.poll_interval * self.max_attempts
    }

    /// Wait until `run_id` is terminal or the ceiling is reached.
    pub async fn wait<R: RunManager>(&self, runs: &R, run_id: RunId) -> WaitOutcome {
        // Subscribe before the first poll so no completion falls in between
        let mut completions = runs.subscribe_completions();
        let mut last_status = None;

        for attempt in 1..=self.max_attempts {
            match runs.get_run(run_id).await {
                Ok(run) if run.status.is_terminal() => {
                    debug!("Run {run_id} finished with {} (attempt {attempt})", run.status);
                    return WaitOutcome::Finished(run.status);
                }
                Ok(run) => {
                    trace!("Run {run_id} is {} (attempt {attempt})", run.status);
                    last_status = Some(run.status);
                }
                Err(err) => warn!("Failed to poll run {run_id} (attempt {attempt}) - {err}"),
            }

            if let Some(status) = self.pause(run_id, &mut completions).await {
                debug!("Run {run_id} completion received: {status}");
                return WaitOutcome::Finished(status);
            }
        }

        info!(
            "Run {run_id} not finished after {:?}, continuing with status {:?}",
            self.ceiling(),
            last_status
        );
        WaitOutcome::TimedOut(last_status)
    }

    /// Sleep for one poll interval, returning early on a completion of `run_id`.
    async fn pause(
        &self,
        run_id: RunId,
        completions: &mut Option<broadcast::Receiver<RunCompletion>>,
    ) -> Option<RunStatus> {
        let deadline = sleep(self.poll_interval);
        tokio::pin!(deadline);

        let Some(rx) = completions.as_mut() else {
            deadline.await;
            return None;
        };

        loop {
            tokio::select! {
                _ = &mut deadline => return None,
                event = rx.recv() => match event {
                    Ok(RunCompletion { run_id: id, status }) if id == run_id && status.is_terminal() => {
                        return Some(status);
                    }
                    Ok(_) => {}
                    // The next poll catches up with anything missed
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Completion stream lagged by {skipped} events");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        debug!("Completion stream closed, polling only");
        *completions = None;
        deadline.await;
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rr_models::run::RunStatus;
    use tokio::time::Instant;
    use uuid::Uuid;

    use super::*;
    use crate::memory::MemoryRunManager;

    async fn queued_run(runs: &MemoryRunManager) -> RunId {
        let script_id = Uuid::new_v4();
        runs.register_script(script_id, Uuid::new_v4()).await;
        runs.create_run(script_id).await.expect("run").id
    }

    #[tokio::test(start_paused = true)]
    async fn already_finished_run_returns_immediately() {
        let runs = MemoryRunManager::new();
        let run_id = queued_run(&runs).await;
        runs.set_status(run_id, RunStatus::Completed).await.expect("status");

        let start = Instant::now();
        let outcome = RunWaiter::default().wait(&runs, run_id).await;
        assert_eq!(outcome, WaitOutcome::Finished(RunStatus::Completed));
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_notification_ends_the_wait_early() {
        let runs = Arc::new(MemoryRunManager::new());
        let run_id = queued_run(&runs).await;

        let publisher = runs.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(2500)).await;
            publisher
                .set_status(run_id, RunStatus::Failed)
                .await
                .expect("status");
        });

        let start = Instant::now();
        let outcome = RunWaiter::default().wait(&runs, run_id).await;
        assert_eq!(outcome, WaitOutcome::Finished(RunStatus::Failed));
        // Resolved by the notification, not the poll at 3s
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_detects_completion_without_notifications() {
        let runs = Arc::new(MemoryRunManager::without_notifications());
        let run_id = queued_run(&runs).await;

        let publisher = runs.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(4500)).await;
            publisher
                .set_status(run_id, RunStatus::Passed)
                .await
                .expect("status");
        });

        let start = Instant::now();
        let outcome = RunWaiter::default().wait(&runs, run_id).await;
        assert_eq!(outcome, WaitOutcome::Finished(RunStatus::Passed));
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_run_times_out_at_the_ceiling() {
        let runs = MemoryRunManager::new();
        let run_id = queued_run(&runs).await;
        runs.set_status(run_id, RunStatus::Running).await.expect("status");

        let start = Instant::now();
        let outcome = RunWaiter::default().wait(&runs, run_id).await;
        assert_eq!(outcome, WaitOutcome::TimedOut(Some(RunStatus::Running)));
        assert!(!outcome.finished());
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn other_runs_completions_are_ignored() {
        let runs = Arc::new(MemoryRunManager::new());
        let run_id = queued_run(&runs).await;
        let other = queued_run(&runs).await;

        let publisher = runs.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(500)).await;
            publisher
                .set_status(other, RunStatus::Passed)
                .await
                .expect("status");
        });

        let outcome = RunWaiter::new(Duration::from_secs(1), 3)
            .wait(&runs, run_id)
            .await;
        assert_eq!(outcome, WaitOutcome::TimedOut(Some(RunStatus::Queued)));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_run_times_out_without_status() {
        let runs = MemoryRunManager::new();
        let outcome = RunWaiter::new(Duration::from_secs(1), 2)
            .wait(&runs, Uuid::new_v4())
            .await;
        assert_eq!(outcome, WaitOutcome::TimedOut(None));
    }
}
