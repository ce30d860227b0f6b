//! Periodic artifact cleanup.

use std::{sync::Arc, time::Duration};

use rr_config::rr_config::RrRetentionConfig;
use rr_engine::{
    collaborators::{RunManager, ScriptDirectory},
    engine::ReportEngine,
    index::LedgerStore,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info};

/// Start the cleanup task, if a retention window is configured.
pub fn setup_retention<R, D, S>(
    engine: Arc<ReportEngine<R, D, S>>,
    config: &RrRetentionConfig,
) -> Option<JoinHandle<()>>
where
    R: RunManager + 'static,
    D: ScriptDirectory + 'static,
    S: LedgerStore + 'static,
{
    let days_to_keep = config.days_to_keep?;
    let period = Duration::from_secs(config.interval_secs.max(1));
    info!("Removing reports older than {days_to_keep} days every {period:?}");

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match engine.cleanup(days_to_keep).await {
                Ok(removed) => info!("Periodic cleanup removed {removed} report(s)"),
                Err(err) => error!("Periodic cleanup failed - {err}"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File, FileTimes};
    use std::time::SystemTime;

    use rr_engine::{
        generator::{ReportGenerator, ReportTool},
        index::{MemoryLedgerStore, ProjectIndex},
        memory::{MemoryRunManager, MemoryScriptDirectory},
        waiter::RunWaiter,
    };

    use super::*;

    fn engine(
        reports_dir: &std::path::Path,
    ) -> Arc<ReportEngine<MemoryRunManager, MemoryScriptDirectory, MemoryLedgerStore>> {
        Arc::new(ReportEngine::new(
            MemoryRunManager::new(),
            MemoryScriptDirectory::new(),
            ReportGenerator::new(
                reports_dir.join("results"),
                reports_dir,
                "/reports",
                ReportTool::new("true", Vec::<String>::new(), "index.html"),
            ),
            RunWaiter::default(),
            ProjectIndex::new(MemoryLedgerStore::new()),
        ))
    }

    #[tokio::test]
    async fn disabled_without_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(setup_retention(engine(dir.path()), &RrRetentionConfig::default()).is_none());
    }

    #[tokio::test]
    async fn first_tick_removes_expired_reports() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let expired = dir.path().join("expired");
        fs::create_dir(&expired)?;
        let modified = SystemTime::now() - Duration::from_secs(10 * 24 * 60 * 60);
        File::open(&expired)?.set_times(FileTimes::new().set_modified(modified))?;

        let config = RrRetentionConfig {
            days_to_keep: Some(7),
            interval_secs: 3600,
        };
        let handle = setup_retention(engine(dir.path()), &config).expect("task");
        for _ in 0..100 {
            if !expired.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();
        assert!(!expired.exists());
        Ok(())
    }
}
