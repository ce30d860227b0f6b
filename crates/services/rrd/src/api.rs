use std::{net::SocketAddr, path::Path as FsPath, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use rr_engine::{
    collaborators::{RunManager, ScriptDirectory},
    engine::ReportEngine,
    index::LedgerStore,
};
use rr_models::{
    RunId, ScriptId,
    report::{
        CleanupRequest, CleanupResponse, GeneratedReport, ProjectFilter, ReportIndexEntry,
        ReportUrl, ScriptReport,
    },
};
use tokio::task::JoinHandle;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::prelude::*;

type Engine<R, D, S> = Arc<ReportEngine<R, D, S>>;

fn v1(path: &str) -> String {
    format!("/v1/{path}")
}

/// Routes of the daemon. Artifacts under `reports_dir` are served at `/reports`.
pub fn router<R, D, S>(engine: Engine<R, D, S>, reports_dir: &FsPath) -> Router
where
    R: RunManager + 'static,
    D: ScriptDirectory + 'static,
    S: LedgerStore + 'static,
{
    Router::new()
        .route(
            &v1("scripts/{script_id}/report"),
            post(script_report::<R, D, S>),
        )
        .route(
            &v1("runs/{run_id}/report"),
            post(generate_report::<R, D, S>).get(report_url::<R, D, S>),
        )
        .route(&v1("reports"), get(list_reports::<R, D, S>))
        .route(&v1("reports/cleanup"), post(cleanup::<R, D, S>))
        .nest_service("/reports", ServeDir::new(reports_dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

pub async fn setup_api<R, D, S>(
    engine: Engine<R, D, S>,
    bind: SocketAddr,
) -> Result<JoinHandle<Result<()>>>
where
    R: RunManager + 'static,
    D: ScriptDirectory + 'static,
    S: LedgerStore + 'static,
{
    let reports_dir = engine.generator().reports_dir().to_path_buf();
    let app = router(engine, &reports_dir);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::debug!("listening on {}", listener.local_addr()?);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await?;
        Ok(())
    });

    Ok(handle)
}

async fn script_report<R, D, S>(
    State(engine): State<Engine<R, D, S>>,
    Path(script_id): Path<ScriptId>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<ScriptReport>>
where
    R: RunManager,
    D: ScriptDirectory,
    S: LedgerStore,
{
    let report = engine
        .report_for_script(script_id, filter.project_id)
        .await?;
    info!("{report}");
    Ok(Json(report))
}

async fn generate_report<R, D, S>(
    State(engine): State<Engine<R, D, S>>,
    Path(run_id): Path<RunId>,
) -> Result<Json<GeneratedReport>>
where
    R: RunManager,
    D: ScriptDirectory,
    S: LedgerStore,
{
    Ok(Json(engine.generate_report(run_id).await?))
}

async fn report_url<R, D, S>(
    State(engine): State<Engine<R, D, S>>,
    Path(run_id): Path<RunId>,
) -> Result<Json<ReportUrl>>
where
    R: RunManager,
    D: ScriptDirectory,
    S: LedgerStore,
{
    let report_url = engine.require_report_url(&run_id)?;
    Ok(Json(ReportUrl { report_url }))
}

async fn list_reports<R, D, S>(
    State(engine): State<Engine<R, D, S>>,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<Vec<ReportIndexEntry>>>
where
    R: RunManager,
    D: ScriptDirectory,
    S: LedgerStore,
{
    Ok(Json(engine.list_reports(filter.project_id).await?))
}

async fn cleanup<R, D, S>(
    State(engine): State<Engine<R, D, S>>,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<CleanupResponse>>
where
    R: RunManager,
    D: ScriptDirectory,
    S: LedgerStore,
{
    let removed = engine.cleanup(request.days_to_keep).await?;
    Ok(Json(CleanupResponse { removed }))
}

#[cfg(test)]
mod tests {
    use rr_engine::{
        generator::{ReportGenerator, ReportTool},
        index::{MemoryLedgerStore, ProjectIndex},
        memory::{MemoryRunManager, MemoryScriptDirectory},
        waiter::RunWaiter,
    };
    use rr_models::run::{Run, RunStatus};
    use rr_requests::ApiClient;
    use uuid::Uuid;

    use super::*;

    type TestEngine = ReportEngine<Arc<MemoryRunManager>, MemoryScriptDirectory, MemoryLedgerStore>;

    struct Server {
        _dir: tempfile::TempDir,
        client: ApiClient,
        runs: Arc<MemoryRunManager>,
        base: String,
    }

    async fn serve() -> Server {
        let dir = tempfile::tempdir().expect("tempdir");
        let runs = Arc::new(MemoryRunManager::new());
        let engine: TestEngine = ReportEngine::new(
            runs.clone(),
            MemoryScriptDirectory::new(),
            ReportGenerator::new(
                dir.path().join("results"),
                dir.path().join("reports"),
                "/reports",
                ReportTool::new("/nonexistent/rr-report-tool", Vec::<String>::new(), "index.html"),
            ),
            RunWaiter::default(),
            ProjectIndex::new(MemoryLedgerStore::new()),
        );
        let app = router(Arc::new(engine), &dir.path().join("reports"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move { axum::serve(listener, app).await });

        let base = format!("http://{addr}");
        Server {
            _dir: dir,
            client: ApiClient::new(format!("{base}/v1")).expect("client"),
            runs,
            base,
        }
    }

    async fn finished_run(runs: &MemoryRunManager) -> Run {
        let run = Run {
            id: Uuid::new_v4(),
            script_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            status: RunStatus::Failed,
            started_at: chrono::Utc::now(),
            completed_at: Some(chrono::Utc::now()),
            report_url: None,
        };
        runs.insert(run.clone()).await;
        run
    }

    #[tokio::test]
    async fn generated_report_is_listed_and_served() -> Result<()> {
        let server = serve().await;
        let run = finished_run(&server.runs).await;

        let report: GeneratedReport = server
            .client
            .post(&format!("runs/{}/report", run.id), &serde_json::json!({}))
            .await?;
        assert_eq!(report.report_url, format!("/reports/{}/index.html", run.id));

        let url: ReportUrl = server.client.get(&format!("runs/{}/report", run.id)).await?;
        assert_eq!(url.report_url, report.report_url);

        let listed: Vec<ReportIndexEntry> = server
            .client
            .get_with_params("reports", &ProjectFilter {
                project_id: Some(run.project_id),
            })
            .await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, run.id);

        let page = server
            .client
            .client
            .get(format!("{}{}", server.base, report.report_url))
            .send()
            .await
            .map_err(rr_requests::Error::from)?
            .text()
            .await
            .map_err(rr_requests::Error::from)?;
        assert!(page.contains(&run.id.to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn missing_report_is_404() -> Result<()> {
        let server = serve().await;
        let result: std::result::Result<ReportUrl, _> = server
            .client
            .get(&format!("runs/{}/report", Uuid::new_v4()))
            .await;
        assert!(result.is_err_and(|err| err.is_not_found()));

        let result: std::result::Result<GeneratedReport, _> = server
            .client
            .post(&format!("runs/{}/report", Uuid::new_v4()), &serde_json::json!({}))
            .await;
        assert!(result.is_err_and(|err| err.is_not_found()));
        Ok(())
    }

    #[tokio::test]
    async fn script_with_reported_run_is_cached() -> Result<()> {
        let server = serve().await;
        let mut run = finished_run(&server.runs).await;
        run.id = Uuid::new_v4();
        run.started_at += chrono::Duration::minutes(1);
        run.report_url = Some(String::from("/reports/done/index.html"));
        server.runs.insert(run.clone()).await;

        let report: ScriptReport = server
            .client
            .post_no_body(
                &format!("scripts/{}/report", run.script_id),
                &ProjectFilter::default(),
            )
            .await?;
        assert_eq!(
            report,
            ScriptReport::Cached {
                run_id: run.id,
                report_url: String::from("/reports/done/index.html"),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn cleanup_reports_removed_count() -> Result<()> {
        let server = serve().await;
        let response: CleanupResponse = server
            .client
            .post("reports/cleanup", &CleanupRequest { days_to_keep: 7 })
            .await?;
        assert_eq!(response.removed, 0);
        Ok(())
    }
}
