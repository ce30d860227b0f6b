use log::info;
use rr_models::{
    ProjectId, RunId, ScriptId,
    report::{
        CleanupRequest, CleanupResponse, GeneratedReport, ProjectFilter, ReportIndexEntry,
        ReportUrl, ScriptReport,
    },
};
use rr_requests::{ApiClient, Result};

pub async fn handle_script(
    client: &ApiClient,
    script_id: ScriptId,
    project_id: Option<ProjectId>,
) -> Result<()> {
    info!("Requesting report of script {script_id}");
    let report: ScriptReport = client
        .post_no_body(
            &format!("scripts/{script_id}/report"),
            &ProjectFilter { project_id },
        )
        .await?;
    println!("{report}");
    Ok(())
}

pub async fn handle_run(client: &ApiClient, run_id: RunId) -> Result<()> {
    info!("Generating report of run {run_id}");
    let report: GeneratedReport = client
        .post_no_body(&format!("runs/{run_id}/report"), &ProjectFilter::default())
        .await?;
    println!("{}", report.report_url);
    Ok(())
}

pub async fn handle_url(client: &ApiClient, run_id: RunId) -> Result<()> {
    match client
        .get::<ReportUrl>(&format!("runs/{run_id}/report"))
        .await
    {
        Ok(url) => println!("{}", url.report_url),
        Err(err) if err.is_not_found() => println!("Run {run_id} has no report"),
        Err(err) => return Err(err),
    }
    Ok(())
}

pub async fn handle_list(client: &ApiClient, project_id: Option<ProjectId>) -> Result<()> {
    let reports: Vec<ReportIndexEntry> = client
        .get_with_params("reports", &ProjectFilter { project_id })
        .await?;
    info!("{} report(s)", reports.len());
    for report in reports {
        println!(
            "{}  {:<9}  {}  {}  {}",
            report.created_at.format("%Y-%m-%d %H:%M:%S"),
            report.status,
            report.id,
            report.script_name,
            report.report_url
        );
    }
    Ok(())
}

pub async fn handle_cleanup(client: &ApiClient, days_to_keep: u32) -> Result<()> {
    info!("Removing reports older than {days_to_keep} days");
    let response: CleanupResponse = client
        .post("reports/cleanup", &CleanupRequest { days_to_keep })
        .await?;
    println!("Removed {} report(s)", response.removed);
    Ok(())
}
