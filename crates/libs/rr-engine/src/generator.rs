//! Report artifact generation.
//!
//! Every run gets its own artifact directory under the reports root. The
//! external report-building tool is pointed at the whole raw-result pool and
//! writes into that directory. When the tool can't do its job a minimal
//! standalone page is written instead, so a generation request only fails when
//! the artifact directory itself can't be written.

use std::path::{Path, PathBuf};

use rr_config::rr_config::{RrStorageConfig, RrToolConfig};
use rr_io::runner::Runner;
use rr_models::{RunId, raw_result::RawResult, report::GeneratedReport};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::prelude::*;

/// How to invoke the external report-building tool.
#[derive(Debug, Clone)]
pub struct ReportTool {
    command: String,
    args: Vec<String>,
    entry_file: String,
}

impl ReportTool {
    /// `args` may contain `{results}` and `{output}` placeholders.
    pub fn new(
        command: impl Into<String>,
        args: Vec<impl Into<String>>,
        entry_file: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(|a| a.into()).collect(),
            entry_file: entry_file.into(),
        }
    }

    pub fn from_config(config: &RrToolConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.args.clone(),
            config.entry_file.clone(),
        )
    }

    fn runner(&self, results_dir: &Path, output_dir: &Path) -> Runner {
        let results = results_dir.to_string_lossy();
        let output = output_dir.to_string_lossy();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                arg.replace("{results}", &results)
                    .replace("{output}", &output)
            })
            .collect();
        Runner::new(self.command.clone(), args)
    }
}

/// Turns raw run results into static report artifacts.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    results_dir: PathBuf,
    reports_dir: PathBuf,
    public_url: String,
    tool: ReportTool,
}

impl ReportGenerator {
    pub fn new(
        results_dir: impl Into<PathBuf>,
        reports_dir: impl Into<PathBuf>,
        public_url: impl Into<String>,
        tool: ReportTool,
    ) -> Self {
        let public_url: String = public_url.into();
        Self {
            results_dir: results_dir.into(),
            reports_dir: reports_dir.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
            tool,
        }
    }

    pub fn from_config(storage: &RrStorageConfig, tool: &RrToolConfig, public_url: &str) -> Self {
        Self::new(
            storage.results_dir.clone(),
            storage.reports_dir.clone(),
            public_url,
            ReportTool::from_config(tool),
        )
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Artifact directory of a run.
    pub fn artifact_dir(&self, run_id: &RunId) -> PathBuf {
        self.reports_dir.join(run_id.to_string())
    }

    fn entry_path(&self, run_id: &RunId) -> PathBuf {
        self.artifact_dir(run_id).join(&self.tool.entry_file)
    }

    fn raw_result_path(&self, run_id: &RunId) -> PathBuf {
        self.results_dir.join(RawResult::file_name(run_id))
    }

    fn url_for(&self, run_id: &RunId) -> String {
        format!("{}/{}/{}", self.public_url, run_id, self.tool.entry_file)
    }

    /// URL of the run's report, or an empty string when no artifact exists.
    pub fn report_url(&self, run_id: &RunId) -> String {
        if self.artifact_dir(run_id).is_dir() {
            self.url_for(run_id)
        } else {
            String::new()
        }
    }

    /// Generate (or regenerate) the report of `run_id`.
    pub async fn generate(&self, run_id: RunId) -> Result<GeneratedReport> {
        let raw_result = self.ensure_raw_result(&run_id).await;
        let output_dir = self.artifact_dir(&run_id);
        self.reset_artifact_dir(&output_dir).await?;

        match self.run_tool(&run_id, &output_dir).await {
            Ok(()) => info!("Report for run {run_id} built in {}", output_dir.display()),
            Err(err) => {
                warn!("Falling back to a minimal report for run {run_id} - {err}");
                let message = raw_result.as_ref().and_then(|result| result.error_message());
                self.write_fallback(&run_id, &err.to_string(), message)
                    .await?;
            }
        }

        Ok(GeneratedReport {
            report_path: self.entry_path(&run_id),
            report_url: self.url_for(&run_id),
        })
    }

    /// Load the run's raw result, writing a placeholder when there is none.
    ///
    /// Problems with the pool are logged and never stop the generation.
    async fn ensure_raw_result(&self, run_id: &RunId) -> Option<RawResult> {
        let path = self.raw_result_path(run_id);
        match fs::read_to_string(&path).await {
            Ok(content) => {
                return serde_json::from_str(&content)
                    .inspect_err(|err| warn!("Unreadable raw result {} - {err}", path.display()))
                    .ok();
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!("Failed to read raw result {} - {err}", path.display());
                return None;
            }
        }

        debug!("No raw result for run {run_id}, writing placeholder");
        let placeholder = RawResult::placeholder(*run_id);
        let written = async {
            fs::create_dir_all(&self.results_dir).await?;
            let content = serde_json::to_string_pretty(&placeholder)?;
            fs::write(&path, content).await?;
            Ok::<(), Error>(())
        }
        .await;
        if let Err(err) = written {
            warn!("Failed to write placeholder result {} - {err}", path.display());
        }
        Some(placeholder)
    }

    async fn reset_artifact_dir(&self, output_dir: &Path) -> Result<()> {
        match fs::remove_dir_all(output_dir).await {
            Ok(()) => debug!("Cleared previous artifact {}", output_dir.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(Error::persistence(output_dir)(err)),
        }
        fs::create_dir_all(output_dir)
            .await
            .map_err(Error::persistence(output_dir))
    }

    async fn run_tool(&self, run_id: &RunId, output_dir: &Path) -> Result<()> {
        let runner = self.tool.runner(&self.results_dir, output_dir);
        info!("Building report for run {run_id}: {}", runner.get_full_command());

        let output = runner.run_collect().await;
        if let Some(reason) = output.failure_reason() {
            return Err(Error::ToolUnavailable(reason));
        }
        if !fs::try_exists(self.entry_path(run_id)).await.unwrap_or(false) {
            return Err(Error::ToolUnavailable(format!(
                "'{}' produced no {}",
                self.tool.command, self.tool.entry_file
            )));
        }
        Ok(())
    }

    async fn write_fallback(
        &self,
        run_id: &RunId,
        reason: &str,
        run_error: Option<&str>,
    ) -> Result<()> {
        let output_dir = self.artifact_dir(run_id);
        // The tool may have removed the directory before failing
        fs::create_dir_all(&output_dir)
            .await
            .map_err(Error::persistence(&output_dir))?;

        let entry = self.entry_path(run_id);
        fs::write(&entry, fallback_page(run_id, reason, run_error))
            .await
            .map_err(Error::persistence(&entry))
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Standalone page written when the report tool fails.
fn fallback_page(run_id: &RunId, reason: &str, run_error: Option<&str>) -> String {
    let run_error = run_error
        .map(|message| {
            format!(
                "<h2>Run error</h2>\n<pre class=\"run-error\">{}</pre>\n",
                escape_html(message)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Report for run {run_id}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.error {{ color: #b00020; }}
pre {{ background: #f4f4f4; padding: 1rem; white-space: pre-wrap; }}
</style>
</head>
<body>
<h1>Report for run {run_id}</h1>
<p class="error" data-report-status="error">Report generation failed. A minimal report was produced instead.</p>
<h2>Reason</h2>
<pre class="tool-error">{reason}</pre>
{run_error}</body>
</html>
"#,
        reason = escape_html(reason),
    )
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn generator(root: &Path, tool: ReportTool) -> ReportGenerator {
        ReportGenerator::new(
            root.join("results"),
            root.join("reports"),
            "/reports/",
            tool,
        )
    }

    fn missing_tool() -> ReportTool {
        ReportTool::new("/nonexistent/rr-report-tool", vec!["{results}"], "index.html")
    }

    /// Tool that renders a page listing the pool's files.
    fn working_tool() -> ReportTool {
        ReportTool::new(
            "sh",
            vec![
                "-c",
                "mkdir -p \"$1\" && ls \"$0\" > \"$1/index.html\"",
                "{results}",
                "{output}",
            ],
            "index.html",
        )
    }

    #[test]
    fn placeholders_are_substituted() {
        let tool = ReportTool::new(
            "allure",
            vec!["generate", "{results}", "--clean", "-o", "{output}"],
            "index.html",
        );
        let runner = tool.runner(Path::new("/pool"), Path::new("/reports/r1"));
        assert_eq!(
            runner.get_full_command(),
            "allure generate /pool --clean -o /reports/r1"
        );
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<script>alert('x')</script> & \"more\""),
            "&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; &quot;more&quot;"
        );
    }

    #[tokio::test]
    async fn url_is_empty_until_generated() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(dir.path(), missing_tool());
        let run_id = Uuid::new_v4();

        assert_eq!(generator.report_url(&run_id), "");
        let report = generator.generate(run_id).await?;
        assert_eq!(report.report_url, format!("/reports/{run_id}/index.html"));
        assert_eq!(generator.report_url(&run_id), report.report_url);
        Ok(())
    }

    #[tokio::test]
    async fn missing_raw_result_gets_a_placeholder() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(dir.path(), missing_tool());
        let run_id = Uuid::new_v4();

        generator.generate(run_id).await?;

        let content =
            std::fs::read_to_string(dir.path().join("results").join(RawResult::file_name(&run_id)))?;
        let placeholder: RawResult = serde_json::from_str(&content)?;
        assert_eq!(placeholder.run_id, run_id);
        assert_eq!(placeholder.status, rr_models::run::RunStatus::Passed);
        assert!(placeholder.error_message().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn existing_raw_result_is_kept_and_its_error_embedded() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(dir.path(), missing_tool());
        let run_id = Uuid::new_v4();

        let mut result = RawResult::placeholder(run_id);
        result.status = rr_models::run::RunStatus::Failed;
        result.status_details.message = Some(String::from("expected <200> got 500"));
        let results_dir = dir.path().join("results");
        std::fs::create_dir_all(&results_dir)?;
        let path = results_dir.join(RawResult::file_name(&run_id));
        std::fs::write(&path, serde_json::to_string(&result)?)?;

        let report = generator.generate(run_id).await?;
        let page = std::fs::read_to_string(&report.report_path)?;
        assert!(page.contains("expected &lt;200&gt; got 500"));

        let kept: RawResult = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(kept, result);
        Ok(())
    }

    #[tokio::test]
    async fn failing_tool_produces_fallback_page() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let tool = ReportTool::new("sh", vec!["-c", "echo 'java not found' >&2; exit 1"], "index.html");
        let generator = generator(dir.path(), tool);
        let run_id = Uuid::new_v4();

        let report = generator.generate(run_id).await?;
        let page = std::fs::read_to_string(&report.report_path)?;
        assert!(page.contains(&run_id.to_string()));
        assert!(page.contains("data-report-status=\"error\""));
        assert!(page.contains("java not found"));
        Ok(())
    }

    #[tokio::test]
    async fn tool_without_entry_resource_is_a_failure() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(dir.path(), ReportTool::new("true", Vec::<String>::new(), "index.html"));
        let run_id = Uuid::new_v4();

        let report = generator.generate(run_id).await?;
        let page = std::fs::read_to_string(&report.report_path)?;
        assert!(page.contains("produced no index.html"));
        Ok(())
    }

    #[tokio::test]
    async fn tool_sees_the_whole_pool() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(dir.path(), working_tool());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        generator.generate(first).await?;
        let report = generator.generate(second).await?;

        let page = std::fs::read_to_string(&report.report_path)?;
        assert!(page.contains(&RawResult::file_name(&first)));
        assert!(page.contains(&RawResult::file_name(&second)));
        assert!(!page.contains("data-report-status"));
        Ok(())
    }

    #[tokio::test]
    async fn noisy_non_utf8_tool_still_renders_its_page() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let tool = ReportTool::new(
            "sh",
            vec![
                "-c",
                "printf 'Generating \\351\\n'; i=0; while [ $i -lt 2000 ]; do echo line $i; i=$((i+1)); done; echo ok > \"$0/index.html\"",
                "{output}",
            ],
            "index.html",
        );
        let generator = generator(dir.path(), tool);

        let report = generator.generate(Uuid::new_v4()).await?;
        assert_eq!(std::fs::read_to_string(&report.report_path)?, "ok\n");
        Ok(())
    }

    #[tokio::test]
    async fn regeneration_clears_previous_artifact() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let generator = generator(dir.path(), missing_tool());
        let run_id = Uuid::new_v4();

        let first = generator.generate(run_id).await?;
        let stale = generator.artifact_dir(&run_id).join("stale.js");
        std::fs::write(&stale, "old")?;

        let second = generator.generate(run_id).await?;
        assert_eq!(first, second);
        assert!(!stale.exists());
        assert!(second.report_path.is_file());
        Ok(())
    }

    #[tokio::test]
    async fn unwritable_reports_root_is_fatal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        // A file where the reports root should be
        let blocked = dir.path().join("reports");
        std::fs::write(&blocked, "not a directory")?;
        let generator = generator(dir.path(), missing_tool());

        let result = generator.generate(Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::Persistence { .. })));
        Ok(())
    }
}
