//! Raw execution results consumed by the report-building tool.
//!
//! One record is stored per run in the shared raw-result pool. The field
//! names follow the result format understood by Allure-style report builders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{RunId, run::RunStatus};

/// Extra details about a result's status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusDetails {
    /// Error message reported by the execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Execution outcome of a single run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    /// Run this result belongs to.
    #[serde(rename = "uuid")]
    pub run_id: RunId,
    /// Display name of the result.
    pub name: String,
    /// Execution outcome.
    pub status: RunStatus,
    /// Optional error information.
    #[serde(default)]
    pub status_details: StatusDetails,
    /// Start time in epoch milliseconds.
    pub start: i64,
    /// Stop time in epoch milliseconds.
    pub stop: i64,
}

impl RawResult {
    /// File name of this run's record inside the raw-result pool.
    pub fn file_name(run_id: &RunId) -> String {
        format!("{run_id}-result.json")
    }

    /// Minimal result synthesized when the execution left nothing behind.
    ///
    /// ```rust
    /// use rr_models::{raw_result::RawResult, run::RunStatus};
    /// use uuid::Uuid;
    ///
    /// let placeholder = RawResult::placeholder(Uuid::new_v4());
    /// assert_eq!(placeholder.status, RunStatus::Passed);
    /// assert!(placeholder.error_message().is_none());
    /// ```
    pub fn placeholder(run_id: RunId) -> Self {
        Self::placeholder_at(run_id, Utc::now())
    }

    pub fn placeholder_at(run_id: RunId, at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis();
        Self {
            run_id,
            name: format!("Run {run_id}"),
            status: RunStatus::Passed,
            status_details: StatusDetails::default(),
            start: millis,
            stop: millis,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.status_details.message.as_deref()
    }
}
