//! Data model shared by every RR crate.
//!
//! Describes the runs owned by the run-management collaborator, the raw result
//! records consumed by the report-building tool and the report index entries
//! kept per project.
//!
//! # Usage
//!
//! ```rust
//! use rr_models::run::RunStatus;
//!
//! let status: RunStatus = "passed".parse().unwrap();
//! assert!(status.is_terminal());
//! ```

pub mod error;
pub mod prelude;
pub mod raw_result;
pub mod report;
pub mod run;

use uuid::Uuid;

/// Identifier of a run.
pub type RunId = Uuid;
/// Identifier of a script.
pub type ScriptId = Uuid;
/// Identifier of a project.
pub type ProjectId = Uuid;
