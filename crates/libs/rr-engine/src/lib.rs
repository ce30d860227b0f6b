//! Report generation and indexing for script runs.
//!
//! Given a script or a run, the engine picks the run to report on, waits for
//! freshly created runs to finish, builds a static report artifact with an
//! external tool (or a minimal fallback page when the tool can't run) and
//! records it in a per-project ledger. Runs themselves belong to an external
//! run-management collaborator reached through [`collaborators::RunManager`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use rr_engine::{
//!     engine::ReportEngine,
//!     generator::{ReportGenerator, ReportTool},
//!     index::{MemoryLedgerStore, ProjectIndex},
//!     memory::{MemoryRunManager, MemoryScriptDirectory},
//!     waiter::RunWaiter,
//! };
//! use uuid::Uuid;
//!
//! # async fn example() -> rr_engine::prelude::Result<()> {
//! let engine = ReportEngine::new(
//!     MemoryRunManager::new(),
//!     MemoryScriptDirectory::new(),
//!     ReportGenerator::new(
//!         "data/results",
//!         "data/reports",
//!         "/reports",
//!         ReportTool::new("allure", vec!["generate", "{results}", "-o", "{output}"], "index.html"),
//!     ),
//!     RunWaiter::default(),
//!     ProjectIndex::new(MemoryLedgerStore::new()),
//! );
//! let report = engine.report_for_script(Uuid::new_v4(), None).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod collaborators;
pub mod engine;
pub mod error;
pub mod generator;
pub mod index;
pub mod memory;
pub mod prelude;
pub mod retention;
pub mod selector;
pub mod waiter;
