//! Process execution and I/O management for the RR report engine.
//!
//! Spawns external programs (such as the report-building tool), streams their
//! output line by line and reports how they ended.
//!
//! # Usage
//!
//! ```rust
//! use rr_io::runner::Runner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Runner::new("echo", vec!["Hello, World!"]);
//!     let output = runner.run_collect().await;
//!     assert!(output.success());
//!     assert_eq!(output.stdout, vec!["Hello, World!"]);
//! }
//! ```

pub mod process;
pub mod runner;
