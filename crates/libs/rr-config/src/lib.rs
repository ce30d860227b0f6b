//! Configuration management for the RR report engine.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working local setup.
//!
//! # Usage
//!
//! ```rust
//! use rr_config::RrConfig;
//!
//! let config = RrConfig::from_toml(r#"
//!     [waiter]
//!     max_attempts = 10
//! "#).unwrap();
//! assert_eq!(config.waiter.max_attempts, 10);
//! assert_eq!(config.waiter.poll_interval_ms, 1000);
//! ```

pub mod error;
pub mod prelude;
pub mod rr_config;

pub use rr_config::RrConfig;
