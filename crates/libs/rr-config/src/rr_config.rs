//! Core configuration types for the RR report engine.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::prelude::*;

/// Environment variable pointing at the configuration file.
pub const CONFIG_ENV: &str = "RR_CONFIG";

/// On-disk locations used by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrStorageConfig {
    /// Shared raw-result pool. One record per run.
    pub results_dir: PathBuf,
    /// Reports root. One artifact directory per run.
    pub reports_dir: PathBuf,
    /// Index directory. One ledger per project.
    pub index_dir: PathBuf,
}

impl Default for RrStorageConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("data/results"),
            reports_dir: PathBuf::from("data/reports"),
            index_dir: PathBuf::from("data/index"),
        }
    }
}

impl RrStorageConfig {
    /// Create every configured directory that doesn't exist yet.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.results_dir, &self.reports_dir, &self.index_dir] {
            std::fs::create_dir_all(dir)?;
            debug!("Storage directory ready: {}", dir.display());
        }
        Ok(())
    }
}

/// External report-building tool invocation.
///
/// Arguments may contain `{results}` and `{output}`, replaced by the raw-result
/// pool and the run's artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrToolConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Entry resource the tool must produce inside the artifact directory.
    pub entry_file: String,
}

impl Default for RrToolConfig {
    fn default() -> Self {
        Self {
            command: String::from("allure"),
            args: ["generate", "{results}", "--clean", "-o", "{output}"]
                .into_iter()
                .map(String::from)
                .collect(),
            entry_file: String::from("index.html"),
        }
    }
}

/// Bounded wait for freshly created runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrWaiterConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for RrWaiterConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: 30,
        }
    }
}

impl RrWaiterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Longest time a wait can take.
    pub fn ceiling(&self) -> Duration {
        self.poll_interval() * self.max_attempts
    }
}

/// HTTP daemon settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrServerConfig {
    pub bind: SocketAddr,
    /// URL prefix under which report artifacts are served.
    pub public_url: String,
}

impl Default for RrServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            public_url: String::from("/reports"),
        }
    }
}

/// Base URLs of the external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrCollaboratorsConfig {
    /// Run-management service.
    pub run_url: String,
    /// Script/project directory service.
    pub script_url: String,
}

impl Default for RrCollaboratorsConfig {
    fn default() -> Self {
        Self {
            run_url: String::from("http://127.0.0.1:4000/v1"),
            script_url: String::from("http://127.0.0.1:4000/v1"),
        }
    }
}

/// Periodic artifact cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RrRetentionConfig {
    /// Artifacts older than this are removed. `None` disables the periodic cleanup.
    pub days_to_keep: Option<u32>,
    pub interval_secs: u64,
}

impl Default for RrRetentionConfig {
    fn default() -> Self {
        Self {
            days_to_keep: None,
            interval_secs: 24 * 60 * 60,
        }
    }
}

/// Complete RR configuration. Usually loaded from a TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RrConfig {
    pub storage: RrStorageConfig,
    pub tool: RrToolConfig,
    pub waiter: RrWaiterConfig,
    pub server: RrServerConfig,
    pub collaborators: RrCollaboratorsConfig,
    pub retention: RrRetentionConfig,
}

impl RrConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(file_path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        Ok(toml::from_str(value)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load the configuration used by the services.
    ///
    /// Reads `path`, or the file named by `RR_CONFIG`, or falls back to the
    /// defaults, then applies `RR_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                info!("No configuration file given, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = lookup("RR_RESULTS_DIR") {
            self.storage.results_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RR_REPORTS_DIR") {
            self.storage.reports_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("RR_INDEX_DIR") {
            self.storage.index_dir = PathBuf::from(dir);
        }
        if let Some(command) = lookup("RR_TOOL") {
            self.tool.command = command;
        }
        if let Some(url) = lookup("RR_PUBLIC_URL") {
            self.server.public_url = url;
        }
        if let Some(url) = lookup("RR_RUN_URL") {
            self.collaborators.run_url = url;
        }
        if let Some(url) = lookup("RR_SCRIPT_URL") {
            self.collaborators.script_url = url;
        }
        if let Some(bind) = lookup("RR_BIND") {
            self.server.bind = bind.parse().map_err(|_| Error::InvalidEnvOverride {
                var: "RR_BIND",
                value: bind,
            })?;
        }
        Ok(())
    }
}
