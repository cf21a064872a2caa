//! Daemon configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, `dockd.toml`
//! in the working directory, `DOCKD_*` environment variables, CLI flags.
//! Read once at startup; changing limits requires a restart.

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const CONFIG_FILE: &str = "dockd.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the HTTP API listens on.
    pub http_port: u16,
    /// Size of the scheduler's admission gate.
    pub max_concurrent_jobs: usize,
    /// Hard wall-clock budget per job, in seconds.
    pub job_timeout_secs: u64,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: 8000,
            max_concurrent_jobs: 5,
            job_timeout_secs: 3600,
            verbose: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Merge defaults, config file, environment and optional CLI
    /// overrides. `overrides` serializes with absent flags skipped, so
    /// unset flags do not clobber file or env values.
    pub fn new<T: Serialize>(overrides: Option<&T>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("DOCKD_"));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;

        if config.max_concurrent_jobs == 0 {
            anyhow::bail!("max_concurrent_jobs must be at least 1");
        }
        if config.job_timeout_secs == 0 {
            anyhow::bail!("job_timeout_secs must be at least 1");
        }

        Ok(config)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}
