//! Daemon configuration.
//!
//! Everything is optional with workable defaults except the things validate()
//! insists on. Settings come from an optional TOML file plus `STRATUS__*`
//! environment overrides, e.g. `STRATUS__DATABASE__URL=postgres://...`.

use serde::{Deserialize, Serialize};

use stratus_cluster::{ClusterEndpoints, Propagation};
use stratus_store::PostgresConfig;
use stratus_workflow::WorkflowClientConfig;

use crate::platform::PlatformConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: PostgresConfig,
    pub workflow: WorkflowClientConfig,
    pub platform: PlatformConfig,
    pub clusters: ClustersConfig,
    pub rules: RulesConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

/// Cluster API endpoints and which cluster plays the admin role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClustersConfig {
    /// Cluster hosting the per-cluster endpoint secrets.
    pub admin: String,
    pub endpoints: ClusterEndpoints,
    /// Per-request timeout for cluster API calls, in milliseconds.
    pub api_timeout_ms: u64,
}

impl Default for ClustersConfig {
    fn default() -> Self {
        Self {
            admin: String::new(),
            endpoints: ClusterEndpoints::new(),
            api_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// How ruler configuration changes reach the running ruler.
    pub propagation: Propagation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between cycles.
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.is_empty() {
            return Err("database.url must not be empty".into());
        }
        if self.database.pool_size == 0 {
            return Err("database.pool_size must be at least 1".into());
        }
        if self.workflow.base_url.is_empty() {
            return Err("workflow.base_url must not be empty".into());
        }
        if self.platform.base_url.is_empty() {
            return Err("platform.base_url must not be empty".into());
        }
        if self.scheduler.interval_secs == 0 {
            return Err("scheduler.interval_secs must be at least 1".into());
        }
        Ok(())
    }
}

pub mod loader {
    use config::{Config, ConfigError, Environment, File};

    use super::AppConfig;

    /// Loads configuration from an optional file plus environment overrides.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        // Environment variable overrides, e.g. STRATUS__SCHEDULER__INTERVAL_SECS=10
        builder = builder.add_source(
            Environment::with_prefix("STRATUS")
                .prefix_separator("__")
                .separator("__"),
        );

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate().map_err(ConfigError::Message)?;
        Ok(cfg)
    }
}
