//! Daemon configuration.
//!
//! YAML-based with sensible defaults; a minimal config only needs the
//! namespaces the ingester should write to:
//!
//! ```yaml
//! namespaces:
//!   - id: metrics_10s_6h
//!     resolution: 10s
//!     retention: 6h
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use anthracite_ingest::{ServerConfig, WorkerPoolConfig};
use anthracite_protocol::ClusterNamespace;
use anthracite_rules::IngesterConfig;

/// Top-level daemon configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging verbosity (trace, debug, info, warn, error).
    pub log_level: String,

    /// Carbon plaintext listener.
    pub server: ServerConfig,

    /// Write-path worker pool. Defaults to the dynamic flavor.
    pub worker_pool: WorkerPoolConfig,

    /// Rule engine configuration.
    pub carbon: IngesterConfig,

    /// Aggregated namespace topology for standalone runs. Deployments with
    /// a live namespace watcher leave this empty and drive updates through
    /// the watcher instead.
    pub namespaces: Vec<NamespaceConfig>,

    /// Cadence for logging metric snapshots.
    #[serde(with = "humantime_serde")]
    pub metrics_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerConfig::default(),
            worker_pool: WorkerPoolConfig::dynamic(),
            carbon: IngesterConfig::default(),
            namespaces: Vec::new(),
            metrics_interval: default_metrics_interval(),
        }
    }
}

/// One aggregated namespace the ingester may write to.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NamespaceConfig {
    pub id: String,

    #[serde(with = "humantime_serde")]
    pub resolution: Duration,

    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_interval() -> Duration {
    Duration::from_secs(60)
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate for required fields and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.server.listen_address.is_empty() {
            bail!("server.listen_address is required");
        }

        if self.worker_pool.static_pool.is_none() && self.worker_pool.dynamic_pool.is_none() {
            bail!("worker_pool must configure the static or dynamic flavor");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be positive");
        }

        for ns in &self.namespaces {
            if ns.id.is_empty() {
                bail!("namespaces entries require an id");
            }
            if ns.resolution.is_zero() {
                bail!("namespace {} requires a positive resolution", ns.id);
            }
        }

        Ok(())
    }

    /// The configured static topology as cluster namespaces.
    pub fn cluster_namespaces(&self) -> Vec<ClusterNamespace> {
        self.namespaces
            .iter()
            .map(|ns| ClusterNamespace::aggregated(ns.id.clone(), ns.resolution, ns.retention))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert!(config.worker_pool.dynamic_pool.is_some());
        assert_eq!(config.metrics_interval, Duration::from_secs(60));
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_yaml() {
        let config: Config = serde_yaml::from_str(
            r#"
namespaces:
  - id: metrics_10s_6h
    resolution: 10s
    retention: 6h
"#,
        )
        .unwrap();
        config.validate().unwrap();

        let namespaces = config.cluster_namespaces();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].id, "metrics_10s_6h");
        assert_eq!(
            namespaces[0].attributes.resolution,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_parse_full_yaml() {
        let config: Config = serde_yaml::from_str(
            r#"
log_level: debug
server:
  listen_address: "127.0.0.1:2003"
worker_pool:
  static:
    workers: 8
    queue_size: 256
metrics_interval: 30s
carbon:
  rewrite:
    cleanup: true
  rules:
    - contains: cpu
      policies:
        - resolution: 1m
          retention: 1d
namespaces:
  - id: metrics_1m_1d
    resolution: 1m
    retention: 1d
"#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server.listen_address, "127.0.0.1:2003");
        assert_eq!(config.worker_pool.static_pool.as_ref().unwrap().workers, 8);
        assert!(config.carbon.rewrite.cleanup);
        assert_eq!(config.carbon.rules.len(), 1);
        assert_eq!(config.metrics_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_validation_rejects_zero_resolution() {
        let config: Config = serde_yaml::from_str(
            r#"
namespaces:
  - id: broken
    resolution: 0s
    retention: 6h
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
