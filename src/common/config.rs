//! Configuration for minireg nodes

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Node ID (unique identifier, shows up in logs only)
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Journal-specific config
    #[serde(default)]
    pub journal: JournalConfig,

    /// Engine-specific config
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Journal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Root directory for journal partition segments
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Topic all registry mutations are appended to
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Number of partitions for the topic
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Provision the topic at node start if it does not exist
    #[serde(default = "default_auto_create")]
    pub auto_create: bool,

    /// Frame sync policy for appends
    #[serde(default)]
    pub sync: SyncPolicy,

    /// Max time one consumer poll waits for new records (ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Delay before the dispatch loop's first poll (ms)
    #[serde(default = "default_startup_lag_ms")]
    pub startup_lag_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./minireg-data")
}

fn default_topic() -> String {
    "registry-journal".to_string()
}

fn default_partitions() -> u32 {
    4
}

fn default_auto_create() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_startup_lag_ms() -> u64 {
    0
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            topic: default_topic(),
            partitions: default_partitions(),
            auto_create: default_auto_create(),
            sync: SyncPolicy::default(),
            poll_interval_ms: default_poll_interval_ms(),
            startup_lag_ms: default_startup_lag_ms(),
        }
    }
}

impl JournalConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_lag(&self) -> Duration {
        Duration::from_millis(self.startup_lag_ms)
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a caller waits for its mutation to be applied (ms)
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

fn default_response_timeout_ms() -> u64 {
    5_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl EngineConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Durability policy for journal frame writes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPolicy {
    /// Flush and fsync after every append
    #[default]
    Always,
    /// Flush after every append, fsync left to the OS
    Interval,
    /// No explicit flush
    Never,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            journal: JournalConfig::default(),
            engine: EngineConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from an optional TOML file plus `MINIREG_*`
    /// environment overrides (e.g. `MINIREG_JOURNAL__PARTITIONS=8`).
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::with_name("minireg").required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("MINIREG")
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RegistryConfig::default();
        assert_eq!(cfg.journal.partitions, 4);
        assert_eq!(cfg.journal.topic, "registry-journal");
        assert!(cfg.journal.auto_create);
        assert_eq!(cfg.engine.response_timeout(), Duration::from_millis(5_000));
        assert_eq!(cfg.journal.sync, SyncPolicy::Always);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(
            &path,
            r#"
node_id = "node-7"

[journal]
partitions = 2
poll_interval_ms = 50
sync = "never"

[engine]
response_timeout_ms = 750
"#,
        )
        .unwrap();

        let cfg = RegistryConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.node_id, "node-7");
        assert_eq!(cfg.journal.partitions, 2);
        assert_eq!(cfg.journal.sync, SyncPolicy::Never);
        assert_eq!(cfg.engine.response_timeout_ms, 750);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.journal.topic, "registry-journal");
    }
}
