//! Configuration loading for tabsearch.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/tabsearch/config.toml.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Deferred compaction thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionSettings {
    /// Compact when the process-wide write count is a multiple of this.
    #[serde(default = "default_write_threshold")]
    pub write_threshold: u64,

    /// Compact when this many seconds passed since the last compaction.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_write_threshold() -> u64 {
    100
}

fn default_interval_secs() -> u64 {
    300
}

impl Default for CompactionSettings {
    fn default() -> Self {
        Self {
            write_threshold: default_write_threshold(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl CompactionSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.write_threshold == 0 {
            return Err("write_threshold must be > 0".to_string());
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory holding one index per storage key and table
    #[serde(default = "default_index_root")]
    pub index_root: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Memory budget for each scoped index writer, in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Deferred compaction thresholds
    #[serde(default)]
    pub compaction: CompactionSettings,
}

fn default_index_root() -> String {
    ProjectDirs::from("", "", "tabsearch")
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./index"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_root: default_index_root(),
            log_level: default_log_level(),
            writer_memory_mb: default_writer_memory_mb(),
            compaction: CompactionSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/tabsearch/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (TABSEARCH_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "tabsearch")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_root", default_index_root())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("compaction.write_threshold", default_write_threshold() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("compaction.interval_secs", default_interval_secs() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: TABSEARCH_INDEX_ROOT, TABSEARCH_COMPACTION__WRITE_THRESHOLD, etc.
        builder = builder.add_source(
            Environment::with_prefix("TABSEARCH")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.compaction.validate().map_err(TypesError::Config)?;
        Ok(settings)
    }

    /// Expand ~ in index_root to the home directory
    pub fn expanded_index_root(&self) -> PathBuf {
        if let Some(rest) = self.index_root.strip_prefix("~/") {
            if let Some(dirs) = BaseDirs::new() {
                return dirs.home_dir().join(rest);
            }
        }
        PathBuf::from(&self.index_root)
    }
}
