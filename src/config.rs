/*!
 * Configuration types for bagmend
 */

use crate::error::{BagError, Result};
use bagmend_core_manifest::{EngineConfig, ReplaceOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for rename and rehash operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagmendConfig {
    /// Only report what would change (the default)
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Threads used to hash files during validation
    #[serde(default = "default_processes")]
    pub processes: usize,

    /// Validate the bag before touching it
    #[serde(default = "default_true")]
    pub validate_before: bool,

    /// Re-open and validate the bag after rehashing
    #[serde(default = "default_true")]
    pub validate_after: bool,

    /// Write the applied renames to a rename log
    #[serde(default)]
    pub write_log: bool,

    /// Rename log path (None = `renameLog-<bag>-<timestamp>.json` in the working directory)
    #[serde(default)]
    pub log_path: Option<PathBuf>,

    /// fsync rewritten manifests before they replace the originals
    #[serde(default = "default_true")]
    pub sync: bool,

    /// Show progress bar while hashing
    #[serde(default)]
    pub show_progress: bool,

    /// Payload naming convention used when no rename map is given
    #[serde(default)]
    pub convention: ConventionConfig,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for BagmendConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            processes: default_processes(),
            validate_before: true,
            validate_after: true,
            write_log: false,
            log_path: None,
            sync: true,
            show_progress: false,
            convention: ConventionConfig::default(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Fields of the institutional payload naming convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionConfig {
    #[serde(default = "default_institution")]
    pub institution: String,

    /// Separator between the institution, collection and file fields
    #[serde(default = "default_interfield_sep")]
    pub interfield_sep: String,

    /// Separator inside a field
    #[serde(default = "default_intrafield_sep")]
    pub intrafield_sep: String,
}

impl Default for ConventionConfig {
    fn default() -> Self {
        Self {
            institution: default_institution(),
            interfield_sep: default_interfield_sep(),
            intrafield_sep: default_intrafield_sep(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_processes() -> usize {
    1
}

fn default_institution() -> String {
    "jhu".to_string()
}

fn default_interfield_sep() -> String {
    "_".to_string()
}

fn default_intrafield_sep() -> String {
    "-".to_string()
}

impl BagmendConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BagError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents)
            .map_err(|e| BagError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BagError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Manifest engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            replace: ReplaceOptions {
                sync: self.sync,
                ..ReplaceOptions::default()
            },
            ..EngineConfig::default()
        }
    }
}
