//! filterfs Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It is the shared configuration vocabulary for the filterfs sources and
//! the logging setup. Every struct deserializes from JSON; missing fields
//! fall back to their `Default` values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Log target used by the filter chain
pub const TARGET_CHAIN: &str = "filterfs::chain";
/// Log target used by the in-memory filesystem
pub const TARGET_MEMORY: &str = "filterfs::memory";
/// Log target used by the native filesystem
pub const TARGET_NATIVE: &str = "filterfs::native";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Verbosity level, independent of any logging backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format of the log subscriber
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// Single line, no timestamps
    Compact,
    /// Newline delimited JSON
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub global: LogLevel,
    pub chain: Option<LogLevel>,
    pub memory: Option<LogLevel>,
    pub native: Option<LogLevel>,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: LogLevel::Info,
            chain: None,
            memory: None,
            native: None,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Get log level for a specific target
    pub fn level_for(&self, target: &str) -> LogLevel {
        match target {
            TARGET_CHAIN => self.chain.unwrap_or(self.global),
            TARGET_MEMORY => self.memory.unwrap_or(self.global),
            TARGET_NATIVE => self.native.unwrap_or(self.global),
            _ => self.global,
        }
    }
}

/// Configuration for the OS-backed filesystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// When set, every path is resolved below this directory
    pub base: Option<PathBuf>,
}

/// Configuration for the in-memory filesystem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Permission bits for files made by `create`
    pub file_mode: u32,
    /// Permission bits for parent directories made while seeding files
    pub dir_mode: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            file_mode: 0o666,
            dir_mode: 0o755,
        }
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub log: LogConfig,
    pub native: NativeConfig,
    pub memory: MemoryConfig,
}

impl FsConfig {
    /// Parse a JSON document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}
