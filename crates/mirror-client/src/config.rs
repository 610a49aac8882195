//! TOML-based configuration for the mirroring session.
//!
//! The embedding application decides where the file lives; this module
//! only handles the schema, defaults, and (de)serialization. Fields
//! annotated with `#[serde(default = "...")]` fall back to their
//! defaults when absent, so a partial file or no file at all still
//! yields a working configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema ─────────────────────────────────────────────────────────────

/// Settings for one mirroring session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// `host:port` of the mirroring server on the device. Both channels
    /// connect to this address, video first.
    #[serde(default = "default_server_addr")]
    pub server_addr: String,

    /// Capacity of the video-packet channel. A slow consumer
    /// backpressures the video read loop rather than growing memory.
    #[serde(default = "default_video_buffer")]
    pub video_buffer: usize,

    /// Capacity of the device-event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// How long [`Session::stop`] waits for the read loops to wind down
    /// before aborting them.
    ///
    /// [`Session::stop`]: crate::Session::stop
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_server_addr() -> String {
    "127.0.0.1:27183".to_string()
}
fn default_video_buffer() -> usize {
    512
}
fn default_event_buffer() -> usize {
    64
}
fn default_stop_timeout_ms() -> u64 {
    3000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            video_buffer: default_video_buffer(),
            event_buffer: default_event_buffer(),
            stop_timeout_ms: default_stop_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

impl SessionConfig {
    /// Loads a config from `path`, returning `SessionConfig::default()`
    /// if the file does not yet exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than
    /// "not found", and [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Persists the config to `path`, creating parent directories as
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system failures or
    /// [`ConfigError::Serialize`] if serialization fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
