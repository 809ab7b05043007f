//! TOML-based configuration for the server.
//!
//! Reads and writes [`ServerConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\tcpmsg\server.toml`
//! - Linux:    `~/.config/tcpmsg/server.toml`
//! - macOS:    `~/Library/Application Support/tcpmsg/server.toml`
//!
//! # What is TOML? (for beginners)
//!
//! TOML is a small configuration format that looks like an INI file with
//! types.  A full server config looks like this:
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 60000
//! first_client_id = 10000
//! max_payload_len = 16777216
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the key is absent, so the server runs with no file at
//! all and keeps working when new keys are added later.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tcpmsg_core::MAX_PAYLOAD_LEN;
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

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

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener and connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    /// IP address or host name to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port to listen on.  `0` asks the OS for a free port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Id given to the first admitted client; later clients count up.
    #[serde(default = "default_first_client_id")]
    pub first_client_id: u32,
    /// Largest payload accepted from a client, in bytes.  A header that
    /// declares more closes that client's connection.
    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: u64,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    60000
}
fn default_first_client_id() -> u32 {
    10000
}
fn default_max_payload_len() -> u64 {
    MAX_PAYLOAD_LEN
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            first_client_id: default_first_client_id(),
            max_payload_len: default_max_payload_len(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the default path of the server config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("server.toml"))
}

/// Loads a [`ServerConfig`] from `path`, returning the defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`.
///
/// Creates the config directory if it does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ServerConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure directory exists before writing.
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory plus the `tcpmsg` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("tcpmsg"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("tcpmsg"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("tcpmsg")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        // Fallback for unsupported platforms.
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_server_config_default_values() {
        // Arrange / Act
        let cfg = ServerConfig::default();

        // Assert
        assert_eq!(cfg.server.bind_address, "0.0.0.0");
        assert_eq!(cfg.server.port, 60000);
        assert_eq!(cfg.server.first_client_id, 10000);
        assert_eq!(cfg.server.max_payload_len, MAX_PAYLOAD_LEN);
    }

    #[test]
    fn test_logging_default_level_is_info() {
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_empty_toml_is_default_config() {
        let cfg: ServerConfig = toml::from_str("").expect("parse");
        assert_eq!(cfg, ServerConfig::default());
    }

    // ── TOML round-trip ───────────────────────────────────────────────────────

    #[test]
    fn test_server_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = ServerConfig::default();
        cfg.server.port = 7100;
        cfg.server.first_client_id = 1;

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: ServerConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    // ── File repository ───────────────────────────────────────────────────────

    #[test]
    fn test_load_config_missing_file_returns_defaults() {
        let path = std::env::temp_dir()
            .join(format!("tcpmsg-server-config-{}", std::process::id()))
            .join("absent.toml");

        let cfg = load_config(&path).expect("missing file is not an error");

        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_save_then_load_returns_same_config() {
        let path = std::env::temp_dir()
            .join(format!("tcpmsg-server-config-{}", std::process::id()))
            .join("nested")
            .join("server.toml");
        let mut cfg = ServerConfig::default();
        cfg.server.bind_address = "127.0.0.1".to_string();
        cfg.logging.level = "debug".to_string();

        save_config(&cfg, &path).expect("save");
        let loaded = load_config(&path).expect("load");

        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_file(&path);
    }
}
