//! Configuration file parser for `rss-relay.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted and reported with a warning.
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed fine but is not usable.
    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the RPC listener binds to.
    pub listen_addr: String,

    /// Per-URL HTTP timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Maximum accepted feed document size in bytes.
    pub max_feed_bytes: usize,

    /// Default deadline for multi-feed requests in seconds. 0 = no deadline.
    pub request_timeout_secs: u64,

    /// Abort fetches still in flight when a multi-feed request times out.
    pub abort_stragglers: bool,

    /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:50051".to_string(),
            fetch_timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 0,
            abort_stragglers: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "listen_addr",
        "fetch_timeout_secs",
        "max_feed_bytes",
        "request_timeout_secs",
        "abort_stragglers",
        "log_level",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Unusable values → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid loading a huge file
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in Self::unknown_keys(&raw) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), listen_addr = %config.listen_addr, "Loaded configuration");
        Ok(config)
    }

    /// Top-level keys that do not map to a config field, in file order.
    pub(crate) fn unknown_keys(raw: &toml::Table) -> Vec<String> {
        raw.keys()
            .filter(|key| !Self::KNOWN_KEYS.contains(&key.as_str()))
            .cloned()
            .collect()
    }

    /// Rejects values that would make the service unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "fetch_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.max_feed_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_feed_bytes",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "listen_addr",
                reason: e.to_string(),
            })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Default multi-feed deadline, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

// ============================================================================
// Tests
// ============================================================================
