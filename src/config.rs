//! search-indexer configuration management.
//!
//! Configuration is a TOML file (default `search-indexer.toml` in the
//! working directory). Every section is optional; a missing file yields
//! the defaults. Relative paths inside the file are resolved against the
//! directory containing it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{IndexerError, Result};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "search-indexer.toml";

/// search-indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexerConfig {
    /// Snapshot file locations
    #[serde(default)]
    pub state: StateConfig,

    /// Document store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Remote resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Username derivation and validation
    #[serde(default)]
    pub username: UsernameConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Snapshot file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// DHT state snapshot (`[{key, value}]`)
    #[serde(default = "default_dht_file")]
    pub dht_file: PathBuf,

    /// Blockchain/namespace state snapshot (`[{fqu, value_hash}]`)
    #[serde(default = "default_blockchain_file")]
    pub blockchain_file: PathBuf,
}

fn default_dht_file() -> PathBuf {
    PathBuf::from("data/dht_state.json")
}

fn default_blockchain_file() -> PathBuf {
    PathBuf::from("data/blockchain_state.json")
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dht_file: default_dht_file(),
            blockchain_file: default_blockchain_file(),
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database holding every collection
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("search.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Base URL of the resolver
    #[serde(default = "default_resolver_url")]
    pub url: String,

    /// Endpoint listing every registered user
    #[serde(default = "default_all_users_endpoint")]
    pub all_users_endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_resolver_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_all_users_endpoint() -> String {
    "/v1/users".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            url: default_resolver_url(),
            all_users_endpoint: default_all_users_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Username configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameConfig {
    /// Characters trimmed from the end of a fully-qualified name first
    #[serde(default = "default_strip_suffix")]
    pub strip_suffix: String,

    /// Characters trimmed after the suffix
    #[serde(default = "default_strip_separator")]
    pub strip_separator: String,

    /// Regex a username must match to be indexed
    #[serde(default = "default_username_pattern")]
    pub pattern: String,
}

fn default_strip_suffix() -> String {
    "id".to_string()
}

fn default_strip_separator() -> String {
    ".".to_string()
}

fn default_username_pattern() -> String {
    "^[a-z0-9_]{1,60}$".to_string()
}

impl Default for UsernameConfig {
    fn default() -> Self {
        Self {
            strip_suffix: default_strip_suffix(),
            strip_separator: default_strip_separator(),
            pattern: default_username_pattern(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl IndexerConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| IndexerError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse configuration from TOML text, leaving paths as written
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| IndexerError::Config {
            message: format!("Failed to parse config: {}", e),
        })
    }

    /// Make every relative path relative to `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.state.dht_file,
            &mut self.state.blockchain_file,
            &mut self.store.path,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
