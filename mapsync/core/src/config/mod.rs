//! TOML Configuration File Support
//!
//! Centralized configuration loading for the sync layer and its daemon,
//! backed by a TOML file at `~/.config/mapsync/mapsync.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/mapsync/mapsync.toml` (typically `~/.config/mapsync/mapsync.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [sync]
//! enrichment_type = "ONUNode"
//! channel_capacity = 100
//! log_selected_type = true
//! recolor_strategy = "recreate"
//!
//! [daemon]
//! query_timeout_ms = 10000
//! tile_url = "https://tile.openstreetmap.org/{z}/{x}/{y}.png"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::SyncConfig;
use crate::registry::RecolorStrategy;
use crate::transport::DEFAULT_QUERY_TIMEOUT;

/// Environment variable for the enrichment component type
pub const ENV_ENRICH_TYPE: &str = "MAPSYNC_ENRICH_TYPE";
/// Environment variable for the outbound channel capacity
pub const ENV_CHANNEL_CAPACITY: &str = "MAPSYNC_CHANNEL_CAPACITY";
/// Environment variable toggling selected-type logging
pub const ENV_LOG_SELECTED_TYPE: &str = "MAPSYNC_LOG_SELECTED_TYPE";
/// Environment variable for the recolor strategy
pub const ENV_RECOLOR: &str = "MAPSYNC_RECOLOR";
/// Environment variable for the query timeout in milliseconds
pub const ENV_QUERY_TIMEOUT: &str = "MAPSYNC_QUERY_TIMEOUT_MS";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Sync section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncToml {
    /// Component type whose markers get bandwidth enrichment
    pub enrichment_type: Option<String>,

    /// Outbound call channel capacity
    pub channel_capacity: Option<usize>,

    /// Whether selected-type changes are echoed to the backend log
    pub log_selected_type: Option<bool>,

    /// "recreate" or "restyle"
    pub recolor_strategy: Option<String>,
}

/// Daemon section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonToml {
    /// How long a bandwidth query waits for its reply, in milliseconds
    pub query_timeout_ms: Option<u64>,

    /// Tile source of the headless base layer
    pub tile_url: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsyncToml {
    /// Sync controller section
    pub sync: SyncToml,

    /// Daemon section
    pub daemon: DaemonToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the sync layer and its host
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct MapsyncConfigFile {
    /// Sync controller configuration
    pub sync: SyncConfig,

    /// Bandwidth query timeout
    pub query_timeout: Duration,

    /// Tile source of the headless base layer (`None` = surface default)
    pub tile_url: Option<String>,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for MapsyncConfigFile {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            tile_url: None,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl MapsyncConfigFile {
    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would break the controller at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be greater than zero".to_string(),
            ));
        }
        if self.query_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "query_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/mapsync/mapsync.toml` or
/// `~/.config/mapsync/mapsync.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mapsync").join("mapsync.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<MapsyncConfigFile, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// If `path` is `None`, only defaults and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed or
/// validated.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<MapsyncConfigFile, ConfigError> {
    let mut config = MapsyncConfigFile::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: MapsyncToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    config.validate()?;
    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut MapsyncConfigFile, toml: &MapsyncToml) -> Result<(), ConfigError> {
    if let Some(ref kind) = toml.sync.enrichment_type {
        config.sync.enrichment_type = kind.clone();
    }
    if let Some(capacity) = toml.sync.channel_capacity {
        config.sync.channel_capacity = capacity;
    }
    if let Some(enabled) = toml.sync.log_selected_type {
        config.sync.log_selected_type = enabled;
    }
    if let Some(ref strategy) = toml.sync.recolor_strategy {
        config.sync.recolor_strategy = RecolorStrategy::parse(strategy).ok_or_else(|| {
            ConfigError::ValidationError(format!("unknown recolor_strategy: {strategy}"))
        })?;
    }

    if let Some(ms) = toml.daemon.query_timeout_ms {
        config.query_timeout = Duration::from_millis(ms);
    }
    if toml.daemon.tile_url.is_some() {
        config.tile_url = toml.daemon.tile_url.clone();
    }
    Ok(())
}

/// Apply environment overrides to the sync section
///
/// Unparseable values are skipped. Returns true if any value was applied.
pub(crate) fn apply_sync_env<F>(sync: &mut SyncConfig, lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = false;

    if let Some(kind) = lookup(ENV_ENRICH_TYPE) {
        sync.enrichment_type = kind;
        applied = true;
    }
    if let Some(capacity) = lookup(ENV_CHANNEL_CAPACITY).and_then(|v| v.parse().ok()) {
        sync.channel_capacity = capacity;
        applied = true;
    }
    if let Some(enabled) = lookup(ENV_LOG_SELECTED_TYPE).and_then(|v| parse_flag(&v)) {
        sync.log_selected_type = enabled;
        applied = true;
    }
    if let Some(strategy) = lookup(ENV_RECOLOR).and_then(|v| RecolorStrategy::parse(&v)) {
        sync.recolor_strategy = strategy;
        applied = true;
    }

    applied
}

/// Parse an on/off environment value
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut MapsyncConfigFile, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = apply_sync_env(&mut config.sync, &lookup);

    if let Some(ms) = lookup(ENV_QUERY_TIMEOUT).and_then(|v| v.parse::<u64>().ok()) {
        config.query_timeout = Duration::from_millis(ms);
        applied = true;
    }

    if applied {
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Enrichment type override
    pub enrichment_type: Option<String>,

    /// Recolor strategy override
    pub recolor_strategy: Option<RecolorStrategy>,

    /// Query timeout override (milliseconds)
    pub query_timeout_ms: Option<u64>,

    /// Tile source override
    pub tile_url: Option<String>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set enrichment type override
    #[must_use]
    pub fn with_enrichment_type(mut self, kind: String) -> Self {
        self.enrichment_type = Some(kind);
        self
    }

    /// Set recolor strategy override
    #[must_use]
    pub fn with_recolor_strategy(mut self, strategy: RecolorStrategy) -> Self {
        self.recolor_strategy = Some(strategy);
        self
    }

    /// Set query timeout override
    #[must_use]
    pub fn with_query_timeout_ms(mut self, ms: u64) -> Self {
        self.query_timeout_ms = Some(ms);
        self
    }

    /// Set tile source override
    #[must_use]
    pub fn with_tile_url(mut self, url: String) -> Self {
        self.tile_url = Some(url);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut MapsyncConfigFile) {
        if self.enrichment_type.is_some()
            || self.recolor_strategy.is_some()
            || self.query_timeout_ms.is_some()
            || self.tile_url.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref kind) = self.enrichment_type {
            config.sync.enrichment_type = kind.clone();
        }
        if let Some(strategy) = self.recolor_strategy {
            config.sync.recolor_strategy = strategy;
        }
        if let Some(ms) = self.query_timeout_ms {
            config.query_timeout = Duration::from_millis(ms);
        }
        if let Some(ref url) = self.tile_url {
            config.tile_url = Some(url.clone());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
