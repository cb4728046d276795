// crates/ledger-mirror-config/src/config.rs
// ============================================================================
// Module: Ledger Mirror Configuration
// Description: Configuration loading and validation for the mirror service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ledger-mirror-core, ledger-mirror-gateway, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Remote credentials are mandatory in unrestricted mode and optional in
//! restricted mode, where the mirror never calls the remote service. A redis
//! cache backend requires a connection URL; the memory backend needs nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use ledger_mirror_core::RuntimeMode;
use ledger_mirror_gateway::CacheTtls;
use ledger_mirror_gateway::RemoteConfig;
use ledger_mirror_gateway::resource_spec;
use ledger_mirror_ingest::IngestLimits;
use ledger_mirror_store_sqlite::SqliteStoreConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "ledger-mirror.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "LEDGER_MIRROR_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default ingest bind address.
const DEFAULT_INGEST_BIND: &str = "127.0.0.1:8081";
/// Default cache key prefix.
const DEFAULT_CACHE_PREFIX: &str = "ledger-mirror";
/// Default cache time-to-live in seconds.
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level mirror service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerMirrorConfig {
    /// Remote accounting service connection settings.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Cache backend configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Local mirror store configuration; absent means in-memory only.
    #[serde(default)]
    pub store: Option<SqliteStoreConfig>,
    /// Runtime mode configuration.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Telemetry ingest boundary configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl LedgerMirrorConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_remote(&self.remote, self.runtime.mode)?;
        self.cache.validate()?;
        if let Some(store) = &self.store {
            validate_store(store)?;
        }
        self.ingest.validate()?;
        Ok(())
    }

    /// Returns the configured runtime mode.
    #[must_use]
    pub const fn mode(&self) -> RuntimeMode {
        self.runtime.mode
    }
}

impl Default for LedgerMirrorConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            cache: CacheConfig::default(),
            store: None,
            runtime: RuntimeConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// Process-local in-memory cache.
    #[default]
    Memory,
    /// Shared redis cache.
    Redis,
}

/// Per-resource TTL override; unset fields fall back to the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TtlOverride {
    /// Override for cached collection listings, in seconds.
    pub list_ttl_seconds: Option<u64>,
    /// Override for cached single records, in seconds.
    pub item_ttl_seconds: Option<u64>,
}

/// Cache layer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Which backend to use.
    pub backend: CacheBackend,
    /// Redis connection URL, required for the redis backend.
    pub redis_url: Option<String>,
    /// Key prefix scoping this deployment's entries.
    pub prefix: String,
    /// Default time-to-live for cached collection listings, in seconds.
    pub list_ttl_seconds: u64,
    /// Default time-to-live for cached single records, in seconds.
    pub item_ttl_seconds: u64,
    /// Per-resource TTL overrides keyed by resource label.
    pub resource_ttls: BTreeMap<String, TtlOverride>,
}

impl CacheConfig {
    /// Validates backend selection and its requirements.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("cache.prefix must be non-empty".to_string()));
        }
        if self.backend == CacheBackend::Redis {
            let url = self.redis_url.as_deref().unwrap_or("").trim();
            if url.is_empty() {
                return Err(ConfigError::Invalid(
                    "cache.redis_url is required for the redis backend".to_string(),
                ));
            }
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ConfigError::Invalid(
                    "cache.redis_url must use the redis:// or rediss:// scheme".to_string(),
                ));
            }
        }
        for label in self.resource_ttls.keys() {
            if resource_spec(label).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "cache.resource_ttls names an unknown resource: {label}"
                )));
            }
        }
        Ok(())
    }

    /// Returns the default time-to-live pair.
    #[must_use]
    pub const fn ttls(&self) -> CacheTtls {
        CacheTtls {
            list_seconds: self.list_ttl_seconds,
            item_seconds: self.item_ttl_seconds,
        }
    }

    /// Returns the effective time-to-live pair for one resource.
    #[must_use]
    pub fn ttls_for(&self, label: &str) -> CacheTtls {
        let defaults = self.ttls();
        self.resource_ttls.get(label).map_or(defaults, |over| CacheTtls {
            list_seconds: over.list_ttl_seconds.unwrap_or(defaults.list_seconds),
            item_seconds: over.item_ttl_seconds.unwrap_or(defaults.item_seconds),
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            prefix: DEFAULT_CACHE_PREFIX.to_string(),
            list_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            item_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            resource_ttls: BTreeMap::new(),
        }
    }
}

/// Runtime mode configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Effective runtime mode; restricted unless stated otherwise.
    pub mode: RuntimeMode,
}

/// Telemetry ingest boundary configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Whether the ingest boundary is served at all.
    pub enabled: bool,
    /// Bind address for the ingest listener.
    pub bind: String,
    /// Maximum accepted request body size, in bytes.
    pub max_body_bytes: usize,
    /// Maximum requests per client per rate window.
    pub rate_limit_max_requests: usize,
    /// Rate window length, in seconds.
    pub rate_limit_window_seconds: i64,
    /// Maximum events retained in the ring buffer.
    pub buffer_capacity: usize,
}

impl IngestConfig {
    /// Validates the bind address and limit ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }
        if self.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "ingest.bind is not a valid socket address: {}",
                self.bind
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("ingest.max_body_bytes must be positive".to_string()));
        }
        if self.rate_limit_max_requests == 0 {
            return Err(ConfigError::Invalid(
                "ingest.rate_limit_max_requests must be positive".to_string(),
            ));
        }
        if self.rate_limit_window_seconds <= 0 {
            return Err(ConfigError::Invalid(
                "ingest.rate_limit_window_seconds must be positive".to_string(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "ingest.buffer_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the configured pipeline limits.
    #[must_use]
    pub const fn limits(&self) -> IngestLimits {
        IngestLimits {
            max_body_bytes: self.max_body_bytes,
            max_requests: self.rate_limit_max_requests,
            window_seconds: self.rate_limit_window_seconds,
            buffer_capacity: self.buffer_capacity,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        let limits = IngestLimits::default();
        Self {
            enabled: true,
            bind: DEFAULT_INGEST_BIND.to_string(),
            max_body_bytes: limits.max_body_bytes,
            rate_limit_max_requests: limits.max_requests,
            rate_limit_window_seconds: limits.window_seconds,
            buffer_capacity: limits.buffer_capacity,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates remote settings; credentials are mandatory in unrestricted mode.
fn validate_remote(remote: &RemoteConfig, mode: RuntimeMode) -> Result<(), ConfigError> {
    if mode.is_restricted() {
        // Restricted mode never talks to the remote service.
        return Ok(());
    }
    validate_http_url("remote.base_url", &remote.base_url)?;
    validate_http_url("remote.token_endpoint", &remote.token_endpoint)?;
    if remote.client_id.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.client_id must be non-empty".to_string()));
    }
    if remote.client_secret.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.client_secret must be non-empty".to_string()));
    }
    if remote.timeout_ms == 0 {
        return Err(ConfigError::Invalid("remote.timeout_ms must be positive".to_string()));
    }
    if remote.max_response_bytes == 0 {
        return Err(ConfigError::Invalid(
            "remote.max_response_bytes must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Validates that a URL field is non-empty and uses an HTTP scheme.
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Invalid(format!(
            "{field} must use the http:// or https:// scheme"
        )));
    }
    Ok(())
}

/// Validates the store section path limits.
fn validate_store(store: &SqliteStoreConfig) -> Result<(), ConfigError> {
    let text = store.path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("store.path must be non-empty".to_string()));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("store.path exceeds max length".to_string()));
    }
    for component in store.path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("store.path component too long".to_string()));
        }
    }
    if store.busy_timeout_ms == 0 {
        return Err(ConfigError::Invalid("store.busy_timeout_ms must be positive".to_string()));
    }
    Ok(())
}
