// crates/ledger-mirror-config/tests/config_validation.rs
// ============================================================================
// Module: Configuration Validation Tests
// Description: Load and validation behavior for mirror configuration.
// Purpose: Verify fail-closed parsing and per-section validation rules.
// Dependencies: ledger-mirror-config, tempfile
// ============================================================================

//! ## Overview
//! Exercises configuration loading from disk and the validation rules that
//! gate startup: mandatory remote credentials in unrestricted mode, redis
//! backend requirements, and ingest bind address checks.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Panic-based assertions are permitted in tests."
)]

use std::fs;

use ledger_mirror_config::CacheBackend;
use ledger_mirror_config::ConfigError;
use ledger_mirror_config::LedgerMirrorConfig;
use ledger_mirror_core::RuntimeMode;
use tempfile::TempDir;

/// Writes a config file and loads it through the normal path.
fn load_from(content: &str) -> Result<LedgerMirrorConfig, ConfigError> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger-mirror.toml");
    fs::write(&path, content).unwrap();
    LedgerMirrorConfig::load(Some(&path))
}

#[test]
fn an_empty_file_yields_restricted_defaults() {
    let config = load_from("").unwrap();
    assert_eq!(config.mode(), RuntimeMode::Restricted);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert!(config.store.is_none());
    assert!(config.ingest.enabled);
}

#[test]
fn restricted_mode_accepts_missing_remote_credentials() {
    let config = load_from(
        r#"
        [runtime]
        mode = "restricted"
        "#,
    )
    .unwrap();
    assert!(config.remote.client_id.is_empty());
}

#[test]
fn unrestricted_mode_requires_remote_credentials() {
    let result = load_from(
        r#"
        [runtime]
        mode = "unrestricted"

        [remote]
        base_url = "https://remote.example/api"
        token_endpoint = "https://remote.example/oauth/token"
        client_id = "mirror"
        client_secret = ""
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("client_secret")));
}

#[test]
fn unrestricted_mode_rejects_non_http_urls() {
    let result = load_from(
        r#"
        [runtime]
        mode = "unrestricted"

        [remote]
        base_url = "ftp://remote.example/api"
        token_endpoint = "https://remote.example/oauth/token"
        client_id = "mirror"
        client_secret = "secret"
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("base_url")));
}

#[test]
fn the_redis_backend_requires_a_url() {
    let result = load_from(
        r#"
        [cache]
        backend = "redis"
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("redis_url")));

    let config = load_from(
        r#"
        [cache]
        backend = "redis"
        redis_url = "redis://127.0.0.1:6379/0"
        "#,
    )
    .unwrap();
    assert_eq!(config.cache.backend, CacheBackend::Redis);
}

#[test]
fn cache_ttls_flow_into_the_gateway_shape() {
    let config = load_from(
        r#"
        [cache]
        list_ttl_seconds = 60
        item_ttl_seconds = 0
        "#,
    )
    .unwrap();
    let ttls = config.cache.ttls();
    assert_eq!(ttls.list_seconds, 60);
    assert_eq!(ttls.item_seconds, 0);
}

#[test]
fn per_resource_ttls_override_the_defaults() {
    let config = load_from(
        r#"
        [cache]
        list_ttl_seconds = 300
        item_ttl_seconds = 300

        [cache.resource_ttls.product]
        list_ttl_seconds = 30

        [cache.resource_ttls.currency]
        list_ttl_seconds = 3600
        item_ttl_seconds = 3600
        "#,
    )
    .unwrap();
    let product = config.cache.ttls_for("product");
    assert_eq!(product.list_seconds, 30);
    assert_eq!(product.item_seconds, 300);
    let currency = config.cache.ttls_for("currency");
    assert_eq!(currency.list_seconds, 3600);
    let customer = config.cache.ttls_for("customer");
    assert_eq!(customer.list_seconds, 300);
}

#[test]
fn unknown_resource_ttl_labels_are_rejected() {
    let result = load_from(
        r#"
        [cache.resource_ttls.invoice]
        list_ttl_seconds = 30
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("invoice")));
}

#[test]
fn invalid_ingest_bind_addresses_are_rejected() {
    let result = load_from(
        r#"
        [ingest]
        bind = "not-an-address"
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("ingest.bind")));
}

#[test]
fn a_disabled_ingest_boundary_skips_bind_validation() {
    let config = load_from(
        r#"
        [ingest]
        enabled = false
        bind = "not-an-address"
        "#,
    )
    .unwrap();
    assert!(!config.ingest.enabled);
}

#[test]
fn ingest_limits_flow_into_the_pipeline_shape() {
    let config = load_from(
        r#"
        [ingest]
        max_body_bytes = 1024
        rate_limit_max_requests = 5
        rate_limit_window_seconds = 10
        buffer_capacity = 50
        "#,
    )
    .unwrap();
    let limits = config.ingest.limits();
    assert_eq!(limits.max_body_bytes, 1024);
    assert_eq!(limits.max_requests, 5);
    assert_eq!(limits.window_seconds, 10);
    assert_eq!(limits.buffer_capacity, 50);
}

#[test]
fn zero_ingest_limits_are_rejected() {
    let result = load_from(
        r#"
        [ingest]
        buffer_capacity = 0
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("buffer_capacity")));
}

#[test]
fn store_sections_reject_zero_busy_timeouts() {
    let result = load_from(
        r#"
        [store]
        path = "mirror.db"
        busy_timeout_ms = 0
        "#,
    );
    assert!(matches!(result, Err(ConfigError::Invalid(message)) if message.contains("busy_timeout_ms")));
}

#[test]
fn unparseable_toml_fails_closed() {
    let result = load_from("[runtime\nmode = ");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn missing_files_surface_io_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let result = LedgerMirrorConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
