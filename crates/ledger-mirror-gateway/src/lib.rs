// crates/ledger-mirror-gateway/src/lib.rs
// ============================================================================
// Module: Ledger Mirror Gateway Library
// Description: HTTP gateway to the remote accounting service.
// Purpose: Expose token management, resource clients, and status reporting.
// Dependencies: ledger-mirror-core, reqwest, base64, serde_json
// ============================================================================

//! ## Overview
//! This crate implements the outbound half of the mirror: OAuth2 client
//! credential management, a bounded HTTP client with single-retry token
//! recovery, a static registry describing each remote resource, and the
//! cache-aware [`ResourceClient`] that implements the core
//! [`ResourceGateway`] contract.
//!
//! [`ResourceGateway`]: ledger_mirror_core::ResourceGateway

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod gateway;
pub mod http;
pub mod resource;
pub mod status;
pub mod token;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gateway::CacheTtls;
pub use gateway::ResourceClient;
pub use http::RemoteConfig;
pub use http::RemoteHttpClient;
pub use http::extract_list;
pub use resource::DetailStrategy;
pub use resource::RESOURCES;
pub use resource::ResourceSpec;
pub use resource::resource_spec;
pub use status::GatewayStatus;
pub use status::TokenStatus;
pub use status::token_preview;
pub use token::TokenManager;
pub use token::is_invalid_token_response;
