//! # proxlock-common
//!
//! Shared types for ProxLock clients.
//!
//! ProxLock lets an application call third-party APIs without shipping the
//! real bearer token. Requests are rewritten to the ProxLock proxy, which
//! checks a device attestation token and swaps a placeholder for the real
//! secret before forwarding to the destination.
//!
//! This crate holds the parts that carry no HTTP machinery:
//! - [`SessionContext`], the per-integration identity
//! - [`headers`], the endpoint, header names and placeholder format
//! - [`config`], TOML configuration for clients and tools
//!
//! ## Example
//!
//! ```
//! use proxlock_common::SessionContext;
//!
//! let session = SessionContext::new("pk_abc", "assoc_1");
//! let authorization = format!("Bearer {}", session.bearer_token_placeholder());
//! assert_eq!(authorization, "Bearer %ProxLock_PARTIAL_KEY:pk_abc%");
//! ```

/// Client configuration loaded from TOML.
pub mod config;
/// Proxy endpoint, header names and the bearer-token placeholder format.
pub mod headers;
mod session;

pub use config::{
    AttestationSettings, ConfigError, ExecutionEnvironment, HttpSettings, ProxLockConfig,
};
pub use session::SessionContext;
