//! # proxlock-client
//!
//! Client library that routes third-party API requests through the ProxLock
//! proxy so API secrets never ship inside an application.
//!
//! Every request is rewritten into a `POST` to the proxy endpoint carrying the
//! original destination, method, the caller's association id and a fresh
//! device attestation token. The proxy verifies the token, substitutes the
//! real bearer token for the placeholder and forwards the call.
//!
//! Three entry points share one [`RequestTransformer`]:
//!
//! - [`ProxLockClient`] sends requests directly
//! - [`ProxLockMiddleware`] intercepts requests in a `reqwest-middleware` stack
//! - [`RequestTransformer::transform`] rewrites without sending
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use proxlock_client::{OutboundRequest, ProxLockClient};
//! use proxlock_client::attestation::{UnavailableDeviceCheck, select_provider};
//! use proxlock_common::{ExecutionEnvironment, HttpSettings, SessionContext};
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), proxlock_client::ProxLockError> {
//! let session = SessionContext::new("pk_abc", "assoc_1");
//! let attestation = select_provider(
//!     ExecutionEnvironment::Restricted,
//!     UnavailableDeviceCheck,
//!     std::env::var("PROXLOCK_DEVICE_CHECK_BYPASS").ok().map(Into::into),
//! );
//! let client = ProxLockClient::new(session, attestation, &HttpSettings::default())?;
//!
//! let request = OutboundRequest::parse(Method::POST, "https://api.example.com/v1/chat")?
//!     .with_header("Authorization", &format!("Bearer {}", client.bearer_token()))?
//!     .with_body(r#"{"prompt":"hi"}"#);
//! let response = client.send(request).await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

pub mod attestation;
pub mod error;
pub mod request;
pub mod transform;

mod client;
mod middleware;

pub use proxlock_common::headers;

pub use attestation::{AttestationProvider, AttestationToken, select_provider};
pub use client::ProxLockClient;
pub use error::{BoxError, ProxLockError};
pub use middleware::ProxLockMiddleware;
pub use request::{OutboundRequest, ProxyRequest};
pub use transform::RequestTransformer;
