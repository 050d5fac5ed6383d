//! Transparent interception for `reqwest-middleware` stacks.
//!
//! Adding [`ProxLockMiddleware`] to a [`reqwest_middleware::ClientWithMiddleware`]
//! rewrites every request for the proxy before it leaves, so existing call
//! sites keep addressing the third-party URL directly.

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use log::debug;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};

use proxlock_common::SessionContext;

use crate::attestation::AttestationProvider;
use crate::request::OutboundRequest;
use crate::transform::RequestTransformer;

/// Middleware that routes each request through the ProxLock proxy.
///
/// Transformation failures abort the request and surface as
/// [`reqwest_middleware::Error::Middleware`] wrapping a
/// [`ProxLockError`](crate::ProxLockError).
#[derive(Clone)]
pub struct ProxLockMiddleware {
    transformer: RequestTransformer,
    session: Arc<SessionContext>,
}

impl ProxLockMiddleware {
    /// Creates middleware sending to the fixed proxy endpoint.
    #[must_use]
    pub fn new(session: SessionContext, attestation: Arc<dyn AttestationProvider>) -> Self {
        Self::from_transformer(RequestTransformer::new(attestation), session)
    }

    /// Uses a preconfigured transformer, e.g. one with a custom endpoint.
    #[must_use]
    pub fn from_transformer(transformer: RequestTransformer, session: SessionContext) -> Self {
        Self {
            transformer,
            session: Arc::new(session),
        }
    }
}

impl std::fmt::Debug for ProxLockMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxLockMiddleware")
            .field("association_id", &self.session.association_id())
            .field("endpoint", &self.transformer.endpoint().as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Middleware for ProxLockMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        debug!("Intercepting {} {}", req.method(), req.url());

        let proxied = self
            .transformer
            .transform(OutboundRequest::from(req), &self.session)
            .await
            .map_err(reqwest_middleware::Error::middleware)?;

        next.run(proxied.into_reqwest(), extensions).await
    }
}
