//! HTTP client that sends every request through the ProxLock proxy.

use std::sync::Arc;

use reqwest::{Client, Method, Response};
use url::Url;

use proxlock_common::{HttpSettings, SessionContext};

use crate::attestation::AttestationProvider;
use crate::error::ProxLockError;
use crate::request::{OutboundRequest, ProxyRequest};
use crate::transform::RequestTransformer;

/// Sends requests to third-party APIs via the ProxLock proxy.
///
/// Use one client per API key. Requests carry the bearer-token placeholder
/// wherever the real secret would go; the proxy substitutes it after checking
/// the attached attestation token.
///
/// The client is cheaply cloneable and can be shared across tasks. It never
/// retries and never inspects responses.
///
/// # Examples
///
/// ```no_run
/// use proxlock_client::ProxLockClient;
/// use proxlock_client::attestation::BypassAttestation;
/// use proxlock_common::{HttpSettings, SessionContext};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), proxlock_client::ProxLockError> {
/// let session = SessionContext::new("pk_abc", "assoc_1");
/// let client = ProxLockClient::new(
///     session,
///     Arc::new(BypassAttestation::from_env()),
///     &HttpSettings::default(),
/// )?;
///
/// let response = client.get("https://api.example.com/v1/items").await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ProxLockClient {
    inner: Client,
    transformer: RequestTransformer,
    session: Arc<SessionContext>,
}

impl ProxLockClient {
    /// Creates a client from HTTP settings.
    ///
    /// # Errors
    ///
    /// Returns [`ProxLockError::Configuration`] if the endpoint is invalid, or
    /// [`ProxLockError::Network`] if the HTTP client fails to build.
    pub fn new(
        session: SessionContext,
        attestation: Arc<dyn AttestationProvider>,
        settings: &HttpSettings,
    ) -> Result<Self, ProxLockError> {
        settings
            .validate()
            .map_err(|e| ProxLockError::Configuration(e.to_string()))?;
        let endpoint = settings
            .endpoint_url()
            .map_err(|e| ProxLockError::Configuration(e.to_string()))?;

        let inner = Client::builder()
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.timeout())
            .build()?;

        Ok(Self::with_client(inner, session, attestation).with_endpoint(endpoint))
    }

    /// Creates a client with the default [`HttpSettings`]: the fixed endpoint,
    /// 30 second connect timeout and 60 second total timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn with_defaults(
        session: SessionContext,
        attestation: Arc<dyn AttestationProvider>,
    ) -> Result<Self, ProxLockError> {
        Self::new(session, attestation, &HttpSettings::default())
    }

    /// Wraps an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(
        inner: Client,
        session: SessionContext,
        attestation: Arc<dyn AttestationProvider>,
    ) -> Self {
        Self {
            inner,
            transformer: RequestTransformer::new(attestation),
            session: Arc::new(session),
        }
    }

    /// Overrides the proxy endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.transformer = self.transformer.with_endpoint(endpoint);
        self
    }

    /// The session this client sends for.
    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The transformer used for every request.
    #[must_use]
    pub const fn transformer(&self) -> &RequestTransformer {
        &self.transformer
    }

    /// The placeholder the proxy replaces with the real bearer token.
    #[must_use]
    pub fn bearer_token(&self) -> String {
        self.session.bearer_token_placeholder()
    }

    /// Rewrites a request for the proxy without sending it.
    ///
    /// Authorization headers are not added. Use [`bearer_token`](Self::bearer_token)
    /// wherever the real token belongs.
    ///
    /// # Errors
    ///
    /// See [`RequestTransformer::transform`].
    pub async fn process(&self, request: OutboundRequest) -> Result<ProxyRequest, ProxLockError> {
        self.transformer.transform(request, &self.session).await
    }

    /// Rewrites a request and sends it through the proxy.
    ///
    /// # Errors
    ///
    /// Returns transformation errors, or [`ProxLockError::Network`] if sending
    /// fails. Non-success HTTP statuses are returned as responses.
    pub async fn send(&self, request: OutboundRequest) -> Result<Response, ProxLockError> {
        let proxied = self.process(request).await?;
        Ok(self.inner.execute(proxied.into_reqwest()).await?)
    }

    /// Sends a `GET` for `url` through the proxy.
    ///
    /// # Errors
    ///
    /// Returns [`ProxLockError::InvalidRequest`] if `url` does not parse, or
    /// any error from [`send`](Self::send).
    pub async fn get(&self, url: &str) -> Result<Response, ProxLockError> {
        self.send(OutboundRequest::parse(Method::GET, url)?).await
    }
}

impl std::fmt::Debug for ProxLockClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxLockClient")
            .field("association_id", &self.session.association_id())
            .field("endpoint", &self.transformer.endpoint().as_str())
            .finish_non_exhaustive()
    }
}
