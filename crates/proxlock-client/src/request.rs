//! Request types on either side of the transformation.

use std::fmt;
use std::time::Duration;

use http::Version;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Method};
use url::Url;

use crate::error::ProxLockError;
use crate::headers;

/// An HTTP request as the application built it, before proxy rewriting.
///
/// URL and method are optional so that incomplete requests can be rejected
/// explicitly by the transformer instead of being silently defaulted.
///
/// # Examples
///
/// ```
/// use proxlock_client::OutboundRequest;
/// use reqwest::Method;
///
/// let request = OutboundRequest::parse(Method::GET, "https://example.com/items?x=1")?
///     .with_header("Authorization", "Bearer %ProxLock_PARTIAL_KEY:pk_abc%")?;
/// assert_eq!(request.url().map(|u| u.as_str()), Some("https://example.com/items?x=1"));
/// # Ok::<(), proxlock_client::ProxLockError>(())
/// ```
#[derive(Default)]
pub struct OutboundRequest {
    url: Option<Url>,
    method: Option<Method>,
    headers: HeaderMap,
    body: Option<Body>,
    timeout: Option<Duration>,
    version: Version,
}

/// An [`OutboundRequest`] taken apart for rewriting.
pub(crate) struct OutboundParts {
    pub url: Option<Url>,
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub timeout: Option<Duration>,
    pub version: Version,
}

impl OutboundRequest {
    /// Creates a request with both URL and method set.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            url: Some(url),
            method: Some(method),
            ..Self::default()
        }
    }

    /// Creates a `GET` request for `url`.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Creates a request from a URL string.
    ///
    /// # Errors
    ///
    /// Returns [`ProxLockError::InvalidRequest`] if `url` does not parse as an
    /// absolute URL.
    pub fn parse(method: Method, url: &str) -> Result<Self, ProxLockError> {
        let url = Url::parse(url)
            .map_err(|e| ProxLockError::InvalidRequest(format!("invalid URL '{url}': {e}")))?;
        Ok(Self::new(method, url))
    }

    /// Creates a request with neither URL nor method.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Adds a header, replacing any existing value with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ProxLockError::InvalidRequest`] if the name or value is not
    /// valid HTTP.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, ProxLockError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProxLockError::InvalidRequest(format!("invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ProxLockError::InvalidRequest(format!("invalid value for header '{name}': {e}"))
        })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a per-request timeout, kept across the proxy rewrite.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the HTTP version used to reach the proxy.
    #[must_use]
    pub const fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// The destination URL, if set.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// The HTTP method, if set.
    #[must_use]
    pub const fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// The request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub const fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The per-request timeout, if set.
    #[must_use]
    pub const fn timeout(&self) -> Option<&Duration> {
        self.timeout.as_ref()
    }

    /// The HTTP version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn into_parts(self) -> OutboundParts {
        OutboundParts {
            url: self.url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
            version: self.version,
        }
    }
}

impl From<reqwest::Request> for OutboundRequest {
    fn from(mut request: reqwest::Request) -> Self {
        let body = request.body_mut().take();
        Self {
            url: Some(request.url().clone()),
            method: Some(request.method().clone()),
            headers: std::mem::take(request.headers_mut()),
            body,
            timeout: request.timeout().copied(),
            version: request.version(),
        }
    }
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("method", &self.method)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("has_body", &self.body.is_some())
            .field("timeout", &self.timeout)
            .field("version", &self.version)
            .finish()
    }
}

/// A request rewritten for the ProxLock proxy.
///
/// Only [`RequestTransformer`](crate::RequestTransformer) creates these, so
/// every `ProxyRequest` carries the full set of identity headers.
pub struct ProxyRequest {
    url: Url,
    method: Method,
    headers: HeaderMap,
    body: Option<Body>,
    timeout: Option<Duration>,
    version: Version,
}

impl ProxyRequest {
    pub(crate) fn new(url: Url, method: Method, headers: HeaderMap, body: Option<Body>) -> Self {
        Self {
            url,
            method,
            headers,
            body,
            timeout: None,
            version: Version::default(),
        }
    }

    /// Carries the caller's timeout and HTTP version over from the original request.
    #[must_use]
    pub(crate) const fn with_transport(
        mut self,
        timeout: Option<Duration>,
        version: Version,
    ) -> Self {
        self.timeout = timeout;
        self.version = version;
        self
    }

    /// The proxy endpoint.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Always `POST`.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// All headers, including the ones passed through from the original request.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The untouched original body.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// The caller's per-request timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<&Duration> {
        self.timeout.as_ref()
    }

    /// The HTTP version of the original request.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Looks up a header value as text. Names match case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The original destination URL.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.header(headers::DESTINATION_HEADER)
    }

    /// The original method, upper-cased.
    #[must_use]
    pub fn destination_method(&self) -> Option<&str> {
        self.header(headers::HTTP_METHOD_HEADER)
    }

    /// The base64 attestation token, if one was produced.
    #[must_use]
    pub fn attestation_token(&self) -> Option<&str> {
        self.header(headers::DEVICE_TOKEN_HEADER)
    }

    /// Converts into a `reqwest::Request` ready to execute.
    #[must_use]
    pub fn into_reqwest(self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method, self.url);
        *request.headers_mut() = self.headers;
        *request.body_mut() = self.body;
        *request.timeout_mut() = self.timeout;
        *request.version_mut() = self.version;
        request
    }
}

impl fmt::Debug for ProxyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRequest")
            .field("url", &self.url.as_str())
            .field("method", &self.method)
            .field("destination", &self.destination())
            .field("destination_method", &self.destination_method())
            .field("has_attestation_token", &self.attestation_token().is_some())
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}
