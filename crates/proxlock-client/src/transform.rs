//! Rewrites outbound requests into ProxLock proxy requests.
//!
//! # Wire format
//!
//! | Header | Value |
//! |---|---|
//! | `ProxLock_DESTINATION` | original URL, absolute |
//! | `ProxLock_VALIDATION_MODE` | `device-check` |
//! | `ProxLock_HTTP_METHOD` | original method, upper-cased |
//! | `ProxLock_ASSOCIATION_ID` | the session's association identifier |
//! | `X-Apple-Device-Token` | base64 attestation token, only when one was produced |
//!
//! The request itself always goes to `POST https://api.proxlock.dev/proxy`.
//! Body and all other headers are passed through untouched.

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use log::debug;
use reqwest::Method;
use url::Url;

use proxlock_common::SessionContext;

use crate::attestation::AttestationProvider;
use crate::error::ProxLockError;
use crate::headers;
use crate::request::{OutboundRequest, ProxyRequest};

/// `ProxLock_DESTINATION`
pub static DESTINATION: HeaderName = HeaderName::from_static("proxlock_destination");
/// `ProxLock_VALIDATION_MODE`
pub static VALIDATION_MODE: HeaderName = HeaderName::from_static("proxlock_validation_mode");
/// `ProxLock_HTTP_METHOD`
pub static HTTP_METHOD: HeaderName = HeaderName::from_static("proxlock_http_method");
/// `ProxLock_ASSOCIATION_ID`
pub static ASSOCIATION_ID: HeaderName = HeaderName::from_static("proxlock_association_id");
/// `X-Apple-Device-Token`
pub static DEVICE_TOKEN: HeaderName = HeaderName::from_static("x-apple-device-token");

/// The fixed ProxLock proxy endpoint.
#[must_use]
pub fn default_endpoint() -> Url {
    Url::parse(headers::PROXY_ENDPOINT)
        .unwrap_or_else(|_| unreachable!("PROXY_ENDPOINT is a valid URL"))
}

/// Rewrites requests for the proxy and attaches attestation.
///
/// The transformer is cheap to clone and safe to share. Concurrent calls are
/// independent and each generates its own attestation token.
///
/// # Examples
///
/// ```
/// use proxlock_client::attestation::BypassAttestation;
/// use proxlock_client::{OutboundRequest, RequestTransformer};
/// use proxlock_common::SessionContext;
/// use reqwest::Method;
/// use secrecy::SecretString;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), proxlock_client::ProxLockError> {
/// let session = SessionContext::new("pk_abc", "assoc_1");
/// let attestation = BypassAttestation::new(Some(SecretString::new("tok".to_string().into())));
/// let transformer = RequestTransformer::new(Arc::new(attestation));
///
/// let request = OutboundRequest::parse(Method::GET, "https://example.com/items?x=1")?;
/// let proxied = transformer.transform(request, &session).await?;
///
/// assert_eq!(proxied.url().as_str(), "https://api.proxlock.dev/proxy");
/// assert_eq!(proxied.method(), Method::POST);
/// assert_eq!(proxied.destination(), Some("https://example.com/items?x=1"));
/// assert_eq!(proxied.attestation_token(), Some("dG9r"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestTransformer {
    attestation: Arc<dyn AttestationProvider>,
    endpoint: Url,
}

impl RequestTransformer {
    /// Creates a transformer targeting the fixed ProxLock endpoint.
    #[must_use]
    pub fn new(attestation: Arc<dyn AttestationProvider>) -> Self {
        Self {
            attestation,
            endpoint: default_endpoint(),
        }
    }

    /// Sends proxy requests to a different endpoint, e.g. a staging proxy.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// The endpoint proxy requests are sent to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Rewrites `request` into a proxy request for `session`.
    ///
    /// The attestation provider is called exactly once, after the request has
    /// been validated and its identity headers encoded. Either a complete
    /// proxy request is returned or nothing is.
    ///
    /// # Errors
    ///
    /// - [`ProxLockError::InvalidRequest`] if the URL or method is missing
    /// - [`ProxLockError::InvalidHeaderValue`] if the association ID cannot be
    ///   sent as a header
    /// - [`ProxLockError::AttestationUnsupported`] or
    ///   [`ProxLockError::AttestationGenerationFailed`] from the provider
    pub async fn transform(
        &self,
        request: OutboundRequest,
        session: &SessionContext,
    ) -> Result<ProxyRequest, ProxLockError> {
        let parts = request.into_parts();
        let mut header_map = parts.headers;

        let destination = parts.url.ok_or_else(|| {
            ProxLockError::InvalidRequest("request has no destination URL".to_string())
        })?;
        let method = parts
            .method
            .ok_or_else(|| ProxLockError::InvalidRequest("request has no HTTP method".to_string()))?;

        let identity = identity_headers(&destination, &method, session)?;

        let token = self.attestation.token().await?;

        for (name, value) in identity {
            header_map.insert(name, value);
        }

        match token {
            Some(token) => {
                let value = header_value(headers::DEVICE_TOKEN_HEADER, &token.to_base64())?;
                header_map.insert(DEVICE_TOKEN.clone(), value);
            }
            None => {
                debug!("No attestation token produced; sending without device token header");
                header_map.remove(&DEVICE_TOKEN);
            }
        }

        debug!(
            "Proxying {} {} via {}",
            method,
            destination.host_str().unwrap_or("<no host>"),
            self.endpoint
        );

        Ok(ProxyRequest::new(
            self.endpoint.clone(),
            Method::POST,
            header_map,
            parts.body,
        )
        .with_transport(parts.timeout, parts.version))
    }
}

impl fmt::Debug for RequestTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTransformer")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

fn identity_headers(
    destination: &Url,
    method: &Method,
    session: &SessionContext,
) -> Result<[(HeaderName, HeaderValue); 4], ProxLockError> {
    Ok([
        (
            DESTINATION.clone(),
            header_value(headers::DESTINATION_HEADER, destination.as_str())?,
        ),
        (
            VALIDATION_MODE.clone(),
            HeaderValue::from_static(headers::VALIDATION_MODE_DEVICE_CHECK),
        ),
        (
            HTTP_METHOD.clone(),
            header_value(
                headers::HTTP_METHOD_HEADER,
                &method.as_str().to_ascii_uppercase(),
            )?,
        ),
        (
            ASSOCIATION_ID.clone(),
            header_value(headers::ASSOCIATION_ID_HEADER, session.association_id())?,
        ),
    ])
}

fn header_value(header: &'static str, value: &str) -> Result<HeaderValue, ProxLockError> {
    HeaderValue::from_str(value).map_err(|source| ProxLockError::InvalidHeaderValue { header, source })
}

/// The header names the transformer owns, in wire order.
#[must_use]
pub fn identity_header_names() -> [&'static HeaderName; 5] {
    [
        &DESTINATION,
        &VALIDATION_MODE,
        &HTTP_METHOD,
        &ASSOCIATION_ID,
        &DEVICE_TOKEN,
    ]
}

/// Returns only the transformer-owned headers of `map`, in wire order.
#[must_use]
pub fn proxlock_headers(map: &HeaderMap) -> Vec<(&'static str, &str)> {
    let canonical = [
        headers::DESTINATION_HEADER,
        headers::VALIDATION_MODE_HEADER,
        headers::HTTP_METHOD_HEADER,
        headers::ASSOCIATION_ID_HEADER,
        headers::DEVICE_TOKEN_HEADER,
    ];

    canonical
        .into_iter()
        .zip(identity_header_names())
        .filter_map(|(label, name)| {
            map.get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| (label, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use reqwest::Body;
    use secrecy::SecretString;

    use super::*;
    use crate::attestation::{
        AttestationToken, BypassAttestation, CompletionHandler, DeviceCheck,
        DeviceCheckAttestation,
    };

    /// Scripted provider that counts calls.
    struct ScriptedProvider {
        outcome: Mutex<Option<Result<Option<AttestationToken>, ProxLockError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(outcome: Result<Option<AttestationToken>, ProxLockError>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(outcome)),
                calls: AtomicUsize::new(0),
            })
        }

        fn returning(bytes: &[u8]) -> Arc<Self> {
            Self::new(Ok(Some(AttestationToken::new(bytes.to_vec()))))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AttestationProvider for ScriptedProvider {
        async fn token(&self) -> Result<Option<AttestationToken>, ProxLockError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(ProxLockError::AttestationUnsupported))
        }
    }

    fn session() -> SessionContext {
        SessionContext::new("pk_abc", "assoc_1")
    }

    fn transformer(provider: Arc<ScriptedProvider>) -> RequestTransformer {
        RequestTransformer::new(provider)
    }

    #[tokio::test]
    async fn test_reference_example() {
        let provider = ScriptedProvider::returning(b"tok");
        let request = OutboundRequest::parse(Method::GET, "https://example.com/items?x=1").unwrap();

        let proxied = transformer(Arc::clone(&provider))
            .transform(request, &session())
            .await
            .unwrap();

        assert_eq!(proxied.url().as_str(), "https://api.proxlock.dev/proxy");
        assert_eq!(proxied.method(), Method::POST);
        assert_eq!(
            proxied.header("ProxLock_DESTINATION"),
            Some("https://example.com/items?x=1")
        );
        assert_eq!(proxied.header("ProxLock_VALIDATION_MODE"), Some("device-check"));
        assert_eq!(proxied.header("ProxLock_HTTP_METHOD"), Some("GET"));
        assert_eq!(proxied.header("ProxLock_ASSOCIATION_ID"), Some("assoc_1"));
        assert_eq!(
            proxied.header("X-Apple-Device-Token"),
            Some(STANDARD.encode("tok").as_str())
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_method_is_upper_cased() {
        let method = Method::from_bytes(b"patch").unwrap();
        let request = OutboundRequest::parse(method, "https://example.com/items/1").unwrap();

        let proxied = transformer(ScriptedProvider::returning(b"tok"))
            .transform(request, &session())
            .await
            .unwrap();

        assert_eq!(proxied.destination_method(), Some("PATCH"));
        assert_eq!(proxied.method(), Method::POST);
    }

    #[tokio::test]
    async fn test_missing_url_rejected_before_attestation() {
        let provider = ScriptedProvider::returning(b"tok");
        let request = OutboundRequest::empty().with_method(Method::GET);

        let result = transformer(Arc::clone(&provider))
            .transform(request, &session())
            .await;

        assert!(matches!(result, Err(ProxLockError::InvalidRequest(_))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_method_rejected_before_attestation() {
        let provider = ScriptedProvider::returning(b"tok");
        let request =
            OutboundRequest::empty().with_url(Url::parse("https://example.com/").unwrap());

        let result = transformer(Arc::clone(&provider))
            .transform(request, &session())
            .await;

        assert!(matches!(result, Err(ProxLockError::InvalidRequest(_))));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_attestation_fails_whole_transform() {
        let provider = ScriptedProvider::new(Err(ProxLockError::AttestationUnsupported));
        let request = OutboundRequest::parse(Method::GET, "https://example.com/").unwrap();

        let result = transformer(provider).transform(request, &session()).await;
        assert!(matches!(result, Err(ProxLockError::AttestationUnsupported)));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let provider =
            ScriptedProvider::new(Err(ProxLockError::generation_failed("service unavailable")));
        let request = OutboundRequest::parse(Method::GET, "https://example.com/").unwrap();

        let err = transformer(provider)
            .transform(request, &session())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxLockError::AttestationGenerationFailed(_)));
        assert!(err.to_string().contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_absent_token_omits_header() {
        let provider = ScriptedProvider::new(Ok(None));
        let request = OutboundRequest::parse(Method::GET, "https://example.com/")
            .unwrap()
            .with_header("X-Apple-Device-Token", "stale")
            .unwrap();

        let proxied = transformer(provider)
            .transform(request, &session())
            .await
            .unwrap();

        assert!(proxied.attestation_token().is_none());
        assert_eq!(proxied.header("ProxLock_ASSOCIATION_ID"), Some("assoc_1"));
    }

    #[tokio::test]
    async fn test_existing_identity_headers_overwritten() {
        let request = OutboundRequest::parse(Method::DELETE, "https://example.com/items/9")
            .unwrap()
            .with_header("ProxLock_DESTINATION", "https://evil.example/")
            .unwrap()
            .with_header("ProxLock_VALIDATION_MODE", "none")
            .unwrap();

        let proxied = transformer(ScriptedProvider::returning(b"tok"))
            .transform(request, &session())
            .await
            .unwrap();

        assert_eq!(
            proxied.headers().get_all("ProxLock_DESTINATION").iter().count(),
            1
        );
        assert_eq!(proxied.destination(), Some("https://example.com/items/9"));
        assert_eq!(proxied.header("ProxLock_VALIDATION_MODE"), Some("device-check"));
    }

    #[tokio::test]
    async fn test_body_and_other_headers_pass_through() {
        let request = OutboundRequest::parse(Method::POST, "https://example.com/items")
            .unwrap()
            .with_header("Authorization", "Bearer %ProxLock_PARTIAL_KEY:pk_abc%")
            .unwrap()
            .with_header("Content-Type", "application/json")
            .unwrap()
            .with_body(Body::from(r#"{"name":"widget"}"#));

        let proxied = transformer(ScriptedProvider::returning(b"tok"))
            .transform(request, &session())
            .await
            .unwrap();

        assert_eq!(
            proxied.header("authorization"),
            Some("Bearer %ProxLock_PARTIAL_KEY:pk_abc%")
        );
        assert_eq!(proxied.header("content-type"), Some("application/json"));
        assert_eq!(
            proxied.body().and_then(Body::as_bytes),
            Some(&br#"{"name":"widget"}"#[..])
        );
    }

    #[tokio::test]
    async fn test_timeout_and_version_pass_through() {
        let request = OutboundRequest::parse(Method::GET, "https://example.com/")
            .unwrap()
            .with_timeout(std::time::Duration::from_secs(2))
            .with_version(http::Version::HTTP_2);

        let proxied = transformer(ScriptedProvider::returning(b"tok"))
            .transform(request, &session())
            .await
            .unwrap();
        assert_eq!(proxied.timeout(), Some(&std::time::Duration::from_secs(2)));
        assert_eq!(proxied.version(), http::Version::HTTP_2);

        let sent = proxied.into_reqwest();
        assert_eq!(sent.timeout(), Some(&std::time::Duration::from_secs(2)));
        assert_eq!(sent.version(), http::Version::HTTP_2);
    }

    #[tokio::test]
    async fn test_invalid_association_id_fails_before_attestation() {
        let provider = ScriptedProvider::returning(b"tok");
        let request = OutboundRequest::parse(Method::GET, "https://example.com/").unwrap();
        let bad_session = SessionContext::new("pk", "assoc\n1");

        let result = transformer(Arc::clone(&provider))
            .transform(request, &bad_session)
            .await;

        assert!(matches!(
            result,
            Err(ProxLockError::InvalidHeaderValue {
                header: "ProxLock_ASSOCIATION_ID",
                ..
            })
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_endpoint() {
        let endpoint = Url::parse("http://127.0.0.1:9999/proxy").unwrap();
        let request = OutboundRequest::parse(Method::GET, "https://example.com/").unwrap();

        let proxied = transformer(ScriptedProvider::returning(b"tok"))
            .with_endpoint(endpoint.clone())
            .transform(request, &session())
            .await
            .unwrap();

        assert_eq!(proxied.url(), &endpoint);
    }

    #[tokio::test]
    async fn test_bypass_strategy_end_to_end() {
        let provider = Arc::new(BypassAttestation::new(Some(SecretString::new(
            "bypass123".to_string().into(),
        ))));
        let request = OutboundRequest::parse(Method::GET, "https://example.com/").unwrap();

        let proxied = RequestTransformer::new(provider)
            .transform(request, &session())
            .await
            .unwrap();

        assert_eq!(proxied.attestation_token(), Some(STANDARD.encode("bypass123").as_str()));
    }

    #[tokio::test]
    async fn test_bypass_strategy_unconfigured() {
        let provider = Arc::new(BypassAttestation::new(None));
        let request = OutboundRequest::parse(Method::GET, "https://example.com/").unwrap();

        let result = RequestTransformer::new(provider)
            .transform(request, &session())
            .await;

        assert!(matches!(result, Err(ProxLockError::AttestationUnsupported)));
    }

    #[tokio::test]
    async fn test_concurrent_transforms_use_separate_ceremonies() {
        struct Counter(AtomicUsize);

        impl DeviceCheck for Counter {
            fn is_supported(&self) -> bool {
                true
            }

            fn generate_token(&self, completion: CompletionHandler) {
                let n = self.0.fetch_add(1, Ordering::SeqCst);
                std::thread::spawn(move || {
                    completion.succeed(format!("tok-{n}").into_bytes());
                });
            }
        }

        let device = Arc::new(Counter(AtomicUsize::new(0)));
        let transformer = RequestTransformer::new(Arc::new(DeviceCheckAttestation::new(
            Arc::clone(&device),
        )));
        let session = session();

        let first = transformer.transform(
            OutboundRequest::parse(Method::GET, "https://example.com/a").unwrap(),
            &session,
        );
        let second = transformer.transform(
            OutboundRequest::parse(Method::GET, "https://example.com/b").unwrap(),
            &session,
        );
        let (first, second) = tokio::join!(first, second);

        let first = first.unwrap();
        let second = second.unwrap();
        assert_ne!(first.attestation_token(), second.attestation_token());
        assert_eq!(device.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_header_names_match_canonical_spelling() {
        let canonical = [
            headers::DESTINATION_HEADER,
            headers::VALIDATION_MODE_HEADER,
            headers::HTTP_METHOD_HEADER,
            headers::ASSOCIATION_ID_HEADER,
            headers::DEVICE_TOKEN_HEADER,
        ];
        for (expected, name) in canonical.into_iter().zip(identity_header_names()) {
            assert_eq!(HeaderName::from_bytes(expected.as_bytes()).unwrap(), *name);
        }
    }

    #[test]
    fn test_proxlock_headers_in_wire_order() {
        let mut map = HeaderMap::new();
        map.insert(ASSOCIATION_ID.clone(), HeaderValue::from_static("assoc_1"));
        map.insert("content-type", HeaderValue::from_static("text/plain"));
        map.insert(DESTINATION.clone(), HeaderValue::from_static("https://example.com/"));

        assert_eq!(
            proxlock_headers(&map),
            vec![
                ("ProxLock_DESTINATION", "https://example.com/"),
                ("ProxLock_ASSOCIATION_ID", "assoc_1"),
            ]
        );
    }
}

#[cfg(test)]
mod proptests {
    #![allow(clippy::unwrap_used)]

    use proptest::prelude::*;
    use secrecy::SecretString;

    use super::*;
    use crate::attestation::BypassAttestation;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn destination_and_method_round_trip(
            path in "[a-z0-9]{0,12}(/[a-z0-9]{1,8}){0,3}",
            query in proptest::option::of("[a-z]{1,6}=[a-z0-9]{1,6}"),
            method in prop::sample::select(vec!["GET", "get", "Post", "PUT", "delete", "PATCH", "head", "OPTIONS"]),
        ) {
            let raw = query.map_or_else(
                || format!("https://example.com/{path}"),
                |q| format!("https://example.com/{path}?{q}"),
            );
            let url = Url::parse(&raw).unwrap();
            let method = Method::from_bytes(method.as_bytes()).unwrap();

            let transformer = RequestTransformer::new(Arc::new(BypassAttestation::new(Some(
                SecretString::new("tok".to_string().into()),
            ))));
            let session = SessionContext::new("pk", "assoc");
            let proxied = runtime()
                .block_on(transformer.transform(OutboundRequest::new(method.clone(), url.clone()), &session))
                .unwrap();

            let expected_method = method.as_str().to_ascii_uppercase();
            prop_assert_eq!(proxied.url().as_str(), headers::PROXY_ENDPOINT);
            prop_assert_eq!(proxied.method(), Method::POST);
            prop_assert_eq!(proxied.destination(), Some(url.as_str()));
            prop_assert_eq!(proxied.destination_method(), Some(expected_method.as_str()));
            prop_assert_eq!(proxied.header(headers::VALIDATION_MODE_HEADER), Some("device-check"));
        }
    }
}
