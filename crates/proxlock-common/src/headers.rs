//! Wire constants shared by everything that speaks to the ProxLock proxy.
//!
//! Header names are listed in their canonical spelling. HTTP treats header
//! names case-insensitively, and most Rust HTTP stacks store them lower-cased.

/// The proxy endpoint every transformed request is sent to.
pub const PROXY_ENDPOINT: &str = "https://api.proxlock.dev/proxy";

/// The HTTP method used for every request to the proxy.
pub const PROXY_METHOD: &str = "POST";

/// Original destination URL, in absolute form.
pub const DESTINATION_HEADER: &str = "ProxLock_DESTINATION";

/// Validation strategy the proxy should apply.
pub const VALIDATION_MODE_HEADER: &str = "ProxLock_VALIDATION_MODE";

/// Original HTTP method, upper-cased.
pub const HTTP_METHOD_HEADER: &str = "ProxLock_HTTP_METHOD";

/// Association identifier selecting the stored credential.
pub const ASSOCIATION_ID_HEADER: &str = "ProxLock_ASSOCIATION_ID";

/// Base64-encoded device attestation token.
pub const DEVICE_TOKEN_HEADER: &str = "X-Apple-Device-Token";

/// The only validation mode this client emits.
pub const VALIDATION_MODE_DEVICE_CHECK: &str = "device-check";

/// Environment variable carrying a developer-supplied attestation bypass value.
///
/// Only consulted where attestation hardware is unavailable (simulators,
/// emulators, CI hosts).
pub const DEVICE_CHECK_BYPASS_ENV: &str = "PROXLOCK_DEVICE_CHECK_BYPASS";

const PLACEHOLDER_PREFIX: &str = "%ProxLock_PARTIAL_KEY:";
const PLACEHOLDER_SUFFIX: &str = "%";

/// Builds the bearer-token placeholder for a partial key.
///
/// The proxy replaces this sentinel with the real credential. It is never
/// resolved on the client.
///
/// # Examples
///
/// ```
/// use proxlock_common::headers::bearer_token_placeholder;
///
/// assert_eq!(bearer_token_placeholder("pk_abc"), "%ProxLock_PARTIAL_KEY:pk_abc%");
/// ```
#[must_use]
pub fn bearer_token_placeholder(partial_key: &str) -> String {
    format!("{PLACEHOLDER_PREFIX}{partial_key}{PLACEHOLDER_SUFFIX}")
}

/// The identity and metadata headers the transformer always writes.
pub const IDENTITY_HEADERS: [&str; 4] = [
    DESTINATION_HEADER,
    VALIDATION_MODE_HEADER,
    HTTP_METHOD_HEADER,
    ASSOCIATION_ID_HEADER,
];
