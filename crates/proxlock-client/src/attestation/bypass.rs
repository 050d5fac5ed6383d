use async_trait::async_trait;
use log::debug;
use secrecy::{ExposeSecret, SecretString};

use super::{AttestationProvider, AttestationToken};
use crate::error::ProxLockError;
use crate::headers::DEVICE_CHECK_BYPASS_ENV;

/// Restricted-environment attestation strategy.
///
/// Simulators, emulators and CI hosts have no attestation hardware. Instead a
/// developer-supplied bypass value is sent in place of a real token, which the
/// proxy accepts only for integrations configured to allow it.
///
/// The value is injected at construction rather than read on every call.
///
/// # Examples
///
/// ```
/// use proxlock_client::attestation::{AttestationProvider, BypassAttestation};
/// use secrecy::SecretString;
///
/// # async fn example() -> Result<(), proxlock_client::ProxLockError> {
/// let provider = BypassAttestation::new(Some(SecretString::new("bypass123".to_string().into())));
/// let token = provider.token().await?.expect("bypass configured");
/// assert_eq!(token.to_base64(), "YnlwYXNzMTIz");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BypassAttestation {
    bypass: Option<SecretString>,
}

impl BypassAttestation {
    /// Creates the strategy with an optional bypass value.
    #[must_use]
    pub const fn new(bypass: Option<SecretString>) -> Self {
        Self { bypass }
    }

    /// Reads the bypass value from `PROXLOCK_DEVICE_CHECK_BYPASS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_var(DEVICE_CHECK_BYPASS_ENV)
    }

    /// Reads the bypass value from the named environment variable.
    ///
    /// A missing or non-UTF-8 variable leaves the strategy unconfigured.
    #[must_use]
    pub fn from_env_var(name: &str) -> Self {
        let bypass = std::env::var(name).ok().map(SecretString::from);
        if bypass.is_none() {
            debug!("No attestation bypass value in ${name}");
        }
        Self::new(bypass)
    }

    /// Whether a bypass value is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.bypass.is_some()
    }
}

#[async_trait]
impl AttestationProvider for BypassAttestation {
    async fn token(&self) -> Result<Option<AttestationToken>, ProxLockError> {
        let bypass = self
            .bypass
            .as_ref()
            .ok_or(ProxLockError::AttestationUnsupported)?;

        Ok(Some(AttestationToken::new(
            bypass.expose_secret().as_bytes().to_vec(),
        )))
    }
}
