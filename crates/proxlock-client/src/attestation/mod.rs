//! Device attestation for outbound requests.
//!
//! Each transformed request carries one freshly generated attestation token.
//! Two strategies exist, chosen once when the client is built:
//!
//! - [`DeviceCheckAttestation`] on real hardware, driving the platform's
//!   callback-based generator through [`bridge::await_completion`]
//! - [`BypassAttestation`] in simulators, emulators and CI, sending a
//!   developer-supplied value instead
//!
//! ```text
//! ExecutionEnvironment::Device     → DeviceCheckAttestation → platform ceremony
//! ExecutionEnvironment::Restricted → BypassAttestation      → bypass value
//! ```
//!
//! Tokens are never cached. The platform treats every token as single-use.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;

use proxlock_common::ExecutionEnvironment;

use crate::error::ProxLockError;

pub mod bridge;
mod bypass;
mod device;

pub use bridge::CompletionHandler;
pub use bypass::BypassAttestation;
pub use device::{DeviceCheck, DeviceCheckAttestation, UnavailableDeviceCheck};

/// An opaque, single-use device attestation token.
#[derive(Clone, PartialEq, Eq)]
pub struct AttestationToken(Vec<u8>);

impl AttestationToken {
    /// Wraps raw token bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw token bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Standard base64 with padding, the form the proxy expects.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl fmt::Debug for AttestationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttestationToken")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// Produces zero or one attestation token per call.
///
/// Implementations hold no state between calls. `Ok(None)` means the platform
/// produced no token without reporting an error; the request is then sent
/// without the token header.
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Generates a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`ProxLockError::AttestationUnsupported`] if attestation is not
    /// available, or [`ProxLockError::AttestationGenerationFailed`] if the
    /// platform reported an error.
    async fn token(&self) -> Result<Option<AttestationToken>, ProxLockError>;
}

#[async_trait]
impl<P: AttestationProvider + ?Sized> AttestationProvider for Arc<P> {
    async fn token(&self) -> Result<Option<AttestationToken>, ProxLockError> {
        (**self).token().await
    }
}

/// Picks the attestation strategy for an execution environment.
///
/// On a device the platform primitive is used and `bypass` is ignored. In a
/// restricted environment the platform is never touched.
pub fn select_provider<D>(
    environment: ExecutionEnvironment,
    device: D,
    bypass: Option<SecretString>,
) -> Arc<dyn AttestationProvider>
where
    D: DeviceCheck + 'static,
{
    match environment {
        ExecutionEnvironment::Device => Arc::new(DeviceCheckAttestation::new(device)),
        ExecutionEnvironment::Restricted => Arc::new(BypassAttestation::new(bypass)),
    }
}
