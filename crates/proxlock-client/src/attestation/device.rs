use async_trait::async_trait;
use log::debug;

use super::bridge::{CompletionHandler, await_completion};
use super::{AttestationProvider, AttestationToken};
use crate::error::ProxLockError;

/// The platform's device attestation primitive.
///
/// Implement this over the host's attestation service (for example Apple's
/// DeviceCheck through FFI). `generate_token` starts one ceremony and must
/// eventually call the handler, from any thread.
pub trait DeviceCheck: Send + Sync {
    /// Whether this device can produce attestation tokens at all.
    fn is_supported(&self) -> bool;

    /// Starts generating one token and reports through `completion`.
    fn generate_token(&self, completion: CompletionHandler);
}

impl<D: DeviceCheck + ?Sized> DeviceCheck for std::sync::Arc<D> {
    fn is_supported(&self) -> bool {
        (**self).is_supported()
    }

    fn generate_token(&self, completion: CompletionHandler) {
        (**self).generate_token(completion);
    }
}

/// A [`DeviceCheck`] for hosts with no attestation hardware.
///
/// Always reports unsupported, so a device-mode provider built on it fails
/// with [`ProxLockError::AttestationUnsupported`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDeviceCheck;

impl DeviceCheck for UnavailableDeviceCheck {
    fn is_supported(&self) -> bool {
        false
    }

    fn generate_token(&self, completion: CompletionHandler) {
        completion.fail("device attestation is not available on this host");
    }
}

/// Real-device attestation strategy.
///
/// Checks the capability flag, then runs exactly one platform ceremony per
/// call. There is no retry and no timeout here; the platform's own error
/// reporting is authoritative.
#[derive(Debug, Clone)]
pub struct DeviceCheckAttestation<D> {
    device: D,
}

impl<D: DeviceCheck> DeviceCheckAttestation<D> {
    /// Wraps a platform attestation primitive.
    pub const fn new(device: D) -> Self {
        Self { device }
    }

    /// The wrapped platform primitive.
    pub const fn device(&self) -> &D {
        &self.device
    }
}

#[async_trait]
impl<D: DeviceCheck> AttestationProvider for DeviceCheckAttestation<D> {
    async fn token(&self) -> Result<Option<AttestationToken>, ProxLockError> {
        if !self.device.is_supported() {
            debug!("Device attestation unsupported on this device");
            return Err(ProxLockError::AttestationUnsupported);
        }

        let bytes = await_completion(|completion| self.device.generate_token(completion)).await?;
        Ok(bytes.map(AttestationToken::new))
    }
}
