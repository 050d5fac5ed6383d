//! Error types for the client library.

use thiserror::Error;

/// Boxed error reported by a platform attestation API.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while preparing or sending a ProxLock request.
///
/// Every variant aborts the operation that raised it. Nothing in this crate
/// retries; retry policy belongs to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProxLockError {
    /// The outbound request is missing its URL or method.
    ///
    /// This is a caller error and is raised before any header is written.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A caller-supplied value cannot be carried in an HTTP header.
    #[error("Invalid value for header {header}: {source}")]
    InvalidHeaderValue {
        /// Canonical name of the header being written.
        header: &'static str,
        /// Encoding failure from the `http` crate.
        #[source]
        source: http::header::InvalidHeaderValue,
    },

    /// Device attestation is not available.
    ///
    /// Either the device does not support attestation, or the application
    /// runs in a restricted environment with no bypass value configured.
    #[error("Device attestation is not supported in this environment")]
    AttestationUnsupported,

    /// The platform reported an error while generating a token.
    ///
    /// The platform's error is kept as the source.
    #[error("Attestation token generation failed: {0}")]
    AttestationGenerationFailed(#[source] BoxError),

    /// Network or HTTP transport failure while sending.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failure raised by another layer of a middleware stack.
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Invalid client settings, such as an unusable endpoint.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ProxLockError {
    /// Check if this error came from the attestation step.
    #[must_use]
    pub const fn is_attestation_error(&self) -> bool {
        matches!(
            self,
            Self::AttestationUnsupported | Self::AttestationGenerationFailed(_)
        )
    }

    /// Check if this error was caused by the caller's input.
    #[must_use]
    pub const fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::InvalidHeaderValue { .. }
        )
    }

    /// Wraps a platform error as a generation failure.
    pub fn generation_failed<E>(cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::AttestationGenerationFailed(cause.into())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_generation_failure_keeps_cause() {
        let err = ProxLockError::generation_failed("server unavailable");
        assert!(err.is_attestation_error());
        assert!(!err.is_invalid_request());
        assert_eq!(err.source().unwrap().to_string(), "server unavailable");
        assert_eq!(
            err.to_string(),
            "Attestation token generation failed: server unavailable"
        );
    }

    #[test]
    fn test_classification() {
        assert!(ProxLockError::AttestationUnsupported.is_attestation_error());
        assert!(ProxLockError::InvalidRequest("no url".to_string()).is_invalid_request());
        assert!(!ProxLockError::Configuration("bad".to_string()).is_attestation_error());
    }
}
