//! Turns a callback-style token generation API into a single awaited result.
//!
//! The platform is handed a [`CompletionHandler`] and calls it when the
//! ceremony finishes. The awaiting side receives exactly one outcome, no
//! matter how many times the platform invokes the handler.
//!
//! Dropping the awaiting future detaches it from the ceremony but does not
//! cancel the ceremony itself. A completion that arrives after the caller has
//! gone is discarded.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use tokio::sync::oneshot;

use crate::error::{BoxError, ProxLockError};

type Outcome = Result<Option<Vec<u8>>, BoxError>;

/// One-shot completion callback passed to the platform token generator.
///
/// Clones share the same slot, so the awaiting call resumes at most once even
/// if the platform copies the callback or invokes it repeatedly.
#[derive(Clone)]
pub struct CompletionHandler {
    slot: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl CompletionHandler {
    fn new(sender: oneshot::Sender<Outcome>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Delivers the platform result.
    ///
    /// Mirrors the platform's `(token, error)` callback shape: if `error` is
    /// present the call fails with it, otherwise `token` is delivered as-is.
    ///
    /// Returns `true` if this call resumed the awaiting side. Returns `false`
    /// if the handler was already used or nobody is waiting any more.
    pub fn complete(&self, token: Option<Vec<u8>>, error: Option<BoxError>) -> bool {
        let outcome = error.map_or(Ok(token), Err);
        self.resume(outcome)
    }

    /// Delivers a generated token.
    pub fn succeed(&self, token: Vec<u8>) -> bool {
        self.resume(Ok(Some(token)))
    }

    /// Delivers a platform error.
    pub fn fail<E>(&self, error: E) -> bool
    where
        E: Into<BoxError>,
    {
        self.resume(Err(error.into()))
    }

    /// Whether the awaiting side has already been resumed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn resume(&self, outcome: Outcome) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(sender) = sender else {
            warn!("Attestation completion invoked more than once; ignoring");
            return false;
        };

        if sender.send(outcome).is_err() {
            debug!("Attestation completed after the caller stopped waiting");
            return false;
        }

        true
    }
}

impl fmt::Debug for CompletionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandler")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Starts a callback-based operation and waits for its single outcome.
///
/// `start` is called exactly once with a fresh handler. If every clone of the
/// handler is dropped without completing, the call fails with
/// [`ProxLockError::AttestationGenerationFailed`].
///
/// # Errors
///
/// Returns [`ProxLockError::AttestationGenerationFailed`] carrying the
/// platform error, or a description of the abandoned callback.
pub async fn await_completion<F>(start: F) -> Result<Option<Vec<u8>>, ProxLockError>
where
    F: FnOnce(CompletionHandler),
{
    let (sender, receiver) = oneshot::channel();
    start(CompletionHandler::new(sender));

    match receiver.await {
        Ok(Ok(token)) => Ok(token),
        Ok(Err(cause)) => Err(ProxLockError::AttestationGenerationFailed(cause)),
        Err(_) => Err(ProxLockError::generation_failed(
            "attestation completion handler dropped without a result",
        )),
    }
}
