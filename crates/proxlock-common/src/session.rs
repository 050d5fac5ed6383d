use std::fmt;

use serde::{Deserialize, Serialize};

use crate::headers::bearer_token_placeholder;

/// Identity for one ProxLock integration.
///
/// Create one `SessionContext` per API key and reuse it for the lifetime of
/// the application. It is immutable, so it can be shared freely between
/// concurrent requests.
///
/// Neither field is a usable credential. The partial key only builds the
/// bearer-token placeholder and the association identifier tells the proxy
/// which stored credential the placeholder refers to.
///
/// # Examples
///
/// ```
/// use proxlock_common::SessionContext;
///
/// let session = SessionContext::new("pk_abc", "assoc_1");
/// assert_eq!(session.association_id(), "assoc_1");
/// assert_eq!(
///     session.bearer_token_placeholder(),
///     "%ProxLock_PARTIAL_KEY:pk_abc%"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionContext {
    partial_key: String,
    association_id: String,
}

impl SessionContext {
    /// Creates a session from the values shown in the ProxLock web portal.
    ///
    /// Both values are stored verbatim. Their format is validated by the
    /// proxy, not here.
    pub fn new(partial_key: impl Into<String>, association_id: impl Into<String>) -> Self {
        Self {
            partial_key: partial_key.into(),
            association_id: association_id.into(),
        }
    }

    /// The partial key shared by ProxLock when the bearer token was added.
    #[must_use]
    pub fn partial_key(&self) -> &str {
        &self.partial_key
    }

    /// The identifier of this key in ProxLock.
    #[must_use]
    pub fn association_id(&self) -> &str {
        &self.association_id
    }

    /// The string the proxy replaces with the real bearer token.
    ///
    /// Put it wherever the secret would normally go, e.g.
    /// `Authorization: Bearer <placeholder>`.
    #[must_use]
    pub fn bearer_token_placeholder(&self) -> String {
        bearer_token_placeholder(&self.partial_key)
    }
}

impl fmt::Display for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProxLock session {}", self.association_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stores_values_verbatim() {
        let session = SessionContext::new(" pk_abc ", "assoc_1");
        assert_eq!(session.partial_key(), " pk_abc ");
        assert_eq!(session.association_id(), "assoc_1");
    }

    #[test]
    fn test_placeholder_wraps_partial_key() {
        let session = SessionContext::new("pk_abc", "assoc_1");
        assert_eq!(
            session.bearer_token_placeholder(),
            "%ProxLock_PARTIAL_KEY:pk_abc%"
        );
    }

    #[test]
    fn test_display_omits_partial_key() {
        let session = SessionContext::new("pk_abc", "assoc_1");
        let shown = session.to_string();
        assert!(shown.contains("assoc_1"));
        assert!(!shown.contains("pk_abc"));
    }

    #[test]
    fn test_clones_are_equal() {
        let session = SessionContext::new("pk_abc", "assoc_1");
        assert_eq!(session.clone(), session);
    }
}
