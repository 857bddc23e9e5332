// Editing-session identity.
//
// Each (document, tab) pairing mints one session id so the stream
// reconciler binds to exactly one logical consumer, and a page reload
// (new mint) invalidates any stale server-side subscription. Identity
// is process-local and never persisted.

use std::fmt;

use chrono::Utc;
use uuid::Uuid;

/// Opaque session identity: `{document}:{client}:{unix_millis}:{nonce}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Subscription address the stream transport listens on for this
    /// session's frames.
    pub fn sse_path(&self) -> String {
        anchorage_common::protocol::events::sse_path(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints session ids for one editing view. Constructed per context, not
/// shared process-wide: two tabs on the same document get distinct
/// client identities.
#[derive(Debug, Clone)]
pub struct SessionManager {
    client_id: Uuid,
}

impl SessionManager {
    pub fn new() -> Self {
        Self { client_id: Uuid::new_v4() }
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Mints a fresh session id for a document.
    ///
    /// Collision resistance comes from the client uuid plus a random
    /// nonce; "astronomically unlikely" is the only guarantee.
    pub fn mint(&self, document_id: &str) -> SessionId {
        let nonce: u32 = rand::random();
        SessionId(format!(
            "{document_id}:{client}:{millis}:{nonce:08x}",
            client = self.client_id,
            millis = Utc::now().timestamp_millis(),
        ))
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
