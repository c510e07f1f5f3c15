//! Access request and response types.

use ember_ledger::ActionKind;
use ember_notify::RecipientHandle;
use serde::{Deserialize, Serialize};

use crate::artifact::CatalogSnapshot;

/// An inbound recipient request.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// The opaque token from the shared link.
    pub token: String,
    /// Recipient identity as established by the caller's auth layer.
    pub recipient: RecipientHandle,
    /// Optional shared access code.
    pub access_code: Option<String>,
    /// Stable device/browser fingerprint.
    pub actor_fingerprint: String,
    /// Hashed network-address bucket.
    pub ip_bucket: String,
    /// What the recipient is attempting.
    pub action: ActionKind,
}

impl AccessRequest {
    /// A plain view request.
    pub fn view(
        token: impl Into<String>,
        recipient: impl Into<RecipientHandle>,
        actor_fingerprint: impl Into<String>,
        ip_bucket: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            recipient: recipient.into(),
            access_code: None,
            actor_fingerprint: actor_fingerprint.into(),
            ip_bucket: ip_bucket.into(),
            action: ActionKind::View,
        }
    }

    /// Attaches an access code.
    #[must_use]
    pub fn with_access_code(mut self, code: impl Into<String>) -> Self {
        self.access_code = Some(code.into());
        self
    }

    /// Sets the attempted action.
    #[must_use]
    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action = action;
        self
    }
}

/// The engine's answer to an access request.
///
/// # Security Notes
///
/// `NotFound` deliberately covers malformed tokens, forged tokens,
/// stale tokens, expired artifacts, burned artifacts, and ids that never
/// existed. Collapsing them denies probing clients an enumeration
/// oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AccessResponse {
    /// Authorized: the catalog content.
    Content {
        catalog: CatalogSnapshot,
    },
    /// Invalid, expired, burned, or nonexistent: indistinguishable by
    /// design.
    NotFound,
    /// The tenant pulled the panic lever; temporarily unavailable.
    Locked,
    /// The token is valid but this recipient is not on the whitelist.
    WhitelistRequired,
}

impl AccessResponse {
    /// Returns true when content was served.
    #[must_use]
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Content { .. })
    }

    /// Returns true for the generic refusal.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
