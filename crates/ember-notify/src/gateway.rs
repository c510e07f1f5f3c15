//! The external messaging gateway boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An addressable recipient: phone number, email, or device key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientHandle(String);

impl RecipientHandle {
    /// Wraps a raw handle string.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// The raw handle.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipientHandle {
    fn from(handle: &str) -> Self {
        Self::new(handle)
    }
}

/// Errors an external gateway may report for a single send.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway refused the message (bad handle, blocked recipient).
    #[error("gateway rejected send: {0}")]
    Rejected(String),

    /// The gateway could not be reached or errored internally.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// External messaging gateway.
///
/// The engine treats the gateway as fire-and-forget with a result
/// callback: a send either succeeds or reports a per-recipient error.
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Delivers one message to one recipient.
    async fn send(&self, recipient: &RecipientHandle, message: &str) -> Result<(), GatewayError>;
}
