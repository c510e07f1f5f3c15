//! Core data models for the Access Ledger.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a disposable catalog artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Generates a fresh artifact id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing uuid (e.g. decoded from a token).
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying uuid.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Raw bytes, used as the storage key prefix.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ArtifactId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of a recorded access event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a fresh event id.
    ///
    /// Ledger callers never need this (ids are assigned by `record`);
    /// it exists so tests can synthesize events.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What the recipient attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Opened the catalog.
    View,
    /// Zoomed into an item.
    Zoom,
    /// Attempted to place an order.
    OrderAttempt,
    /// Request was refused (bad token, off-whitelist, out of fence, ...).
    Denied,
}

impl ActionKind {
    /// Single-byte storage tag for counter keys.
    pub(crate) const fn as_byte(self) -> u8 {
        match self {
            Self::View => 0,
            Self::Zoom => 1,
            Self::OrderAttempt => 2,
            Self::Denied => 3,
        }
    }
}

/// One immutable entry in the access log.
///
/// Events are compliance records: once written they are never mutated or
/// deleted. The anomaly detector reads them through windowed queries but
/// never owns them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Unique event id.
    pub id: EventId,
    /// Artifact the attempt targeted.
    pub artifact_id: ArtifactId,
    /// Stable fingerprint of the requesting actor/device.
    pub actor_fingerprint: String,
    /// Hashed network-address bucket of the request origin.
    pub ip_bucket: String,
    /// What was attempted.
    pub action: ActionKind,
    /// Unix milliseconds at record time.
    pub recorded_at: u64,
}

/// An event about to be recorded (id is assigned by the ledger).
#[derive(Debug, Clone)]
pub struct NewAccessEvent {
    pub artifact_id: ArtifactId,
    pub actor_fingerprint: String,
    pub ip_bucket: String,
    pub action: ActionKind,
    pub recorded_at: u64,
}

impl NewAccessEvent {
    /// Creates a new event record.
    pub fn new(
        artifact_id: ArtifactId,
        actor_fingerprint: impl Into<String>,
        ip_bucket: impl Into<String>,
        action: ActionKind,
        recorded_at: u64,
    ) -> Self {
        Self {
            artifact_id,
            actor_fingerprint: actor_fingerprint.into(),
            ip_bucket: ip_bucket.into(),
            action,
            recorded_at,
        }
    }
}

/// Errors that can occur during ledger operations.
///
/// # Security Notes
///
/// `Unavailable` means the ledger cannot guarantee the record/count
/// consistency boundary. Callers must fail the request rather than serve
/// an uncounted view: events are the evidentiary basis for burn
/// decisions.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The underlying store failed; the event was not durably recorded.
    #[error("ledger storage unavailable: {0}")]
    Unavailable(#[from] sled::Error),

    /// Failed to serialize or deserialize an event.
    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored bytes do not decode to the expected shape.
    #[error("corrupt ledger entry: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_id_display_parses_back() {
        let id = ArtifactId::new();
        let parsed: ArtifactId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_action_bytes_are_distinct() {
        let tags = [
            ActionKind::View.as_byte(),
            ActionKind::Zoom.as_byte(),
            ActionKind::OrderAttempt.as_byte(),
            ActionKind::Denied.as_byte(),
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let event = AccessEvent {
            id: EventId::new(),
            artifact_id: ArtifactId::new(),
            actor_fingerprint: "fp-1".to_string(),
            ip_bucket: "bucket-a".to_string(),
            action: ActionKind::View,
            recorded_at: 123,
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: AccessEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
