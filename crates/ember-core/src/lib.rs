//! # Emberlink Core
//!
//! Lifecycle controller and unified facade for the disposable access
//! artifact engine. Issues time- and usage-bounded catalog links
//! ("menus") to whitelisted recipients, watches access patterns, and
//! irreversibly burns an artifact when a risk condition is met,
//! optionally regenerating a successor and re-notifying the same
//! recipients.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ACCESS ENGINE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │                 ┌──────────────────┐                         │
//! │                 │   AccessEngine   │  ← Unified Facade       │
//! │                 └────────┬─────────┘                         │
//! │                          │                                   │
//! │      ┌─────────┬─────────┼──────────┬──────────┐             │
//! │      ▼         ▼         ▼          ▼          ▼             │
//! │ ┌─────────┐ ┌───────┐ ┌────────┐ ┌────────┐ ┌────────┐      │
//! │ │  Token  │ │Access │ │Anomaly │ │Artifact│ │ Notify │      │
//! │ │  Codec  │ │Ledger │ │Detector│ │ Store  │ │Fan-out │      │
//! │ └─────────┘ └───────┘ └────────┘ └────────┘ └────────┘      │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! `Active ⇄ Locked → Burned → Regenerated`. Burning is a one-way,
//! idempotent compare-and-swap: concurrent triggers produce exactly one
//! effective transition and exactly one regeneration. Locking is the
//! reversible tenant-wide panic state, distinct from the permanent burn.
//!
//! ## Security Notes
//!
//! - Every "is this artifact usable" check re-reads state at request
//!   time; a panic lock is visible on the very next request.
//! - The view budget rides on the ledger's transactional record/count
//!   pair; racing views can never under-count.
//! - Recipient-visible refusals are deliberately uninformative: never
//!   existed, expired, and burned are indistinguishable.

mod artifact;
mod audit;
mod catalog;
mod config;
mod engine;
mod error;
mod response;
mod store;

pub use artifact::{
    Artifact, ArtifactStatus, BurnCause, BurnDecision, CatalogItem, CatalogSnapshot, Geofence,
    SecurityPolicy, TenantId, WhitelistEntry, WhitelistStatus,
};
pub use audit::{AuditError, AuditRecord, AuditSink, TracingAuditSink};
pub use catalog::{CatalogError, CatalogSource, FixedCatalog};
pub use config::EngineConfig;
pub use engine::{AccessEngine, ArtifactReport, IssuedArtifact, TenantCommandSummary};
pub use error::EngineError;
pub use response::{AccessRequest, AccessResponse};
pub use store::{ArtifactStore, BurnedArtifact, TransitionOutcome};

// Re-export component types for convenience
pub use ember_detect::{DetectorConfig, SecuritySignal, Severity, SignalPattern};
pub use ember_ledger::{AccessLedger, ActionKind, ArtifactId, EventId};
pub use ember_notify::{
    DeliveryOutcome, DispatchReport, DispatcherConfig, GatewayError, NotificationGateway,
    RecipientHandle,
};
pub use ember_token::{AccessToken, CodecKey, TokenCodec, TokenError, TokenSecret};

/// Core result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
