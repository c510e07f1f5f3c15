//! Artifact, policy, and whitelist models.

use ember_detect::Severity;
use ember_ledger::ArtifactId;
use ember_notify::RecipientHandle;
use ember_token::TokenSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a tenant (the catalog owner issuing artifacts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Generates a fresh tenant id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing uuid.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TenantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of an artifact.
///
/// The only allowed direction of travel is
/// `Active ⇄ Locked → Burned → Regenerated`. Burning is monotonic and
/// irreversible; `Regenerated` is a burned artifact whose successor link
/// has been written. Both burned states deny access identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactStatus {
    /// Serving requests.
    Active,
    /// Soft-paused by a tenant panic; recipients see "temporarily
    /// unavailable". Reversible by explicit unlock only.
    Locked,
    /// Irreversibly revoked.
    Burned,
    /// Burned, with a successor artifact linked via `regenerated_into`.
    Regenerated,
}

impl ArtifactStatus {
    /// True for both burned states.
    #[must_use]
    pub const fn is_burned(self) -> bool {
        matches!(self, Self::Burned | Self::Regenerated)
    }
}

impl std::fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Locked => "locked",
            Self::Burned => "burned",
            Self::Regenerated => "regenerated",
        };
        f.write_str(name)
    }
}

/// Allowlist of network-address buckets an artifact may be reached from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geofence {
    /// Permitted buckets (the same hashed bucket values the ledger
    /// records on every event).
    pub allowed_buckets: Vec<String>,
}

impl Geofence {
    /// True when the bucket is inside the fence.
    #[must_use]
    pub fn permits(&self, bucket: &str) -> bool {
        self.allowed_buckets.iter().any(|b| b == bucket)
    }
}

/// Per-artifact security policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// Lifetime view budget; the view that reaches this count is the
    /// last one served.
    pub max_views: u32,
    /// Artifact lifetime from creation, in milliseconds.
    pub time_window_millis: u64,
    /// Rate threshold for the anomaly detector, views per minute.
    pub rate_threshold_per_min: f64,
    /// Signals at or above this severity trigger an automatic burn.
    pub burn_severity_threshold: Severity,
    /// Regenerate a successor artifact when this one burns.
    pub auto_regenerate: bool,
    /// Optional shared access code recipients must present.
    pub access_code: Option<String>,
    /// Optional network-address fence.
    pub geofence: Option<Geofence>,
}

impl SecurityPolicy {
    /// Defaults: 10 views, 24 hour lifetime, 30 views/min rate limit,
    /// burn at High severity, no regeneration, no code, no fence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_views: 10,
            time_window_millis: 24 * 60 * 60 * 1_000,
            rate_threshold_per_min: 30.0,
            burn_severity_threshold: Severity::High,
            auto_regenerate: false,
            access_code: None,
            geofence: None,
        }
    }

    /// Sets the view budget.
    #[must_use]
    pub fn with_max_views(mut self, max_views: u32) -> Self {
        self.max_views = max_views;
        self
    }

    /// Sets the artifact lifetime.
    #[must_use]
    pub fn with_time_window_millis(mut self, millis: u64) -> Self {
        self.time_window_millis = millis;
        self
    }

    /// Sets the anomaly rate threshold.
    #[must_use]
    pub fn with_rate_threshold_per_min(mut self, per_min: f64) -> Self {
        self.rate_threshold_per_min = per_min;
        self
    }

    /// Sets the severity at which signals burn the artifact.
    #[must_use]
    pub fn with_burn_severity_threshold(mut self, severity: Severity) -> Self {
        self.burn_severity_threshold = severity;
        self
    }

    /// Enables or disables automatic regeneration.
    #[must_use]
    pub fn with_auto_regenerate(mut self, enabled: bool) -> Self {
        self.auto_regenerate = enabled;
        self
    }

    /// Requires a shared access code.
    #[must_use]
    pub fn with_access_code(mut self, code: impl Into<String>) -> Self {
        self.access_code = Some(code.into());
        self
    }

    /// Restricts access to the given network buckets.
    #[must_use]
    pub fn with_geofence(mut self, fence: Geofence) -> Self {
        self.geofence = Some(fence);
        self
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Membership state of one whitelist recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhitelistStatus {
    /// Notified, has not accessed yet.
    Invited,
    /// Has accessed at least once.
    Active,
    /// Explicitly removed; requests are refused.
    Revoked,
}

/// One authorized recipient of an artifact.
///
/// Whitelist entries are owned by their artifact and copied (never
/// referenced) into a regenerated successor, so the burned artifact's
/// whitelist stays immutable history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub recipient: RecipientHandle,
    pub status: WhitelistStatus,
}

impl WhitelistEntry {
    /// A fresh invitation for a recipient.
    pub fn invited(recipient: impl Into<RecipientHandle>) -> Self {
        Self {
            recipient: recipient.into(),
            status: WhitelistStatus::Invited,
        }
    }
}

/// An immutable catalog item captured in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub sku: String,
    pub name: String,
}

/// The immutable item set an artifact serves.
///
/// Captured from the catalog service at creation time and cloned (never
/// shared mutably) into regenerated successors. The engine never writes
/// catalog data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub items: Vec<CatalogItem>,
}

impl CatalogSnapshot {
    /// Snapshot over the given items.
    #[must_use]
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }
}

/// A disposable access artifact: one shareable, revocable catalog link.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub id: ArtifactId,
    pub tenant_id: TenantId,
    pub status: ArtifactStatus,
    pub catalog: CatalogSnapshot,
    pub policy: SecurityPolicy,
    /// Current token-generation secret; rotated by regeneration.
    pub secret: TokenSecret,
    pub whitelist: Vec<WhitelistEntry>,
    /// Unix milliseconds at creation.
    pub created_at: u64,
    /// Unix milliseconds at burn, once burned.
    pub burned_at: Option<u64>,
    /// Forward link to the successor artifact, once regenerated.
    pub regenerated_into: Option<ArtifactId>,
    /// Weak back link to the predecessor. Never followed for ownership
    /// or lifetime purposes; the predecessor's lifetime is independent
    /// of anything it spawned.
    pub regenerated_from: Option<ArtifactId>,
}

impl Artifact {
    /// A new active artifact for a tenant.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        catalog: CatalogSnapshot,
        policy: SecurityPolicy,
        whitelist: Vec<WhitelistEntry>,
        created_at: u64,
    ) -> Self {
        Self {
            id: ArtifactId::new(),
            tenant_id,
            status: ArtifactStatus::Active,
            catalog,
            policy,
            secret: TokenSecret::generate(),
            whitelist,
            created_at,
            burned_at: None,
            regenerated_into: None,
            regenerated_from: None,
        }
    }

    /// True once the artifact's lifetime has elapsed.
    #[must_use]
    pub fn expired_at(&self, now_millis: u64) -> bool {
        now_millis >= self.created_at.saturating_add(self.policy.time_window_millis)
    }

    /// Finds a whitelist entry by recipient.
    #[must_use]
    pub fn whitelist_entry(&self, recipient: &RecipientHandle) -> Option<&WhitelistEntry> {
        self.whitelist.iter().find(|e| &e.recipient == recipient)
    }
}

/// Why an artifact burned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BurnCause {
    /// The lifetime view budget was exhausted.
    MaxViewsExceeded,
    /// The artifact outlived its time window.
    TimeExpired,
    /// An anomaly signal met the policy's severity threshold.
    SecurityTrigger {
        pattern: ember_detect::SignalPattern,
        severity: Severity,
    },
    /// Operator-initiated burn.
    ManualPanic { reason: String },
}

impl std::fmt::Display for BurnCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxViewsExceeded => f.write_str("max views exceeded"),
            Self::TimeExpired => f.write_str("time window expired"),
            Self::SecurityTrigger { pattern, severity } => {
                write!(f, "security trigger: {} ({})", pattern, severity)
            }
            Self::ManualPanic { reason } => write!(f, "manual burn: {}", reason),
        }
    }
}

/// The output of one burn evaluation.
///
/// Created transiently, immediately consumed to drive the state
/// transition, then discarded. The artifact's state change is the
/// durable record, not this value.
#[derive(Debug, Clone, PartialEq)]
pub struct BurnDecision {
    pub cause: BurnCause,
    /// Unix milliseconds the burn takes effect.
    pub effective_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_burned_predicate() {
        assert!(!ArtifactStatus::Active.is_burned());
        assert!(!ArtifactStatus::Locked.is_burned());
        assert!(ArtifactStatus::Burned.is_burned());
        assert!(ArtifactStatus::Regenerated.is_burned());
    }

    #[test]
    fn test_policy_builder() {
        let policy = SecurityPolicy::new()
            .with_max_views(3)
            .with_time_window_millis(60_000)
            .with_auto_regenerate(true)
            .with_burn_severity_threshold(Severity::Critical);

        assert_eq!(policy.max_views, 3);
        assert_eq!(policy.time_window_millis, 60_000);
        assert!(policy.auto_regenerate);
        assert_eq!(policy.burn_severity_threshold, Severity::Critical);
    }

    #[test]
    fn test_geofence_permits() {
        let fence = Geofence {
            allowed_buckets: vec!["bucket-a".to_string(), "bucket-b".to_string()],
        };
        assert!(fence.permits("bucket-a"));
        assert!(!fence.permits("bucket-z"));
    }

    #[test]
    fn test_artifact_expiry() {
        let artifact = Artifact::new(
            TenantId::new(),
            CatalogSnapshot::default(),
            SecurityPolicy::new().with_time_window_millis(1_000),
            Vec::new(),
            10_000,
        );
        assert!(!artifact.expired_at(10_500));
        assert!(artifact.expired_at(11_000));
        assert!(artifact.expired_at(20_000));
    }

    #[test]
    fn test_whitelist_lookup() {
        let artifact = Artifact::new(
            TenantId::new(),
            CatalogSnapshot::default(),
            SecurityPolicy::new(),
            vec![WhitelistEntry::invited("alice"), WhitelistEntry::invited("bob")],
            0,
        );
        assert!(artifact.whitelist_entry(&"alice".into()).is_some());
        assert!(artifact.whitelist_entry(&"mallory".into()).is_none());
    }
}
