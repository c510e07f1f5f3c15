//! The unified access engine facade.
//!
//! [`AccessEngine`] owns the artifact lifecycle and orchestrates the
//! component crates: the token codec proves a request's origin, the
//! access ledger counts it, the anomaly detector scores the recent
//! window, and (when a burn trigger fires) the regeneration
//! orchestrator clones a successor and drives the notification fan-out.
//!
//! # Security Model
//!
//! The serve pipeline is, in order:
//!
//! 1. Token verification (origin, no lookup)
//! 2. State re-read at request time (burn/lock visible immediately)
//! 3. Generation check (stale tokens from superseded artifacts)
//! 4. Time expiry, geofence, access code, whitelist membership
//! 5. Ledger record, the strong-consistency boundary for the view
//!    budget
//! 6. Anomaly evaluation over the recent window
//!
//! The pipeline is fail-closed: a ledger failure refuses the request
//! rather than serving an uncounted view, and every refusal a recipient
//! can observe is the same generic not-found.

use std::sync::Arc;

use tracing::{debug, info, warn};

use ember_detect::{DetectorConfig, SecuritySignal, Severity};
use ember_ledger::{AccessLedger, ActionKind, ArtifactId, NewAccessEvent};
use ember_notify::{DispatchReport, Dispatcher, NotificationGateway, RecipientHandle};
use ember_token::{AccessToken, CodecKey, TokenCodec};

use crate::artifact::{
    Artifact, ArtifactStatus, BurnCause, BurnDecision, SecurityPolicy, WhitelistEntry,
    WhitelistStatus, TenantId,
};
use crate::audit::{AuditRecord, AuditSink};
use crate::catalog::CatalogSource;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::response::{AccessRequest, AccessResponse};
use crate::store::{ArtifactStore, TransitionOutcome};
use crate::Result;

/// A newly issued (or regenerated) artifact, with its shareable token
/// and the result of the invitation fan-out.
#[derive(Debug)]
pub struct IssuedArtifact {
    pub artifact_id: ArtifactId,
    pub token: AccessToken,
    pub notifications: DispatchReport,
}

/// Result of a tenant-wide lock or unlock command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantCommandSummary {
    /// Artifacts this command transitioned.
    pub applied: usize,
    /// Artifacts already in the target state.
    pub already: usize,
    /// Burned artifacts, which the command skips.
    pub skipped_burned: usize,
}

/// Operator-facing view of one artifact.
#[derive(Debug, Clone)]
pub struct ArtifactReport {
    pub artifact_id: ArtifactId,
    pub tenant_id: TenantId,
    pub status: ArtifactStatus,
    pub view_count: u64,
    pub denied_count: u64,
    pub whitelist: Vec<WhitelistEntry>,
    pub created_at: u64,
    pub burned_at: Option<u64>,
    pub regenerated_into: Option<ArtifactId>,
    pub regenerated_from: Option<ArtifactId>,
}

/// The disposable access artifact engine.
///
/// # Thread Safety
///
/// All operations take `&self` and are safe under arbitrary
/// interleaving. Lifecycle transitions are per-artifact compare-and-swap
/// operations; the ledger's record/count pair is transactional.
pub struct AccessEngine {
    config: EngineConfig,
    codec: TokenCodec,
    store: ArtifactStore,
    ledger: AccessLedger,
    dispatcher: Dispatcher,
    gateway: Arc<dyn NotificationGateway>,
    catalog: Arc<dyn CatalogSource>,
    audit: Arc<dyn AuditSink>,
}

impl AccessEngine {
    /// Creates an engine over the given collaborators.
    pub fn new(
        key: CodecKey,
        config: EngineConfig,
        ledger: AccessLedger,
        catalog: Arc<dyn CatalogSource>,
        gateway: Arc<dyn NotificationGateway>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let dispatcher = Dispatcher::new(config.dispatcher.clone());
        info!("access engine initialized");
        Self {
            config,
            codec: TokenCodec::new(key),
            store: ArtifactStore::new(),
            ledger,
            dispatcher,
            gateway,
            catalog,
            audit,
        }
    }

    /// Issues a new artifact for a tenant and notifies its recipients.
    ///
    /// The catalog snapshot is captured here and never refreshed: the
    /// artifact serves exactly the item set that existed at issue time.
    pub async fn create_artifact(
        &self,
        tenant_id: TenantId,
        policy: SecurityPolicy,
        recipients: Vec<RecipientHandle>,
    ) -> Result<IssuedArtifact> {
        let snapshot = self.catalog.snapshot(tenant_id).await?;
        let whitelist = recipients.into_iter().map(WhitelistEntry::invited).collect();
        let artifact = Artifact::new(tenant_id, snapshot, policy, whitelist, now_millis());

        let artifact_id = artifact.id;
        let token = self.codec.mint(artifact_id.as_uuid(), &artifact.secret);
        let handles: Vec<RecipientHandle> =
            artifact.whitelist.iter().map(|e| e.recipient.clone()).collect();

        self.store.insert(artifact);
        info!(%artifact_id, %tenant_id, "artifact issued");

        let message = format!("You have been invited to a private catalog: {}", token);
        let notifications = self
            .dispatcher
            .dispatch(Arc::clone(&self.gateway), handles, &message)
            .await;

        Ok(IssuedArtifact { artifact_id, token, notifications })
    }

    /// Handles one recipient access request.
    ///
    /// # Errors
    ///
    /// Only [`EngineError::Ledger`]: when the ledger cannot count the
    /// request, the request fails instead of serving an uncounted view.
    /// Every policy refusal is an `Ok` response from the deliberately
    /// uninformative response set.
    pub async fn serve(&self, request: &AccessRequest) -> Result<AccessResponse> {
        let now = now_millis();

        // Origin proof. Nothing is recorded for tokens we cannot even
        // attribute to an artifact.
        let claims = match self.codec.verify(&request.token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("token rejected: {}", e);
                return Ok(AccessResponse::NotFound);
            }
        };
        let artifact_id = ArtifactId::from_uuid(claims.artifact_id);

        // Request-time state re-read; never a cached decision.
        let Some(artifact) = self.store.get(artifact_id) else {
            return Ok(AccessResponse::NotFound);
        };

        if self.codec.ensure_current(&claims, &artifact.secret).is_err() {
            self.record_denied(artifact_id, request, now);
            return Ok(AccessResponse::NotFound);
        }

        match artifact.status {
            ArtifactStatus::Active => {}
            ArtifactStatus::Locked => {
                self.record_denied(artifact_id, request, now);
                return Ok(AccessResponse::Locked);
            }
            ArtifactStatus::Burned | ArtifactStatus::Regenerated => {
                self.record_denied(artifact_id, request, now);
                return Ok(AccessResponse::NotFound);
            }
        }

        if artifact.expired_at(now) {
            self.record_denied(artifact_id, request, now);
            self.execute_burn(
                artifact_id,
                BurnDecision { cause: BurnCause::TimeExpired, effective_at: now },
            )
            .await?;
            return Ok(AccessResponse::NotFound);
        }

        if let Some(fence) = &artifact.policy.geofence {
            if !fence.permits(&request.ip_bucket) {
                warn!(%artifact_id, bucket = %request.ip_bucket, "request outside geofence");
                self.record_denied(artifact_id, request, now);
                return Ok(AccessResponse::NotFound);
            }
        }

        if let Some(code) = &artifact.policy.access_code {
            if request.access_code.as_deref() != Some(code.as_str()) {
                self.record_denied(artifact_id, request, now);
                return Ok(AccessResponse::NotFound);
            }
        }

        match artifact.whitelist_entry(&request.recipient) {
            Some(entry) if entry.status == WhitelistStatus::Revoked => {
                self.record_denied(artifact_id, request, now);
                return Ok(AccessResponse::WhitelistRequired);
            }
            Some(entry) => {
                if entry.status == WhitelistStatus::Invited {
                    self.store.activate_recipient(artifact_id, &request.recipient);
                }
            }
            None => {
                self.record_denied(artifact_id, request, now);
                return Ok(AccessResponse::WhitelistRequired);
            }
        }

        // The strong-consistency boundary: the event insert and the
        // count it returns commit together. Failure fails the request.
        let recorded = self.ledger.record(NewAccessEvent::new(
            artifact_id,
            request.actor_fingerprint.clone(),
            request.ip_bucket.clone(),
            request.action,
            now,
        ))?;

        let max_views = u64::from(artifact.policy.max_views);
        if request.action == ActionKind::View && recorded.count_for_action > max_views {
            // A racing request consumed the budget between our state
            // re-read and our record. The burn below is an idempotent
            // no-op if that racer already performed it.
            self.execute_burn(
                artifact_id,
                BurnDecision { cause: BurnCause::MaxViewsExceeded, effective_at: now },
            )
            .await?;
            return Ok(AccessResponse::NotFound);
        }

        if let Some(cause) = self.evaluate_signals(&artifact, now).await? {
            self.execute_burn(artifact_id, BurnDecision { cause, effective_at: now })
                .await?;
            self.record_denied(artifact_id, request, now);
            return Ok(AccessResponse::NotFound);
        }

        // The view that lands exactly on the budget is served, and is
        // the last one: the artifact burns behind it.
        if request.action == ActionKind::View && recorded.count_for_action == max_views {
            self.execute_burn(
                artifact_id,
                BurnDecision { cause: BurnCause::MaxViewsExceeded, effective_at: now },
            )
            .await?;
        }

        debug!(%artifact_id, action = ?request.action, "request served");
        Ok(AccessResponse::Content { catalog: artifact.catalog })
    }

    /// Operator command: burn one artifact now.
    ///
    /// Idempotent; burning an already-burned artifact is a no-op.
    pub async fn burn(&self, artifact_id: ArtifactId, reason: impl Into<String>) -> Result<()> {
        let decision = BurnDecision {
            cause: BurnCause::ManualPanic { reason: reason.into() },
            effective_at: now_millis(),
        };
        self.execute_burn(artifact_id, decision).await?;
        Ok(())
    }

    /// Tenant-wide panic: lock every artifact the tenant owns.
    ///
    /// Fans out synchronously; returns only after every artifact has
    /// acknowledged, so the caller observes the lock as atomic. Locks
    /// are reversible via [`unlock`](Self::unlock) only.
    pub async fn panic(&self, tenant_id: TenantId) -> Result<TenantCommandSummary> {
        let ids = self.store.tenant_artifacts(tenant_id);
        if ids.is_empty() {
            return Err(EngineError::UnknownTenant(tenant_id));
        }

        let mut summary = TenantCommandSummary { applied: 0, already: 0, skipped_burned: 0 };
        let at = now_millis();
        for id in ids {
            match self.store.lock(id)? {
                TransitionOutcome::Applied => {
                    summary.applied += 1;
                    self.audit_or_log(AuditRecord::Transition {
                        artifact_id: id,
                        tenant_id,
                        from: ArtifactStatus::Active,
                        to: ArtifactStatus::Locked,
                        cause: "tenant panic".to_string(),
                        at_millis: at,
                    })
                    .await;
                }
                TransitionOutcome::AlreadyInTarget => summary.already += 1,
                TransitionOutcome::RefusedTerminal => summary.skipped_burned += 1,
            }
        }
        info!(%tenant_id, locked = summary.applied, "tenant panic applied");
        Ok(summary)
    }

    /// Reverses a tenant panic.
    pub async fn unlock(&self, tenant_id: TenantId) -> Result<TenantCommandSummary> {
        let ids = self.store.tenant_artifacts(tenant_id);
        if ids.is_empty() {
            return Err(EngineError::UnknownTenant(tenant_id));
        }

        let mut summary = TenantCommandSummary { applied: 0, already: 0, skipped_burned: 0 };
        let at = now_millis();
        for id in ids {
            match self.store.unlock(id)? {
                TransitionOutcome::Applied => {
                    summary.applied += 1;
                    self.audit_or_log(AuditRecord::Transition {
                        artifact_id: id,
                        tenant_id,
                        from: ArtifactStatus::Locked,
                        to: ArtifactStatus::Active,
                        cause: "tenant unlock".to_string(),
                        at_millis: at,
                    })
                    .await;
                }
                TransitionOutcome::AlreadyInTarget => summary.already += 1,
                TransitionOutcome::RefusedTerminal => summary.skipped_burned += 1,
            }
        }
        info!(%tenant_id, unlocked = summary.applied, "tenant unlock applied");
        Ok(summary)
    }

    /// Operator-facing status of one artifact.
    pub fn report(&self, artifact_id: ArtifactId) -> Result<ArtifactReport> {
        let artifact = self
            .store
            .get(artifact_id)
            .ok_or(EngineError::UnknownArtifact(artifact_id))?;
        Ok(ArtifactReport {
            artifact_id,
            tenant_id: artifact.tenant_id,
            status: artifact.status,
            view_count: self.ledger.count(artifact_id, ActionKind::View)?,
            denied_count: self.ledger.count(artifact_id, ActionKind::Denied)?,
            whitelist: artifact.whitelist,
            created_at: artifact.created_at,
            burned_at: artifact.burned_at,
            regenerated_into: artifact.regenerated_into,
            regenerated_from: artifact.regenerated_from,
        })
    }

    /// Re-mints a token for an artifact's current generation.
    pub fn mint_token(&self, artifact_id: ArtifactId) -> Result<AccessToken> {
        let artifact = self
            .store
            .get(artifact_id)
            .ok_or(EngineError::UnknownArtifact(artifact_id))?;
        Ok(self.codec.mint(artifact_id.as_uuid(), &artifact.secret))
    }

    /// On-demand anomaly evaluation, for operator review of signals
    /// below the burn threshold.
    pub fn inspect_signals(&self, artifact_id: ArtifactId) -> Result<Vec<SecuritySignal>> {
        let artifact = self
            .store
            .get(artifact_id)
            .ok_or(EngineError::UnknownArtifact(artifact_id))?;
        self.run_detector(&artifact, now_millis())
    }

    /// Runs the detector over the artifact's recent window.
    fn run_detector(&self, artifact: &Artifact, now: u64) -> Result<Vec<SecuritySignal>> {
        let detector: &DetectorConfig = &self.config.detector;
        let window = self.ledger.recent_window(
            artifact.id,
            detector.window_millis,
            detector.max_window_events,
            now,
        )?;
        Ok(ember_detect::evaluate(
            artifact.id,
            &window,
            detector,
            artifact.policy.rate_threshold_per_min / 60.0,
            now,
        ))
    }

    /// Evaluates signals and returns a burn cause when the policy
    /// threshold is met.
    ///
    /// Signals never burn silently below the threshold: High/Critical
    /// ones go to the audit sink, the rest stay in the local log for
    /// operator review.
    async fn evaluate_signals(&self, artifact: &Artifact, now: u64) -> Result<Option<BurnCause>> {
        let signals = self.run_detector(artifact, now)?;
        let mut cause = None;

        for signal in signals {
            if signal.severity >= Severity::High {
                self.audit_or_log(AuditRecord::Signal { signal: signal.clone() })
                    .await;
            } else {
                info!(
                    artifact_id = %signal.artifact_id,
                    pattern = %signal.pattern,
                    severity = %signal.severity,
                    "signal below burn threshold, recorded for review"
                );
            }

            if cause.is_none() && signal.severity >= artifact.policy.burn_severity_threshold {
                cause = Some(BurnCause::SecurityTrigger {
                    pattern: signal.pattern,
                    severity: signal.severity,
                });
            }
        }
        Ok(cause)
    }

    /// Performs the atomic burn transition and, when the policy asks
    /// for it, best-effort regeneration.
    ///
    /// Exactly one concurrent caller applies the transition and drives
    /// regeneration; everyone else observes the artifact already burned
    /// and no-ops. Regeneration failure is recorded but never rolls the
    /// burn back.
    async fn execute_burn(
        &self,
        artifact_id: ArtifactId,
        decision: BurnDecision,
    ) -> Result<Option<IssuedArtifact>> {
        let (outcome, burned) = self.store.burn(artifact_id, decision.effective_at)?;
        if !outcome.applied() {
            debug!(%artifact_id, "burn already applied by a concurrent caller");
            return Ok(None);
        }
        let Some(burned) = burned else {
            return Ok(None);
        };

        info!(%artifact_id, cause = %decision.cause, "artifact burned");
        self.audit_or_log(AuditRecord::Transition {
            artifact_id,
            tenant_id: burned.artifact.tenant_id,
            from: burned.previous,
            to: ArtifactStatus::Burned,
            cause: decision.cause.to_string(),
            at_millis: decision.effective_at,
        })
        .await;

        if !burned.artifact.policy.auto_regenerate {
            return Ok(None);
        }

        match self.regenerate(&burned.artifact, decision.effective_at).await {
            Ok(issued) => {
                info!(
                    %artifact_id,
                    successor = %issued.artifact_id,
                    notified = issued.notifications.successful_count(),
                    failed = issued.notifications.failed_count(),
                    "artifact regenerated"
                );
                Ok(Some(issued))
            }
            Err(e) => {
                warn!(%artifact_id, "regeneration failed, burn stands: {}", e);
                self.audit_or_log(AuditRecord::RegenerationFailed {
                    artifact_id,
                    error: e.to_string(),
                    at_millis: decision.effective_at,
                })
                .await;
                Ok(None)
            }
        }
    }

    /// Clones a burned artifact into a fresh successor and notifies the
    /// whitelist.
    async fn regenerate(&self, burned: &Artifact, now: u64) -> Result<IssuedArtifact> {
        // Whitelist rows are copied, not referenced: the burned
        // artifact's whitelist stays immutable history.
        let whitelist: Vec<WhitelistEntry> = burned
            .whitelist
            .iter()
            .map(|e| WhitelistEntry {
                recipient: e.recipient.clone(),
                status: WhitelistStatus::Invited,
            })
            .collect();

        let mut successor = Artifact::new(
            burned.tenant_id,
            burned.catalog.clone(),
            burned.policy.clone(),
            whitelist,
            now,
        );
        successor.regenerated_from = Some(burned.id);

        let successor_id = successor.id;
        let token = self.codec.mint(successor_id.as_uuid(), &successor.secret);
        let handles: Vec<RecipientHandle> =
            successor.whitelist.iter().map(|e| e.recipient.clone()).collect();

        self.store.insert(successor);
        self.store.link_successor(burned.id, successor_id)?;
        self.audit_or_log(AuditRecord::Transition {
            artifact_id: burned.id,
            tenant_id: burned.tenant_id,
            from: ArtifactStatus::Burned,
            to: ArtifactStatus::Regenerated,
            cause: format!("successor {}", successor_id),
            at_millis: now,
        })
        .await;

        let message = format!("Your catalog link has been refreshed: {}", token);
        let notifications = self
            .dispatcher
            .dispatch(Arc::clone(&self.gateway), handles, &message)
            .await;

        Ok(IssuedArtifact { artifact_id: successor_id, token, notifications })
    }

    /// Records a refused attempt. Best-effort: the request is already
    /// being refused, so a ledger failure here degrades to a log line
    /// instead of masking the refusal.
    fn record_denied(&self, artifact_id: ArtifactId, request: &AccessRequest, now: u64) {
        let event = NewAccessEvent::new(
            artifact_id,
            request.actor_fingerprint.clone(),
            request.ip_bucket.clone(),
            ActionKind::Denied,
            now,
        );
        if let Err(e) = self.ledger.record(event) {
            warn!(%artifact_id, "failed to record denied attempt: {}", e);
        }
    }

    /// Writes an audit record, degrading to the local log when the sink
    /// is unavailable. Transitions never fail on sink errors.
    async fn audit_or_log(&self, record: AuditRecord) {
        if let Err(e) = self.audit.write(record).await {
            warn!("audit sink unavailable, record kept in local log only: {}", e);
        }
    }
}

/// Milliseconds since the unix epoch.
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
