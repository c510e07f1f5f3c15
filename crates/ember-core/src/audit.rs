//! The compliance audit boundary.
//!
//! Every state transition and every High/Critical security signal is
//! written to the audit sink. The sink is an external collaborator: the
//! engine does not own its storage or retention policy, and it degrades
//! to local logging (never failing the transition) when the sink is
//! unavailable.

use async_trait::async_trait;
use ember_detect::SecuritySignal;
use ember_ledger::ArtifactId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::artifact::{ArtifactStatus, TenantId};

/// One audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditRecord {
    /// A lifecycle transition took effect.
    Transition {
        artifact_id: ArtifactId,
        tenant_id: TenantId,
        from: ArtifactStatus,
        to: ArtifactStatus,
        /// Human-readable cause (burn cause, "tenant panic", ...).
        cause: String,
        at_millis: u64,
    },
    /// A High or Critical security signal was observed.
    Signal { signal: SecuritySignal },
    /// Best-effort regeneration failed; the burn stands.
    RegenerationFailed {
        artifact_id: ArtifactId,
        error: String,
        at_millis: u64,
    },
}

/// Errors the audit sink may report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// The sink could not durably accept the record.
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Durable compliance log, owned by an external collaborator.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Writes one record.
    async fn write(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Default sink: structured local logging.
///
/// Deployments without a compliance store still get every transition in
/// the process log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn write(&self, record: AuditRecord) -> Result<(), AuditError> {
        match &record {
            AuditRecord::Transition { artifact_id, from, to, cause, .. } => {
                info!(%artifact_id, %from, %to, %cause, "artifact transition");
            }
            AuditRecord::Signal { signal } => {
                info!(
                    artifact_id = %signal.artifact_id,
                    pattern = %signal.pattern,
                    severity = %signal.severity,
                    confidence = signal.confidence,
                    "security signal"
                );
            }
            AuditRecord::RegenerationFailed { artifact_id, error, .. } => {
                info!(%artifact_id, %error, "regeneration failed");
            }
        }
        Ok(())
    }
}
