//! Error types for the engine.

use ember_ledger::ArtifactId;
use thiserror::Error;

/// Engine error type.
///
/// # Security Notes
///
/// None of these variants leak to recipients. The access path collapses
/// every refusal into the deliberately uninformative response set; these
/// errors surface only on operator and collaborator surfaces.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No artifact with this id. Operator surface only; the access
    /// path answers `NotFound` instead.
    #[error("unknown artifact: {0}")]
    UnknownArtifact(ArtifactId),

    /// No artifacts registered for this tenant.
    #[error("unknown tenant: {0}")]
    UnknownTenant(crate::artifact::TenantId),

    /// Successor link already written.
    #[error("artifact {0} already regenerated")]
    AlreadyRegenerated(ArtifactId),

    /// Successor links can only be written on burned artifacts.
    #[error("artifact {0} is not burned")]
    NotBurned(ArtifactId),

    /// Ledger failure. The request this was counting must fail rather
    /// than serve an uncounted view.
    #[error("ledger error: {0}")]
    Ledger(#[from] ember_ledger::LedgerError),

    /// Catalog service failure at creation/regeneration time.
    #[error("catalog source error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),
}
