//! The catalog service boundary.

use async_trait::async_trait;
use thiserror::Error;

use crate::artifact::{CatalogSnapshot, TenantId};

/// Errors the catalog service may report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The service could not produce a snapshot.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Supplies the immutable catalog snapshot at artifact creation and
/// regeneration time. The engine never mutates catalog data.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// A point-in-time snapshot of the tenant's catalog.
    async fn snapshot(&self, tenant_id: TenantId) -> Result<CatalogSnapshot, CatalogError>;
}

/// A catalog source serving one fixed snapshot.
///
/// Backs tests and the CLI; production deployments implement
/// [`CatalogSource`] against the real catalog service.
#[derive(Debug, Clone, Default)]
pub struct FixedCatalog {
    snapshot: CatalogSnapshot,
}

impl FixedCatalog {
    /// A source that always serves the given snapshot.
    #[must_use]
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl CatalogSource for FixedCatalog {
    async fn snapshot(&self, _tenant_id: TenantId) -> Result<CatalogSnapshot, CatalogError> {
        Ok(self.snapshot.clone())
    }
}
