//! # Artifact state store
//!
//! In-memory store of artifact state, keyed by artifact id. Every
//! lifecycle transition runs under the store's per-key entry lock, which
//! is what makes each transition a compare-and-swap: the mutation reads
//! the current status, decides, and writes the new status while no other
//! caller can observe or modify the entry.
//!
//! ## Security Notes
//!
//! - Burning is monotonic. Once a status is `Burned` the only permitted
//!   mutation is writing the successor link (`Burned → Regenerated`).
//! - Two concurrent burn attempts cannot both apply: the entry lock
//!   serializes them, the loser observes `Burned` and reports
//!   `AlreadyInTarget`. Treat that as success; the desired end state
//!   was reached by a concurrent caller.

use dashmap::DashMap;

use ember_ledger::ArtifactId;
use ember_notify::RecipientHandle;

use crate::artifact::{Artifact, ArtifactStatus, TenantId, WhitelistStatus};
use crate::error::EngineError;
use crate::Result;

/// Outcome of a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// This caller performed the transition.
    Applied,
    /// The artifact was already in the target state; a concurrent (or
    /// earlier) caller got there first. Treated as success.
    AlreadyInTarget,
    /// The artifact is burned and the target state is not reachable.
    /// Commands against burned artifacts are no-ops, never errors.
    RefusedTerminal,
}

impl TransitionOutcome {
    /// True when this caller won the transition race.
    #[must_use]
    pub const fn applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Snapshot handed to the burn winner.
#[derive(Debug, Clone)]
pub struct BurnedArtifact {
    /// Status immediately before the burn (`Active` or `Locked`).
    pub previous: ArtifactStatus,
    /// The artifact as of the burn.
    pub artifact: Artifact,
}

/// Concurrent artifact state store.
///
/// # Thread Safety
///
/// All operations are safe under arbitrary interleaving. Mutations hold
/// the per-key entry lock for their full read-decide-write sequence.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    artifacts: DashMap<ArtifactId, Artifact>,
    by_tenant: DashMap<TenantId, Vec<ArtifactId>>,
}

impl ArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new artifact.
    pub fn insert(&self, artifact: Artifact) {
        self.by_tenant
            .entry(artifact.tenant_id)
            .or_default()
            .push(artifact.id);
        self.artifacts.insert(artifact.id, artifact);
    }

    /// Snapshot of an artifact's current state.
    ///
    /// This is the request-time re-read every access check performs; no
    /// caller caches the result across requests.
    #[must_use]
    pub fn get(&self, id: ArtifactId) -> Option<Artifact> {
        self.artifacts.get(&id).map(|a| a.value().clone())
    }

    /// Ids of every artifact belonging to a tenant.
    #[must_use]
    pub fn tenant_artifacts(&self, tenant_id: TenantId) -> Vec<ArtifactId> {
        self.by_tenant
            .get(&tenant_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    /// Number of stored artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Returns true when no artifacts are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Burns an artifact.
    ///
    /// Reachable from `Active` and `Locked`. Exactly one concurrent
    /// caller observes `Applied` and receives the post-burn snapshot
    /// (the regeneration orchestrator's input); everyone else gets
    /// `AlreadyInTarget`.
    pub fn burn(
        &self,
        id: ArtifactId,
        at_millis: u64,
    ) -> Result<(TransitionOutcome, Option<BurnedArtifact>)> {
        let mut entry = self.artifacts.get_mut(&id).ok_or(EngineError::UnknownArtifact(id))?;
        if entry.status.is_burned() {
            return Ok((TransitionOutcome::AlreadyInTarget, None));
        }
        let previous = entry.status;
        entry.status = ArtifactStatus::Burned;
        entry.burned_at = Some(at_millis);
        Ok((
            TransitionOutcome::Applied,
            Some(BurnedArtifact { previous, artifact: entry.clone() }),
        ))
    }

    /// Locks an artifact (tenant panic).
    pub fn lock(&self, id: ArtifactId) -> Result<TransitionOutcome> {
        let mut entry = self.artifacts.get_mut(&id).ok_or(EngineError::UnknownArtifact(id))?;
        match entry.status {
            ArtifactStatus::Active => {
                entry.status = ArtifactStatus::Locked;
                Ok(TransitionOutcome::Applied)
            }
            ArtifactStatus::Locked => Ok(TransitionOutcome::AlreadyInTarget),
            ArtifactStatus::Burned | ArtifactStatus::Regenerated => {
                Ok(TransitionOutcome::RefusedTerminal)
            }
        }
    }

    /// Unlocks an artifact. Never automatic; only the explicit unlock
    /// command reaches this.
    pub fn unlock(&self, id: ArtifactId) -> Result<TransitionOutcome> {
        let mut entry = self.artifacts.get_mut(&id).ok_or(EngineError::UnknownArtifact(id))?;
        match entry.status {
            ArtifactStatus::Locked => {
                entry.status = ArtifactStatus::Active;
                Ok(TransitionOutcome::Applied)
            }
            ArtifactStatus::Active => Ok(TransitionOutcome::AlreadyInTarget),
            ArtifactStatus::Burned | ArtifactStatus::Regenerated => {
                Ok(TransitionOutcome::RefusedTerminal)
            }
        }
    }

    /// Writes the successor link on a burned artifact.
    ///
    /// The one mutation permitted after a burn; moves the status to
    /// `Regenerated` so the link's presence is visible without
    /// inspecting the option.
    pub fn link_successor(&self, id: ArtifactId, successor: ArtifactId) -> Result<()> {
        let mut entry = self.artifacts.get_mut(&id).ok_or(EngineError::UnknownArtifact(id))?;
        match entry.status {
            ArtifactStatus::Burned => {
                entry.regenerated_into = Some(successor);
                entry.status = ArtifactStatus::Regenerated;
                Ok(())
            }
            ArtifactStatus::Regenerated => Err(EngineError::AlreadyRegenerated(id)),
            _ => Err(EngineError::NotBurned(id)),
        }
    }

    /// Marks an invited recipient as active after their first access.
    ///
    /// No-op unless the artifact is `Active` (burned whitelists are
    /// immutable history).
    pub fn activate_recipient(&self, id: ArtifactId, recipient: &RecipientHandle) {
        if let Some(mut entry) = self.artifacts.get_mut(&id) {
            if entry.status != ArtifactStatus::Active {
                return;
            }
            if let Some(slot) = entry
                .whitelist
                .iter_mut()
                .find(|e| &e.recipient == recipient && e.status == WhitelistStatus::Invited)
            {
                slot.status = WhitelistStatus::Active;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{CatalogSnapshot, SecurityPolicy, WhitelistEntry};

    fn artifact(tenant: TenantId) -> Artifact {
        Artifact::new(
            tenant,
            CatalogSnapshot::default(),
            SecurityPolicy::new(),
            vec![WhitelistEntry::invited("alice")],
            1_000,
        )
    }

    #[test]
    fn test_insert_and_get() {
        let store = ArtifactStore::new();
        let tenant = TenantId::new();
        let a = artifact(tenant);
        let id = a.id;
        store.insert(a);

        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.status, ArtifactStatus::Active);
        assert_eq!(store.tenant_artifacts(tenant), vec![id]);
    }

    #[test]
    fn test_burn_applies_once() {
        let store = ArtifactStore::new();
        let a = artifact(TenantId::new());
        let id = a.id;
        store.insert(a);

        let (first, snapshot) = store.burn(id, 2_000).unwrap();
        assert!(first.applied());
        let snapshot = snapshot.unwrap();
        assert_eq!(snapshot.previous, ArtifactStatus::Active);
        assert_eq!(snapshot.artifact.burned_at, Some(2_000));

        let (second, snapshot) = store.burn(id, 3_000).unwrap();
        assert_eq!(second, TransitionOutcome::AlreadyInTarget);
        assert!(snapshot.is_none());

        // The first burn timestamp is untouched by the repeat.
        assert_eq!(store.get(id).unwrap().burned_at, Some(2_000));
    }

    #[test]
    fn test_concurrent_burn_has_single_winner() {
        let store = std::sync::Arc::new(ArtifactStore::new());
        let a = artifact(TenantId::new());
        let id = a.id;
        store.insert(a);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                store.burn(id, 2_000).unwrap().0.applied()
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| usize::from(h.join().unwrap()))
            .sum();
        assert_eq!(wins, 1);
    }

    #[test]
    fn test_burned_is_terminal() {
        let store = ArtifactStore::new();
        let a = artifact(TenantId::new());
        let id = a.id;
        store.insert(a);

        store.burn(id, 2_000).unwrap();

        assert_eq!(store.lock(id).unwrap(), TransitionOutcome::RefusedTerminal);
        assert_eq!(store.unlock(id).unwrap(), TransitionOutcome::RefusedTerminal);
        assert!(store.get(id).unwrap().status.is_burned());
    }

    #[test]
    fn test_lock_unlock_round_trip() {
        let store = ArtifactStore::new();
        let a = artifact(TenantId::new());
        let id = a.id;
        store.insert(a);

        assert!(store.lock(id).unwrap().applied());
        assert_eq!(store.get(id).unwrap().status, ArtifactStatus::Locked);
        assert_eq!(store.lock(id).unwrap(), TransitionOutcome::AlreadyInTarget);

        assert!(store.unlock(id).unwrap().applied());
        assert_eq!(store.get(id).unwrap().status, ArtifactStatus::Active);
        assert_eq!(store.unlock(id).unwrap(), TransitionOutcome::AlreadyInTarget);
    }

    #[test]
    fn test_locked_artifact_can_burn() {
        let store = ArtifactStore::new();
        let a = artifact(TenantId::new());
        let id = a.id;
        store.insert(a);

        store.lock(id).unwrap();
        let (outcome, _) = store.burn(id, 2_000).unwrap();
        assert!(outcome.applied());
    }

    #[test]
    fn test_link_successor_requires_burn() {
        let store = ArtifactStore::new();
        let a = artifact(TenantId::new());
        let id = a.id;
        store.insert(a);
        let successor = ArtifactId::new();

        assert!(store.link_successor(id, successor).is_err());

        store.burn(id, 2_000).unwrap();
        store.link_successor(id, successor).unwrap();

        let loaded = store.get(id).unwrap();
        assert_eq!(loaded.status, ArtifactStatus::Regenerated);
        assert_eq!(loaded.regenerated_into, Some(successor));

        // Linking twice is refused.
        assert!(store.link_successor(id, ArtifactId::new()).is_err());
    }

    #[test]
    fn test_activate_recipient() {
        let store = ArtifactStore::new();
        let a = artifact(TenantId::new());
        let id = a.id;
        store.insert(a);

        store.activate_recipient(id, &"alice".into());
        let entry = store.get(id).unwrap().whitelist[0].clone();
        assert_eq!(entry.status, WhitelistStatus::Active);

        // Unknown recipients are ignored.
        store.activate_recipient(id, &"mallory".into());
    }

    #[test]
    fn test_unknown_artifact_is_an_error() {
        let store = ArtifactStore::new();
        assert!(matches!(
            store.burn(ArtifactId::new(), 0),
            Err(EngineError::UnknownArtifact(_))
        ));
    }
}
