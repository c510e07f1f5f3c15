//! # Ember Access Ledger
//!
//! Append-only log of access attempts against disposable catalog
//! artifacts, with fast windowed aggregation. The ledger is the
//! evidentiary basis for every burn decision: events are never mutated
//! or deleted, and the `record`/`count` pair shares one storage
//! transaction boundary so concurrent recorders can never under-count.
//!
//! The correctness property everything else leans on: a view that pushes
//! an artifact's count to exactly `max_views` is observed by every
//! subsequent request, including requests racing with it.
//!
//! ## Usage
//!
//! ```rust
//! use ember_ledger::{AccessLedger, ActionKind, ArtifactId, NewAccessEvent};
//!
//! let ledger = AccessLedger::temporary().unwrap();
//! let artifact = ArtifactId::new();
//!
//! let recorded = ledger
//!     .record(NewAccessEvent::new(artifact, "fp-1", "bucket-a", ActionKind::View, 1_000))
//!     .unwrap();
//! assert_eq!(recorded.count_for_action, 1);
//! assert_eq!(ledger.count(artifact, ActionKind::View).unwrap(), 1);
//! ```

mod ledger;
mod models;

pub use ledger::{AccessLedger, Recorded};
pub use models::{AccessEvent, ActionKind, ArtifactId, EventId, LedgerError, NewAccessEvent};

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
