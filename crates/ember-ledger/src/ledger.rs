//! # Persistent ledger storage
//!
//! Sled-backed storage for access events. Two trees:
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `events` | artifact id + recorded_at + seq | serialized `AccessEvent` | append-only log |
//! | `counters` | artifact id + action tag | u64 (big-endian) | per-action lifetime counts |
//!
//! The event insert and the counter increment commit in a single sled
//! transaction. That transaction is the strong-consistency boundary the
//! lifecycle controller relies on: two racing `record` calls serialize,
//! and the count each caller gets back reflects its own insert.
//!
//! ## Security Notes
//!
//! - There is no update or delete path. Events are compliance records.
//! - Keys embed the record timestamp so windowed queries are prefix
//!   range scans, not full scans.
//! - On storage failure the event is NOT recorded and the caller must
//!   refuse the request it was counting.

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use crate::models::{AccessEvent, ActionKind, ArtifactId, EventId, LedgerError, NewAccessEvent};
use crate::Result;

/// Tree name for the append-only event log.
const EVENTS_TREE: &str = "events";

/// Tree name for per-artifact action counters.
const COUNTERS_TREE: &str = "counters";

/// Outcome of a successful `record` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    /// Id assigned to the stored event.
    pub event_id: EventId,
    /// Lifetime count of this event's action for this artifact, as of
    /// the same transaction that stored the event.
    pub count_for_action: u64,
}

/// Append-only access event ledger.
///
/// # Thread Safety
///
/// The underlying sled database is thread-safe; `AccessLedger` is `Clone`
/// and clones share the same store.
#[derive(Clone)]
pub struct AccessLedger {
    db: sled::Db,
    events: sled::Tree,
    counters: sled::Tree,
}

impl AccessLedger {
    /// Opens or creates a ledger at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] if the database cannot be
    /// opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Creates a temporary in-memory ledger for testing.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let events = db.open_tree(EVENTS_TREE)?;
        let counters = db.open_tree(COUNTERS_TREE)?;
        Ok(Self { db, events, counters })
    }

    /// Appends an access event and returns its id together with the
    /// post-insert count for the event's action.
    ///
    /// The insert and the counter increment share one transaction, so a
    /// view that pushes the count to exactly the policy limit is seen by
    /// every request that records after it.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unavailable`] when storage fails. The event was
    /// not recorded; the caller must fail the request rather than serve
    /// an uncounted view.
    pub fn record(&self, event: NewAccessEvent) -> Result<Recorded> {
        let event_id = EventId::new();
        let seq = self.db.generate_id()?;
        let stored = AccessEvent {
            id: event_id,
            artifact_id: event.artifact_id,
            actor_fingerprint: event.actor_fingerprint,
            ip_bucket: event.ip_bucket,
            action: event.action,
            recorded_at: event.recorded_at,
        };

        let event_key = event_key(event.artifact_id, event.recorded_at, seq);
        let counter_key = counter_key(event.artifact_id, event.action);
        let event_bytes = serde_json::to_vec(&stored)?;

        let outcome = (&self.events, &self.counters).transaction(|(events, counters)| {
            events.insert(event_key.as_slice(), event_bytes.as_slice())?;

            let next = match counters.get(counter_key.as_slice())? {
                Some(raw) => decode_count(&raw).map_err(ConflictableTransactionError::Abort)? + 1,
                None => 1,
            };
            let next_bytes = next.to_be_bytes();
            counters.insert(counter_key.as_slice(), next_bytes.as_slice())?;
            Ok(next)
        });

        match outcome {
            Ok(count_for_action) => Ok(Recorded { event_id, count_for_action }),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(LedgerError::Unavailable(e)),
        }
    }

    /// Lifetime count of an action against an artifact.
    ///
    /// Reads the same counter the `record` transaction writes, so it is
    /// always consistent with the most recent committed insert.
    pub fn count(&self, artifact_id: ArtifactId, action: ActionKind) -> Result<u64> {
        match self.counters.get(counter_key(artifact_id, action))? {
            Some(raw) => decode_count(&raw),
            None => Ok(0),
        }
    }

    /// Count of an action within the trailing window ending at `now`.
    pub fn count_since(
        &self,
        artifact_id: ArtifactId,
        action: ActionKind,
        window_millis: u64,
        now_millis: u64,
    ) -> Result<u64> {
        let mut total = 0u64;
        for event in self.scan_window(artifact_id, window_millis, now_millis)? {
            if event.action == action {
                total += 1;
            }
        }
        Ok(total)
    }

    /// The anomaly-evaluation window: events within the trailing window,
    /// truncated to the most recent `max_events`.
    ///
    /// Returned in recording order (oldest first).
    pub fn recent_window(
        &self,
        artifact_id: ArtifactId,
        window_millis: u64,
        max_events: usize,
        now_millis: u64,
    ) -> Result<Vec<AccessEvent>> {
        let mut events = self.scan_window(artifact_id, window_millis, now_millis)?;
        if events.len() > max_events {
            events.drain(..events.len() - max_events);
        }
        Ok(events)
    }

    /// All events for an artifact, oldest first. Operator/status surface.
    pub fn events_for(&self, artifact_id: ArtifactId) -> Result<Vec<AccessEvent>> {
        self.scan_window(artifact_id, u64::MAX, u64::MAX)
    }

    fn scan_window(
        &self,
        artifact_id: ArtifactId,
        window_millis: u64,
        now_millis: u64,
    ) -> Result<Vec<AccessEvent>> {
        let since = now_millis.saturating_sub(window_millis);
        let start = event_key(artifact_id, since, 0);
        let end = event_key(artifact_id, u64::MAX, u64::MAX);

        let mut events = Vec::new();
        for entry in self.events.range(start..=end) {
            let (_, value) = entry?;
            let event: AccessEvent = serde_json::from_slice(&value)?;
            events.push(event);
        }
        Ok(events)
    }

    /// Number of stored events across all artifacts.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Flushes all pending writes to disk.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for AccessLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLedger")
            .field("events", &self.len())
            .finish()
    }
}

/// Event key: artifact id (16) + recorded_at big-endian (8) + seq (8).
fn event_key(artifact_id: ArtifactId, recorded_at: u64, seq: u64) -> [u8; 32] {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(artifact_id.as_bytes());
    key[16..24].copy_from_slice(&recorded_at.to_be_bytes());
    key[24..].copy_from_slice(&seq.to_be_bytes());
    key
}

/// Counter key: artifact id (16) + action tag (1).
fn counter_key(artifact_id: ArtifactId, action: ActionKind) -> [u8; 17] {
    let mut key = [0u8; 17];
    key[..16].copy_from_slice(artifact_id.as_bytes());
    key[16] = action.as_byte();
    key
}

fn decode_count(raw: &[u8]) -> std::result::Result<u64, LedgerError> {
    let bytes: [u8; 8] = raw
        .try_into()
        .map_err(|_| LedgerError::Corrupt(format!("counter value of {} bytes", raw.len())))?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(artifact: ArtifactId, fp: &str, at: u64) -> NewAccessEvent {
        NewAccessEvent::new(artifact, fp, "bucket-a", ActionKind::View, at)
    }

    #[test]
    fn test_record_returns_post_insert_count() {
        let ledger = AccessLedger::temporary().unwrap();
        let artifact = ArtifactId::new();

        let first = ledger.record(view(artifact, "fp-1", 1_000)).unwrap();
        let second = ledger.record(view(artifact, "fp-2", 2_000)).unwrap();

        assert_eq!(first.count_for_action, 1);
        assert_eq!(second.count_for_action, 2);
        assert_ne!(first.event_id, second.event_id);
    }

    #[test]
    fn test_counts_are_per_action() {
        let ledger = AccessLedger::temporary().unwrap();
        let artifact = ArtifactId::new();

        ledger.record(view(artifact, "fp-1", 1_000)).unwrap();
        ledger
            .record(NewAccessEvent::new(artifact, "fp-1", "bucket-a", ActionKind::Denied, 1_100))
            .unwrap();

        assert_eq!(ledger.count(artifact, ActionKind::View).unwrap(), 1);
        assert_eq!(ledger.count(artifact, ActionKind::Denied).unwrap(), 1);
        assert_eq!(ledger.count(artifact, ActionKind::Zoom).unwrap(), 0);
    }

    #[test]
    fn test_counts_are_per_artifact() {
        let ledger = AccessLedger::temporary().unwrap();
        let a = ArtifactId::new();
        let b = ArtifactId::new();

        ledger.record(view(a, "fp-1", 1_000)).unwrap();
        ledger.record(view(a, "fp-1", 2_000)).unwrap();
        ledger.record(view(b, "fp-1", 3_000)).unwrap();

        assert_eq!(ledger.count(a, ActionKind::View).unwrap(), 2);
        assert_eq!(ledger.count(b, ActionKind::View).unwrap(), 1);
    }

    #[test]
    fn test_count_since_respects_window() {
        let ledger = AccessLedger::temporary().unwrap();
        let artifact = ArtifactId::new();

        ledger.record(view(artifact, "fp-1", 1_000)).unwrap();
        ledger.record(view(artifact, "fp-2", 2_000)).unwrap();
        ledger.record(view(artifact, "fp-3", 3_000)).unwrap();

        // Window of 1500ms ending at t=3000 covers t>=1500.
        let windowed = ledger
            .count_since(artifact, ActionKind::View, 1_500, 3_000)
            .unwrap();
        assert_eq!(windowed, 2);

        // Lifetime count is unaffected.
        assert_eq!(ledger.count(artifact, ActionKind::View).unwrap(), 3);
    }

    #[test]
    fn test_recent_window_truncates_to_most_recent() {
        let ledger = AccessLedger::temporary().unwrap();
        let artifact = ArtifactId::new();

        for i in 0..10u64 {
            ledger.record(view(artifact, &format!("fp-{}", i), 1_000 + i)).unwrap();
        }

        let window = ledger.recent_window(artifact, 60_000, 4, 2_000).unwrap();
        assert_eq!(window.len(), 4);
        // Oldest-first ordering, truncated from the front.
        assert_eq!(window[0].actor_fingerprint, "fp-6");
        assert_eq!(window[3].actor_fingerprint, "fp-9");
    }

    #[test]
    fn test_events_for_returns_everything_in_order() {
        let ledger = AccessLedger::temporary().unwrap();
        let artifact = ArtifactId::new();

        ledger.record(view(artifact, "fp-1", 5_000)).unwrap();
        ledger.record(view(artifact, "fp-2", 1_000)).unwrap();

        let events = ledger.events_for(artifact).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].recorded_at, 1_000);
        assert_eq!(events[1].recorded_at, 5_000);
    }

    #[test]
    fn test_concurrent_records_never_under_count() {
        let ledger = AccessLedger::temporary().unwrap();
        let artifact = ArtifactId::new();

        let threads = 8;
        let per_thread = 25;
        let mut handles = Vec::new();
        for t in 0..threads {
            let ledger = ledger.clone();
            handles.push(std::thread::spawn(move || {
                let mut counts = Vec::new();
                for i in 0..per_thread {
                    let fp = format!("fp-{}-{}", t, i);
                    let recorded = ledger.record(view(artifact, &fp, 1_000)).unwrap();
                    counts.push(recorded.count_for_action);
                }
                counts
            }));
        }

        let mut observed: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        observed.sort_unstable();

        // Every record saw a distinct post-insert count: no two racing
        // inserts ever read the same counter value.
        let expected: Vec<u64> = (1..=(threads * per_thread) as u64).collect();
        assert_eq!(observed, expected);
        assert_eq!(
            ledger.count(artifact, ActionKind::View).unwrap(),
            (threads * per_thread) as u64
        );
    }
}
