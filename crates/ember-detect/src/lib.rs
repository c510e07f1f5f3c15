//! # Ember Anomaly Detector
//!
//! Consumes windows of the Access Ledger and emits scored security
//! signals. Detection is a pure function of the window: no storage
//! access, no side effects, and no knowledge of burn policy. Signals are
//! advisory inputs to the lifecycle controller; the split keeps
//! detection thresholds and burn thresholds independently tunable.
//!
//! ## Heuristics
//!
//! | Pattern | Condition | Confidence | Severity |
//! |---------|-----------|------------|----------|
//! | FingerprintHopping | distinct fingerprints / events > 0.8, ≥ 5 events | 0.85 | High |
//! | DistributedBurst | ≥ 10 events, ≥ N buckets inside a short sub-interval | 0.92 | Critical |
//! | RateAnomaly | event rate over threshold | scales | Medium/High/Critical |
//!
//! The numeric contracts above are behavioral-compatibility constants
//! carried in [`DetectorConfig`], not validated risk models. Tune them in
//! configuration, not in code.

mod detector;
mod models;

pub use detector::{evaluate, DetectorConfig};
pub use models::{Severity, SecuritySignal, SignalPattern};
