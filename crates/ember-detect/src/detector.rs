//! The three window heuristics.
//!
//! Each heuristic is a pure, independently testable function from an
//! event window to an optional signal. `evaluate` runs all of them and
//! collects whatever fired.

use std::collections::HashSet;

use ember_ledger::{AccessEvent, ArtifactId};

use crate::models::{Severity, SecuritySignal, SignalPattern};

/// Tunable detection thresholds.
///
/// Defaults are the engine's behavioral contract numbers. They are
/// heuristic placeholders inherited from the product's risk model, not
/// validated thresholds; keep them configurable.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Evaluation window length in milliseconds.
    pub window_millis: u64,
    /// Maximum events considered per evaluation.
    pub max_window_events: usize,
    /// Distinct-fingerprint ratio above which hopping fires.
    pub hopping_ratio: f64,
    /// Minimum window size for the hopping heuristic.
    pub min_hopping_events: usize,
    /// Minimum window size for the burst heuristic.
    pub min_burst_events: usize,
    /// Distinct network-address buckets required for a burst.
    pub min_burst_buckets: usize,
    /// A burst sub-interval must be shorter than this fraction of the
    /// full window span.
    pub burst_fraction: f64,
}

impl DetectorConfig {
    /// Contract defaults: 5-minute / 50-event window, 0.8 hopping ratio
    /// over ≥ 5 events, bursts of ≥ 3 buckets within half the span of a
    /// ≥ 10 event window.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            window_millis: 5 * 60 * 1_000,
            max_window_events: 50,
            hopping_ratio: 0.8,
            min_hopping_events: 5,
            min_burst_events: 10,
            min_burst_buckets: 3,
            burst_fraction: 0.5,
        }
    }

    /// Sets the evaluation window length.
    #[must_use]
    pub const fn with_window_millis(mut self, millis: u64) -> Self {
        self.window_millis = millis;
        self
    }

    /// Sets the distinct-bucket requirement for bursts.
    #[must_use]
    pub const fn with_min_burst_buckets(mut self, buckets: usize) -> Self {
        self.min_burst_buckets = buckets;
        self
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluates every heuristic over one window.
///
/// `rate_threshold_per_sec` is the per-artifact rate limit from the
/// artifact's security policy; detection deliberately does not know how
/// the caller will act on the result.
#[must_use]
pub fn evaluate(
    artifact_id: ArtifactId,
    window: &[AccessEvent],
    config: &DetectorConfig,
    rate_threshold_per_sec: f64,
    now_millis: u64,
) -> Vec<SecuritySignal> {
    let mut signals = Vec::new();

    if let Some((confidence, severity)) = fingerprint_hopping(window, config) {
        signals.push(SecuritySignal {
            artifact_id,
            pattern: SignalPattern::FingerprintHopping,
            confidence,
            severity,
            detected_at: now_millis,
        });
    }
    if let Some((confidence, severity)) = distributed_burst(window, config) {
        signals.push(SecuritySignal {
            artifact_id,
            pattern: SignalPattern::DistributedBurst,
            confidence,
            severity,
            detected_at: now_millis,
        });
    }
    if let Some((confidence, severity)) = rate_anomaly(window, config, rate_threshold_per_sec) {
        signals.push(SecuritySignal {
            artifact_id,
            pattern: SignalPattern::RateAnomaly,
            confidence,
            severity,
            detected_at: now_millis,
        });
    }

    signals
}

/// Fires when the window is dominated by distinct actor fingerprints.
fn fingerprint_hopping(window: &[AccessEvent], config: &DetectorConfig) -> Option<(f64, Severity)> {
    if window.len() < config.min_hopping_events {
        return None;
    }
    let distinct: HashSet<&str> = window.iter().map(|e| e.actor_fingerprint.as_str()).collect();
    let ratio = distinct.len() as f64 / window.len() as f64;
    if ratio > config.hopping_ratio {
        Some((0.85, Severity::High))
    } else {
        None
    }
}

/// Fires when enough distinct network buckets land inside a sub-interval
/// much shorter than the window span.
fn distributed_burst(window: &[AccessEvent], config: &DetectorConfig) -> Option<(f64, Severity)> {
    if window.len() < config.min_burst_events {
        return None;
    }

    let span = window.last()?.recorded_at.saturating_sub(window.first()?.recorded_at);
    if span == 0 {
        // Everything landed in the same instant: maximally dense. Fires
        // iff the bucket requirement is met at all.
        let buckets: HashSet<&str> = window.iter().map(|e| e.ip_bucket.as_str()).collect();
        return (buckets.len() >= config.min_burst_buckets).then_some((0.92, Severity::Critical));
    }
    let limit = (span as f64 * config.burst_fraction) as u64;

    // Two-pointer sweep for the densest sub-interval reaching the
    // bucket requirement. Events arrive oldest-first.
    let mut counts: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    let mut start = 0;
    for end in 0..window.len() {
        *counts.entry(window[end].ip_bucket.as_str()).or_insert(0) += 1;
        while counts.len() >= config.min_burst_buckets {
            let sub = window[end].recorded_at.saturating_sub(window[start].recorded_at);
            if sub < limit {
                return Some((0.92, Severity::Critical));
            }
            let bucket = window[start].ip_bucket.as_str();
            if let Some(count) = counts.get_mut(bucket) {
                *count -= 1;
                if *count == 0 {
                    counts.remove(bucket);
                }
            }
            start += 1;
        }
    }
    None
}

/// Fires when the windowed event rate exceeds the artifact's threshold.
///
/// Severity scales with the overshoot: 1–2x is Medium, 2–5x High,
/// beyond 5x Critical.
fn rate_anomaly(
    window: &[AccessEvent],
    config: &DetectorConfig,
    threshold_per_sec: f64,
) -> Option<(f64, Severity)> {
    if window.is_empty() || threshold_per_sec <= 0.0 {
        return None;
    }
    let window_secs = config.window_millis as f64 / 1_000.0;
    let rate = window.len() as f64 / window_secs;
    let ratio = rate / threshold_per_sec;
    if ratio <= 1.0 {
        return None;
    }

    let severity = if ratio <= 2.0 {
        Severity::Medium
    } else if ratio <= 5.0 {
        Severity::High
    } else {
        Severity::Critical
    };
    // Sigmoid on the overshoot keeps confidence in (0.5, 1.0).
    let confidence = ratio / (ratio + 1.0);
    Some((confidence, severity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ledger::{ActionKind, EventId};

    fn event(artifact: ArtifactId, fp: &str, bucket: &str, at: u64) -> AccessEvent {
        AccessEvent {
            id: EventId::new(),
            artifact_id: artifact,
            actor_fingerprint: fp.to_string(),
            ip_bucket: bucket.to_string(),
            action: ActionKind::View,
            recorded_at: at,
        }
    }

    fn hopping_window(artifact: ArtifactId, fingerprints: &[&str]) -> Vec<AccessEvent> {
        fingerprints
            .iter()
            .enumerate()
            .map(|(i, fp)| event(artifact, fp, "bucket-a", 1_000 + i as u64))
            .collect()
    }

    #[test]
    fn test_hopping_fires_at_full_ratio() {
        let artifact = ArtifactId::new();
        let window = hopping_window(artifact, &["a", "b", "c", "d", "e"]);
        let signals = evaluate(artifact, &window, &DetectorConfig::new(), 0.0, 2_000);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].pattern, SignalPattern::FingerprintHopping);
        assert!((signals[0].confidence - 0.85).abs() < f64::EPSILON);
        assert_eq!(signals[0].severity, Severity::High);
    }

    #[test]
    fn test_hopping_silent_at_low_ratio() {
        let artifact = ArtifactId::new();
        let window = hopping_window(artifact, &["a", "a", "a", "b", "b"]);
        let signals = evaluate(artifact, &window, &DetectorConfig::new(), 0.0, 2_000);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_hopping_needs_minimum_window() {
        let artifact = ArtifactId::new();
        // Ratio 1.0 but only 4 events.
        let window = hopping_window(artifact, &["a", "b", "c", "d"]);
        let signals = evaluate(artifact, &window, &DetectorConfig::new(), 0.0, 2_000);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_burst_fires_on_packed_buckets() {
        let artifact = ArtifactId::new();
        // 10 events over a 10s span; three buckets all inside the first
        // 300ms, well under half the span.
        let mut window = vec![
            event(artifact, "fp", "bucket-a", 0),
            event(artifact, "fp", "bucket-b", 100),
            event(artifact, "fp", "bucket-c", 200),
        ];
        for i in 0..7u64 {
            window.push(event(artifact, "fp", "bucket-a", 2_000 + i * 1_000));
        }
        let signals = evaluate(artifact, &window, &DetectorConfig::new(), 0.0, 11_000);

        assert!(signals
            .iter()
            .any(|s| s.pattern == SignalPattern::DistributedBurst
                && s.severity == Severity::Critical
                && (s.confidence - 0.92).abs() < f64::EPSILON));
    }

    #[test]
    fn test_burst_silent_when_buckets_spread_out() {
        let artifact = ArtifactId::new();
        // Three buckets, but each confined to its own stretch of the
        // span: the tightest sub-interval touching all three still
        // covers more than half the window.
        let mut window = Vec::new();
        for i in 0..5u64 {
            window.push(event(artifact, "fp", "bucket-a", i * 4_000));
        }
        for i in 0..5u64 {
            window.push(event(artifact, "fp", "bucket-b", 20_000 + i * 4_000));
        }
        window.push(event(artifact, "fp", "bucket-c", 40_000));
        window.push(event(artifact, "fp", "bucket-c", 44_000));

        let signals = evaluate(artifact, &window, &DetectorConfig::new(), 0.0, 60_000);
        assert!(!signals.iter().any(|s| s.pattern == SignalPattern::DistributedBurst));
    }

    #[test]
    fn test_burst_silent_below_minimum_events() {
        let artifact = ArtifactId::new();
        let window = vec![
            event(artifact, "fp", "bucket-a", 0),
            event(artifact, "fp", "bucket-b", 1),
            event(artifact, "fp", "bucket-c", 2),
        ];
        let signals = evaluate(artifact, &window, &DetectorConfig::new(), 0.0, 1_000);
        assert!(!signals.iter().any(|s| s.pattern == SignalPattern::DistributedBurst));
    }

    #[test]
    fn test_rate_severity_scaling() {
        let artifact = ArtifactId::new();
        let config = DetectorConfig::new().with_window_millis(10_000);

        // 10s window. Threshold 0.1/s => overshoot ratio is len / 1.0.
        let make = |n: u64| -> Vec<AccessEvent> {
            (0..n).map(|i| event(artifact, "fp", "bucket-a", i)).collect()
        };

        let rate_signal = |window: &[AccessEvent]| {
            evaluate(artifact, window, &config, 0.1, 20_000)
                .into_iter()
                .find(|s| s.pattern == SignalPattern::RateAnomaly)
        };

        // At the threshold: silent.
        assert!(rate_signal(&make(1)).is_none());
        // 2x threshold: Medium.
        assert_eq!(rate_signal(&make(2)).unwrap().severity, Severity::Medium);
        // 4x threshold: High.
        assert_eq!(rate_signal(&make(4)).unwrap().severity, Severity::High);
        // 8x threshold: Critical.
        let critical = rate_signal(&make(8)).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        assert!(critical.confidence > 0.8 && critical.confidence < 1.0);
    }

    #[test]
    fn test_empty_window_is_silent() {
        let artifact = ArtifactId::new();
        let signals = evaluate(artifact, &[], &DetectorConfig::new(), 10.0, 1_000);
        assert!(signals.is_empty());
    }
}
