//! Signal types emitted by the detector.

use ember_ledger::ArtifactId;
use serde::{Deserialize, Serialize};

/// The access pattern a signal describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalPattern {
    /// Many distinct actor fingerprints inside one window: the link is
    /// being passed around or scraped from multiple devices.
    FingerprintHopping,

    /// Events from many network-address buckets packed into a short
    /// sub-interval: coordinated, distributed access.
    DistributedBurst,

    /// Raw event rate above the artifact's configured threshold.
    RateAnomaly,
}

impl std::fmt::Display for SignalPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FingerprintHopping => "fingerprint-hopping",
            Self::DistributedBurst => "distributed-burst",
            Self::RateAnomaly => "rate-anomaly",
        };
        f.write_str(name)
    }
}

/// Severity of a signal, totally ordered so burn policy can be expressed
/// as "at or above this level".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// One scored security signal.
///
/// Ephemeral derived data: signals are recomputed per evaluation window
/// and never persisted as a source of truth. The Access Ledger remains
/// authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecuritySignal {
    /// Artifact the signal concerns.
    pub artifact_id: ArtifactId,
    /// Detected pattern.
    pub pattern: SignalPattern,
    /// Detector confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Severity for policy threshold comparison.
    pub severity: Severity,
    /// Unix milliseconds at evaluation time.
    pub detected_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_signal_serialization_round_trip() {
        let signal = SecuritySignal {
            artifact_id: ArtifactId::new(),
            pattern: SignalPattern::DistributedBurst,
            confidence: 0.92,
            severity: Severity::Critical,
            detected_at: 1_000,
        };
        let json = serde_json::to_string(&signal).unwrap();
        let parsed: SecuritySignal = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, parsed);
    }
}
