//! Engine configuration.

use ember_detect::DetectorConfig;
use ember_notify::DispatcherConfig;

/// Configuration for the access engine.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Anomaly detector thresholds.
    pub detector: DetectorConfig,
    /// Notification fan-out limits.
    pub dispatcher: DispatcherConfig,
}

impl EngineConfig {
    /// Defaults for every component.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the detector configuration.
    #[must_use]
    pub fn with_detector(mut self, detector: DetectorConfig) -> Self {
        self.detector = detector;
        self
    }

    /// Replaces the dispatcher configuration.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: DispatcherConfig) -> Self {
        self.dispatcher = dispatcher;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.detector.max_window_events, 50);
        assert_eq!(config.dispatcher.max_concurrency, 8);
    }
}
