//! Bounded-parallel dispatch with per-recipient results.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::gateway::{NotificationGateway, RecipientHandle};

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Maximum concurrent in-flight sends.
    pub max_concurrency: usize,
    /// Per-recipient send timeout.
    pub recipient_timeout: Duration,
}

impl DispatcherConfig {
    /// Defaults: 8 concurrent sends, 5 second per-recipient timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_concurrency: 8,
            recipient_timeout: Duration::from_secs(5),
        }
    }

    /// Sets the concurrency bound.
    #[must_use]
    pub const fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Sets the per-recipient timeout.
    #[must_use]
    pub const fn with_recipient_timeout(mut self, timeout: Duration) -> Self {
        self.recipient_timeout = timeout;
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one recipient's notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The gateway accepted the message.
    Sent,
    /// The send failed; recorded for out-of-band retry.
    Failed {
        /// Gateway error or "timeout".
        reason: String,
    },
}

impl DeliveryOutcome {
    /// Returns true for a successful delivery.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// One recipient's result within a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientResult {
    pub recipient: RecipientHandle,
    pub outcome: DeliveryOutcome,
}

/// Aggregate result of one fan-out.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    /// Per-recipient outcomes, in completion order.
    pub results: Vec<RecipientResult>,
}

impl DispatchReport {
    /// Number of successful deliveries.
    #[must_use]
    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_sent()).count()
    }

    /// Number of failed deliveries.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.successful_count()
    }

    /// Recipients that failed, for out-of-band retry queues.
    pub fn failed_recipients(&self) -> impl Iterator<Item = &RecipientHandle> {
        self.results
            .iter()
            .filter(|r| !r.outcome.is_sent())
            .map(|r| &r.recipient)
    }
}

/// Parallel notification dispatcher.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new(DispatcherConfig::new());
/// let report = dispatcher.dispatch(gateway, recipients, "menu refreshed").await;
/// info!("notified {}/{}", report.successful_count(), report.results.len());
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Creates a dispatcher with the given configuration.
    #[must_use]
    pub const fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Fans one message out to every recipient.
    ///
    /// Always returns a complete report: per-recipient failures and
    /// timeouts are collected as `Failed` outcomes, never raised. One
    /// recipient's failure cannot abort the batch, and nothing here
    /// retries synchronously.
    pub async fn dispatch(
        &self,
        gateway: Arc<dyn NotificationGateway>,
        recipients: Vec<RecipientHandle>,
        message: &str,
    ) -> DispatchReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let timeout = self.config.recipient_timeout;
        let mut tasks = JoinSet::new();

        for recipient in recipients {
            let gateway = Arc::clone(&gateway);
            let semaphore = Arc::clone(&semaphore);
            let message = message.to_string();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return RecipientResult {
                            recipient,
                            outcome: DeliveryOutcome::Failed {
                                reason: "dispatcher shut down".to_string(),
                            },
                        }
                    }
                };

                let outcome =
                    match tokio::time::timeout(timeout, gateway.send(&recipient, &message)).await {
                        Ok(Ok(())) => DeliveryOutcome::Sent,
                        Ok(Err(e)) => DeliveryOutcome::Failed { reason: e.to_string() },
                        Err(_) => DeliveryOutcome::Failed { reason: "timeout".to_string() },
                    };
                RecipientResult { recipient, outcome }
            });
        }

        let mut report = DispatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if let DeliveryOutcome::Failed { reason } = &result.outcome {
                        warn!(recipient = %result.recipient, %reason, "notification failed");
                    } else {
                        debug!(recipient = %result.recipient, "notification sent");
                    }
                    report.results.push(result);
                }
                // A panicked send task loses its recipient handle; the
                // failure is still visible in the logs and the report
                // simply has one fewer row than the input.
                Err(e) => warn!("notification task failed to join: {}", e),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scriptable gateway: per-recipient behavior, concurrency tracking.
    #[derive(Default)]
    struct MockGateway {
        /// Recipients that should fail with a rejection.
        reject: Vec<String>,
        /// Recipients that should hang past any reasonable timeout.
        hang: Vec<String>,
        delivered: std::sync::Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl NotificationGateway for MockGateway {
        async fn send(&self, recipient: &RecipientHandle, _message: &str) -> Result<(), GatewayError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let result = if self.hang.iter().any(|r| r == recipient.as_str()) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            } else if self.reject.iter().any(|r| r == recipient.as_str()) {
                Err(GatewayError::Rejected("blocked".to_string()))
            } else {
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.delivered.lock().unwrap().push(recipient.as_str().to_string());
                Ok(())
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn recipients(names: &[&str]) -> Vec<RecipientHandle> {
        names.iter().map(|n| RecipientHandle::from(*n)).collect()
    }

    #[tokio::test]
    async fn test_all_recipients_notified() {
        let gateway = Arc::new(MockGateway::default());
        let dispatcher = Dispatcher::new(DispatcherConfig::new());

        let report = dispatcher
            .dispatch(gateway.clone(), recipients(&["a", "b", "c"]), "hello")
            .await;

        assert_eq!(report.successful_count(), 3);
        assert_eq!(report.failed_count(), 0);
        assert_eq!(gateway.delivered.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let gateway = Arc::new(MockGateway {
            reject: vec!["bad".to_string()],
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(DispatcherConfig::new());

        let report = dispatcher
            .dispatch(gateway, recipients(&["a", "bad", "c"]), "hello")
            .await;

        assert_eq!(report.successful_count(), 2);
        assert_eq!(report.failed_count(), 1);
        let failed: Vec<_> = report.failed_recipients().map(|r| r.as_str()).collect();
        assert_eq!(failed, vec!["bad"]);
    }

    #[tokio::test]
    async fn test_hung_recipient_times_out() {
        let gateway = Arc::new(MockGateway {
            hang: vec!["slow".to_string()],
            ..Default::default()
        });
        let config = DispatcherConfig::new().with_recipient_timeout(Duration::from_millis(50));
        let dispatcher = Dispatcher::new(config);

        let report = dispatcher
            .dispatch(gateway, recipients(&["a", "slow"]), "hello")
            .await;

        assert_eq!(report.successful_count(), 1);
        let failed: Vec<_> = report
            .results
            .iter()
            .filter(|r| !r.outcome.is_sent())
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(
            failed[0].outcome,
            DeliveryOutcome::Failed { reason: "timeout".to_string() }
        );
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let gateway = Arc::new(MockGateway::default());
        let config = DispatcherConfig::new().with_max_concurrency(2);
        let dispatcher = Dispatcher::new(config);

        let names: Vec<String> = (0..20).map(|i| format!("r{}", i)).collect();
        let handles = names.iter().map(|n| RecipientHandle::new(n)).collect();
        let report = dispatcher.dispatch(gateway.clone(), handles, "hello").await;

        assert_eq!(report.successful_count(), 20);
        assert!(gateway.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_empty_recipient_list() {
        let gateway = Arc::new(MockGateway::default());
        let dispatcher = Dispatcher::new(DispatcherConfig::new());

        let report = dispatcher.dispatch(gateway, Vec::new(), "hello").await;
        assert_eq!(report.successful_count(), 0);
        assert_eq!(report.failed_count(), 0);
    }
}
