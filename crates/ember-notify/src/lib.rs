//! # Ember Notification Fan-out
//!
//! Dispatches recipient notifications in parallel against an external
//! messaging gateway, tolerating per-recipient failure. A burn event may
//! fan out to dozens of recipients; one dead phone number must never
//! block the lifecycle transition that triggered it.
//!
//! Guarantees:
//!
//! - Bounded concurrency: at most `max_concurrency` in-flight sends.
//! - Bounded latency: each send is cut off at the per-recipient timeout
//!   and marked `Failed("timeout")`.
//! - No synchronous retries: a failed recipient is recorded for
//!   out-of-band retry, never re-attempted within the same dispatch
//!   (no retry storms during a burn event).
//! - The batch always completes: failures are collected, not raised.

mod dispatcher;
mod gateway;

pub use dispatcher::{DeliveryOutcome, DispatchReport, Dispatcher, DispatcherConfig, RecipientResult};
pub use gateway::{GatewayError, NotificationGateway, RecipientHandle};
