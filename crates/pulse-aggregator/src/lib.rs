//! # Pulse Aggregator
//!
//! Aggregates liveness and readiness signals from independently-owned
//! checkers into two service-level verdicts with priority-aware failure
//! attribution:
//! - Concurrent status store with insert-or-replace registration
//! - Asynchronous, buffered update pipeline with a single consumer task
//! - Optional periodic auto-check scheduler with per-checker exponential
//!   backoff
//! - Fail-fast priority-ordered queries with staleness expiry
//!
//! Every aggregator is an explicit instance owning its own store, channel,
//! and shutdown signal; independent instances coexist freely.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod aggregator;
pub mod config;
mod pipeline;
mod scheduler;
pub mod shutdown;

pub use aggregator::{HealthAggregator, OverallHealth};
pub use config::{AggregatorConfig, StatusCallback};
pub use shutdown::{ShutdownSignal, SignalHandler};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::aggregator::{HealthAggregator, OverallHealth};
    pub use crate::config::{AggregatorConfig, StatusCallback};
    pub use crate::shutdown::{ShutdownSignal, SignalHandler};
    pub use pulse_core::{Axis, Error, HealthCheck, HealthRecord, Priority, Result};
}
