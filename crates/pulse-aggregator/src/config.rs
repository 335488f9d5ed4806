//! Aggregator configuration

use pulse_core::HealthRecord;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback fired once per applied update, in apply order
///
/// Invocations are serialized with respect to each other; the callback never
/// runs concurrently with itself.
pub type StatusCallback = Arc<dyn Fn(&str, &HealthRecord) + Send + Sync>;

/// Configuration for a [`HealthAggregator`](crate::HealthAggregator)
///
/// Immutable once the aggregator is constructed.
#[derive(Clone)]
pub struct AggregatorConfig {
    /// Age beyond which a record is treated as failing regardless of its
    /// last recorded result
    pub expiry_time: Duration,

    /// Capacity of the update channel; submitters wait when it is full
    pub update_buffer: usize,

    /// Optional status-change callback
    pub on_status_change: Option<StatusCallback>,

    /// Whether the auto-check scheduler runs
    pub auto_check_enabled: bool,

    /// Period between auto-check rounds
    pub check_interval: Duration,

    /// Delay before the scheduler's first round
    pub initial_delay: Duration,

    /// Ceiling for per-checker backoff
    pub max_backoff: Duration,

    /// Multiplier applied to a checker's backoff on each consecutive
    /// failure; values below 1.0 shrink the backoff instead of growing it
    pub backoff_factor: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            expiry_time: Duration::from_secs(30),
            update_buffer: 100,
            on_status_change: None,
            auto_check_enabled: false,
            check_interval: Duration::from_secs(5),
            initial_delay: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl AggregatorConfig {
    /// Create a configuration with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staleness threshold for health records
    pub fn with_expiry_time(mut self, expiry: Duration) -> Self {
        self.expiry_time = expiry;
        self
    }

    /// Set the update channel capacity
    pub fn with_update_buffer(mut self, size: usize) -> Self {
        self.update_buffer = size;
        self
    }

    /// Install a status-change callback
    pub fn with_status_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, &HealthRecord) + Send + Sync + 'static,
    {
        self.on_status_change = Some(Arc::new(callback));
        self
    }

    /// Enable the auto-check scheduler with the given period
    pub fn with_auto_check(mut self, interval: Duration) -> Self {
        self.auto_check_enabled = true;
        self.check_interval = interval;
        self
    }

    /// Set the delay before the scheduler's first round
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff ceiling and growth factor for failing checkers
    pub fn with_backoff(mut self, max_backoff: Duration, factor: f64) -> Self {
        self.max_backoff = max_backoff;
        self.backoff_factor = factor;
        self
    }
}

impl fmt::Debug for AggregatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatorConfig")
            .field("expiry_time", &self.expiry_time)
            .field("update_buffer", &self.update_buffer)
            .field("on_status_change", &self.on_status_change.is_some())
            .field("auto_check_enabled", &self.auto_check_enabled)
            .field("check_interval", &self.check_interval)
            .field("initial_delay", &self.initial_delay)
            .field("max_backoff", &self.max_backoff)
            .field("backoff_factor", &self.backoff_factor)
            .finish()
    }
}
