//! The health aggregator: status store, registration, queries, lifecycle

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use pulse_core::{Axis, Error, HealthCheck, HealthRecord, Priority, Result};

use crate::config::AggregatorConfig;
use crate::pipeline::{self, Update};
use crate::scheduler;
use crate::shutdown::ShutdownSignal;

/// Per-checker scheduler bookkeeping
///
/// `current` is zero while the checker is not in backoff. `last_attempt` is
/// stamped every time the scheduler actually probes the checker, regardless
/// of the outcome.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BackoffState {
    pub(crate) current: Duration,
    pub(crate) last_attempt: Option<Instant>,
}

/// Everything guarded by the single store lock
///
/// Records, the checker roster, and backoff bookkeeping share one lock:
/// queries take it shared, registration and the pipeline take it exclusive.
/// Records live in a `BTreeMap` so that queries visit checkers within a
/// priority tier in ascending identity order.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) records: BTreeMap<String, HealthRecord>,
    pub(crate) checkers: BTreeMap<String, Arc<dyn HealthCheck>>,
    pub(crate) backoff: HashMap<String, BackoffState>,
}

pub(crate) struct Inner {
    pub(crate) config: AggregatorConfig,
    pub(crate) registry: RwLock<Registry>,
    pub(crate) update_tx: mpsc::Sender<Update>,
    update_rx: Mutex<Option<mpsc::Receiver<Update>>>,
    pub(crate) shutdown: ShutdownSignal,
}

impl Inner {
    /// Hand a finished record to the pipeline; waits while the buffer is full
    pub(crate) async fn send_update(&self, name: String, record: HealthRecord) -> Result<()> {
        self.update_tx
            .send(Update { name, record })
            .await
            .map_err(|_| Error::Stopped)
    }
}

/// Combined result of both aggregate queries
#[derive(Debug, Clone)]
pub struct OverallHealth {
    /// Liveness verdict
    pub liveness: bool,
    /// Readiness verdict
    pub readiness: bool,
    /// Failure attribution for the liveness verdict
    pub liveness_errors: BTreeMap<String, Error>,
    /// Failure attribution for the readiness verdict
    pub readiness_errors: BTreeMap<String, Error>,
}

impl OverallHealth {
    /// Whether both verdicts passed
    pub fn is_healthy(&self) -> bool {
        self.liveness && self.readiness
    }
}

/// Aggregates health checkers into service-level liveness and readiness
///
/// Cloning yields another handle to the same aggregator. Results reach the
/// store either through [`submit`](Self::submit) or, when auto-checking is
/// enabled, through the background scheduler; all store writes flow through
/// the single pipeline consumer started by [`start`](Self::start).
///
/// # Example
///
/// ```no_run
/// use pulse_aggregator::{AggregatorConfig, HealthAggregator};
/// use pulse_core::Priority;
/// use std::time::Duration;
///
/// # async fn example(database: std::sync::Arc<dyn pulse_core::HealthCheck>) {
/// let aggregator = HealthAggregator::new(
///     AggregatorConfig::new()
///         .with_expiry_time(Duration::from_secs(30))
///         .with_auto_check(Duration::from_secs(5)),
/// );
/// aggregator.register(database, Priority::Critical);
/// aggregator.start();
///
/// let (alive, _) = aggregator.liveness();
/// assert!(!alive); // nothing confirmed until the first result lands
/// # }
/// ```
#[derive(Clone)]
pub struct HealthAggregator {
    inner: Arc<Inner>,
}

impl HealthAggregator {
    /// Create an aggregator with the given configuration
    ///
    /// Background tasks are not launched until [`start`](Self::start).
    pub fn new(config: AggregatorConfig) -> Self {
        let (update_tx, update_rx) = mpsc::channel(config.update_buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                config,
                registry: RwLock::new(Registry::default()),
                update_tx,
                update_rx: Mutex::new(Some(update_rx)),
                shutdown: ShutdownSignal::new(),
            }),
        }
    }

    /// Create an aggregator with default configuration
    pub fn with_defaults() -> Self {
        Self::new(AggregatorConfig::default())
    }

    /// Register a checker under a priority tier
    ///
    /// Inserts or replaces the record for the checker's name with the
    /// unknown state and a fresh timestamp. Re-registering under the same
    /// name is legal and silently resets the recorded state.
    pub fn register(&self, checker: Arc<dyn HealthCheck>, priority: Priority) {
        let name = checker.name().to_string();
        let mut registry = self.inner.registry.write();
        registry
            .records
            .insert(name.clone(), HealthRecord::unknown(priority));
        registry.checkers.insert(name.clone(), checker);
        debug!(name, %priority, "health check registered");
    }

    /// Submit a pair of probe outcomes for a registered checker
    ///
    /// The record's priority is copied from the registration. Submissions
    /// for names that were never registered are silently dropped. Waits
    /// while the update buffer is full; returns [`Error::Stopped`] if the
    /// aggregator shut down before the update could be accepted.
    pub async fn submit(
        &self,
        name: &str,
        liveness: Result<()>,
        readiness: Result<()>,
    ) -> Result<()> {
        let priority = {
            let registry = self.inner.registry.read();
            match registry.records.get(name) {
                Some(record) => record.priority,
                None => {
                    trace!(name, "update for unregistered checker dropped");
                    return Ok(());
                }
            }
        };

        let record = HealthRecord::from_probes(priority, liveness, readiness);
        self.inner.send_update(name.to_string(), record).await
    }

    /// Launch the update pipeline and, if enabled, the auto-check scheduler
    ///
    /// Calling `start` more than once is a warning-level no-op.
    pub fn start(&self) {
        let Some(update_rx) = self.inner.update_rx.lock().take() else {
            warn!("health aggregator already started");
            return;
        };

        tokio::spawn(pipeline::run(
            self.inner.clone(),
            update_rx,
            self.inner.shutdown.subscribe(),
        ));

        if self.inner.config.auto_check_enabled {
            tokio::spawn(scheduler::run(
                self.inner.clone(),
                self.inner.shutdown.subscribe(),
            ));
        }

        info!(
            auto_check = self.inner.config.auto_check_enabled,
            "health aggregator started"
        );
    }

    /// Stop the background tasks
    ///
    /// Cancels the shared shutdown signal; the pipeline and scheduler exit
    /// at their next blocking point. Already-enqueued but unconsumed
    /// updates are dropped, and the store keeps whatever was last applied.
    pub fn stop(&self) {
        self.inner.shutdown.trigger();
        info!("health aggregator stopping");
    }

    /// A handle to the aggregator's shutdown signal
    ///
    /// Useful for tying other components (an HTTP server, a signal handler)
    /// to the same lifecycle.
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.inner.shutdown.clone()
    }

    /// Overall liveness verdict with failure attribution
    ///
    /// Walks priority tiers from Critical to Low and reports the first
    /// failing or expired checker found; within a tier, checkers are
    /// visited in ascending name order. The error map holds at most one
    /// entry.
    pub fn liveness(&self) -> (bool, BTreeMap<String, Error>) {
        self.verdict(Axis::Liveness)
    }

    /// Overall readiness verdict with failure attribution
    ///
    /// Same walk as [`liveness`](Self::liveness) over the readiness axis.
    pub fn readiness(&self) -> (bool, BTreeMap<String, Error>) {
        self.verdict(Axis::Readiness)
    }

    /// Both verdicts in one call
    pub fn overall_health(&self) -> OverallHealth {
        let (liveness, liveness_errors) = self.liveness();
        let (readiness, readiness_errors) = self.readiness();
        OverallHealth {
            liveness,
            readiness,
            liveness_errors,
            readiness_errors,
        }
    }

    fn verdict(&self, axis: Axis) -> (bool, BTreeMap<String, Error>) {
        let registry = self.inner.registry.read();
        let now = Instant::now();

        for priority in Priority::ALL {
            for (name, record) in &registry.records {
                if record.priority != priority {
                    continue;
                }

                if now.duration_since(record.last_update) > self.inner.config.expiry_time {
                    trace!(name, %axis, "record expired");
                    let mut errors = BTreeMap::new();
                    errors.insert(name.clone(), Error::Expired);
                    return (false, errors);
                }

                let (ok, err) = record.axis(axis);
                if !ok {
                    let mut errors = BTreeMap::new();
                    errors.insert(name.clone(), err.cloned().unwrap_or(Error::Unknown));
                    return (false, errors);
                }
            }
        }

        (true, BTreeMap::new())
    }
}

impl fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthAggregator")
            .field("config", &self.inner.config)
            .field("registered", &self.inner.registry.read().records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::sleep;

    /// Checker whose probe outcomes are flipped from the test body
    #[derive(Debug)]
    struct SwitchCheck {
        name: String,
        live: AtomicBool,
        ready: AtomicBool,
    }

    impl SwitchCheck {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                live: AtomicBool::new(true),
                ready: AtomicBool::new(true),
            })
        }
    }

    #[async_trait]
    impl HealthCheck for SwitchCheck {
        fn name(&self) -> &str {
            &self.name
        }

        async fn check_liveness(&self) -> Result<()> {
            if self.live.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(Error::probe("liveness probe failed"))
            }
        }

        async fn check_readiness(&self) -> Result<()> {
            if self.ready.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(Error::probe("readiness probe failed"))
            }
        }
    }

    /// Poll a condition until it holds or a wall-clock budget runs out
    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_no_checkers_is_healthy() {
        let aggregator = HealthAggregator::with_defaults();
        let (alive, errors) = aggregator.liveness();
        assert!(alive);
        assert!(errors.is_empty());
        let (ready, errors) = aggregator.readiness();
        assert!(ready);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_registered_checker_fails_until_first_result() {
        let aggregator = HealthAggregator::with_defaults();
        aggregator.register(SwitchCheck::new("db"), Priority::Critical);

        let (alive, errors) = aggregator.liveness();
        assert!(!alive);
        assert_eq!(errors.get("db"), Some(&Error::Unknown));

        let (ready, errors) = aggregator.readiness();
        assert!(!ready);
        assert_eq!(errors.get("db"), Some(&Error::Unknown));
    }

    #[tokio::test]
    async fn test_submit_success_clears_both_axes() {
        let aggregator = HealthAggregator::with_defaults();
        aggregator.register(SwitchCheck::new("db"), Priority::Critical);
        aggregator.start();

        aggregator.submit("db", Ok(()), Ok(())).await.unwrap();
        wait_until(|| aggregator.liveness().0).await;

        assert!(aggregator.readiness().0);
        assert!(aggregator.overall_health().is_healthy());
    }

    #[tokio::test]
    async fn test_liveness_error_leaves_readiness_untouched() {
        let aggregator = HealthAggregator::with_defaults();
        aggregator.register(SwitchCheck::new("db"), Priority::Critical);
        aggregator.start();

        aggregator
            .submit("db", Err(Error::probe("disk full")), Ok(()))
            .await
            .unwrap();
        wait_until(|| aggregator.readiness().0).await;

        let (alive, errors) = aggregator.liveness();
        assert!(!alive);
        assert_eq!(errors.get("db"), Some(&Error::probe("disk full")));
    }

    #[tokio::test]
    async fn test_critical_failure_masks_lower_tiers() {
        let aggregator = HealthAggregator::with_defaults();
        aggregator.register(SwitchCheck::new("cache"), Priority::Low);
        aggregator.register(SwitchCheck::new("db"), Priority::Critical);
        aggregator.start();

        aggregator
            .submit("db", Err(Error::probe("db down")), Ok(()))
            .await
            .unwrap();
        aggregator
            .submit("cache", Err(Error::probe("cache down")), Ok(()))
            .await
            .unwrap();
        wait_until(|| {
            let (_, errors) = aggregator.liveness();
            errors.contains_key("db")
        })
        .await;

        let (alive, errors) = aggregator.liveness();
        assert!(!alive);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("db"), Some(&Error::probe("db down")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_record_reports_expired() {
        let aggregator = HealthAggregator::new(
            AggregatorConfig::new().with_expiry_time(Duration::from_millis(100)),
        );
        aggregator.register(SwitchCheck::new("db"), Priority::High);
        aggregator.start();

        aggregator.submit("db", Ok(()), Ok(())).await.unwrap();
        // Paused clock: yield so the pipeline applies the update.
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert!(aggregator.liveness().0);

        sleep(Duration::from_millis(150)).await;

        let (alive, errors) = aggregator.liveness();
        assert!(!alive);
        assert_eq!(errors.get("db"), Some(&Error::Expired));
    }

    #[tokio::test]
    async fn test_submit_for_unregistered_name_is_dropped() {
        let notified = Arc::new(AtomicUsize::new(0));
        let count = notified.clone();
        let aggregator = HealthAggregator::new(
            AggregatorConfig::new().with_status_change(move |_, _| {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        aggregator.start();

        aggregator
            .submit("ghost", Err(Error::probe("boo")), Ok(()))
            .await
            .unwrap();
        sleep(Duration::from_millis(50)).await;

        // No store entry, no callback.
        let (alive, errors) = aggregator.liveness();
        assert!(alive);
        assert!(errors.is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reregistration_resets_recorded_state() {
        let aggregator = HealthAggregator::with_defaults();
        let check = SwitchCheck::new("db");
        aggregator.register(check.clone(), Priority::Critical);
        aggregator.start();

        aggregator.submit("db", Ok(()), Ok(())).await.unwrap();
        wait_until(|| aggregator.liveness().0).await;

        // Same name, new tier: back to unknown.
        aggregator.register(check, Priority::Low);
        let (alive, errors) = aggregator.liveness();
        assert!(!alive);
        assert_eq!(errors.get("db"), Some(&Error::Unknown));
    }

    #[tokio::test]
    async fn test_stop_halts_updates_but_keeps_state() {
        let aggregator = HealthAggregator::with_defaults();
        aggregator.register(SwitchCheck::new("db"), Priority::Critical);
        aggregator.start();

        aggregator.submit("db", Ok(()), Ok(())).await.unwrap();
        wait_until(|| aggregator.liveness().0).await;

        aggregator.stop();
        sleep(Duration::from_millis(50)).await;

        // The pipeline is gone; a late submission is rejected, not applied.
        let result = aggregator
            .submit("db", Err(Error::probe("too late")), Ok(()))
            .await;
        assert_eq!(result, Err(Error::Stopped));

        sleep(Duration::from_millis(50)).await;
        assert!(aggregator.liveness().0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let aggregator = HealthAggregator::with_defaults();
        let handle = aggregator.clone();
        handle.register(SwitchCheck::new("db"), Priority::Medium);

        let (alive, errors) = aggregator.liveness();
        assert!(!alive);
        assert!(errors.contains_key("db"));
    }

    #[tokio::test]
    async fn test_independent_instances_do_not_interfere() {
        let first = HealthAggregator::with_defaults();
        let second = HealthAggregator::with_defaults();
        first.register(SwitchCheck::new("db"), Priority::Critical);

        assert!(!first.liveness().0);
        assert!(second.liveness().0);
    }
}
