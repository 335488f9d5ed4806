//! The update pipeline: a single consumer task serializing store writes
//!
//! Producers hand finished records over a bounded channel and never block on
//! store mutation or on the status-change callback. The consumer applies
//! records in arrival order, so the callback observes a total order of
//! updates and never runs concurrently with itself.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, trace};

use pulse_core::HealthRecord;

use crate::aggregator::Inner;

/// One finished check result on its way to the store
pub(crate) struct Update {
    pub(crate) name: String,
    pub(crate) record: HealthRecord,
}

/// Consumer loop; exits on shutdown or when every sender is gone
pub(crate) async fn run(
    inner: Arc<Inner>,
    mut updates: mpsc::Receiver<Update>,
    mut shutdown: broadcast::Receiver<()>,
) {
    debug!("update pipeline started");
    loop {
        tokio::select! {
            // Shutdown wins over queued updates: nothing is applied after
            // the signal fires, and the buffer is dropped undrained.
            biased;
            _ = shutdown.recv() => {
                debug!("update pipeline stopping");
                return;
            }
            update = updates.recv() => {
                match update {
                    Some(update) => apply(&inner, update),
                    None => return,
                }
            }
        }
    }
}

/// Replace the store entry, then notify outside the lock
fn apply(inner: &Inner, update: Update) {
    let Update { name, record } = update;

    {
        let mut registry = inner.registry.write();
        registry.records.insert(name.clone(), record.clone());
    }
    trace!(
        name,
        liveness = record.liveness,
        readiness = record.readiness,
        "health record applied"
    );

    if let Some(callback) = &inner.config.on_status_change {
        // The callback is third-party code; a panic in it must not take the
        // consumer task down.
        if catch_unwind(AssertUnwindSafe(|| callback(&name, &record))).is_err() {
            error!(name, "status-change callback panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::HealthAggregator;
    use crate::config::AggregatorConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pulse_core::{Error, HealthCheck, Priority, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    #[derive(Debug)]
    struct Named(&'static str);

    #[async_trait]
    impl HealthCheck for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn check_liveness(&self) -> Result<()> {
            Ok(())
        }

        async fn check_readiness(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_callback_sees_updates_in_submission_order() {
        let seen: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let aggregator = HealthAggregator::new(
            AggregatorConfig::new().with_status_change(move |name, record| {
                sink.lock().push((name.to_string(), record.liveness));
            }),
        );
        aggregator.register(Arc::new(Named("db")), Priority::Critical);
        aggregator.start();

        for round in 0..5 {
            let liveness = if round % 2 == 0 {
                Ok(())
            } else {
                Err(Error::probe(format!("round {round}")))
            };
            aggregator.submit("db", liveness, Ok(())).await.unwrap();
        }

        for _ in 0..200 {
            if seen.lock().len() == 5 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        let seen = seen.lock();
        assert_eq!(seen.len(), 5);
        let liveness_sequence: Vec<bool> = seen.iter().map(|(_, l)| *l).collect();
        assert_eq!(liveness_sequence, vec![true, false, true, false, true]);
        assert!(seen.iter().all(|(name, _)| name == "db"));
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_kill_the_pipeline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let count = calls.clone();
        let aggregator = HealthAggregator::new(
            AggregatorConfig::new().with_status_change(move |_, _| {
                if count.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("listener bug");
                }
            }),
        );
        aggregator.register(Arc::new(Named("db")), Priority::Critical);
        aggregator.start();

        aggregator
            .submit("db", Err(Error::probe("first")), Ok(()))
            .await
            .unwrap();
        aggregator.submit("db", Ok(()), Ok(())).await.unwrap();

        for _ in 0..200 {
            if aggregator.liveness().0 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }

        // The second update survived the first callback's panic.
        assert!(aggregator.liveness().0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_small_buffer_still_delivers_everything() {
        let applied = Arc::new(AtomicUsize::new(0));
        let count = applied.clone();
        let aggregator = HealthAggregator::new(
            AggregatorConfig::new()
                .with_update_buffer(1)
                .with_status_change(move |_, _| {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
        );
        aggregator.register(Arc::new(Named("db")), Priority::Critical);
        aggregator.start();

        for _ in 0..20 {
            aggregator.submit("db", Ok(()), Ok(())).await.unwrap();
        }

        for _ in 0..200 {
            if applied.load(Ordering::SeqCst) == 20 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(applied.load(Ordering::SeqCst), 20);
    }
}
