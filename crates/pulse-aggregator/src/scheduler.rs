//! The auto-check scheduler: periodic probing with per-checker backoff
//!
//! One background loop drives every registered checker's probes. A checker
//! that keeps failing is suppressed for a growing window (half the check
//! interval, multiplied on each consecutive failure, clamped at the
//! configured ceiling) and springs back to the normal cadence on its first
//! full success. Checkers back off independently of each other.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use pulse_core::{HealthCheck, HealthRecord};

use crate::aggregator::Inner;

/// Scheduler loop: initial delay, one immediate round, then a steady tick
pub(crate) async fn run(inner: Arc<Inner>, mut shutdown: broadcast::Receiver<()>) {
    let interval = inner.config.check_interval;
    debug!(
        initial_delay = ?inner.config.initial_delay,
        check_interval = ?interval,
        "auto-check scheduler started"
    );

    tokio::select! {
        biased;
        _ = shutdown.recv() => return,
        _ = time::sleep(inner.config.initial_delay) => {}
    }
    run_round(&inner).await;

    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    // A round slower than the interval skips ticks instead of bursting.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => {
                debug!("auto-check scheduler stopping");
                return;
            }
            _ = ticker.tick() => run_round(&inner).await,
        }
    }
}

/// Probe every checker in the current roster, one at a time
async fn run_round(inner: &Inner) {
    let roster: Vec<(String, Arc<dyn HealthCheck>)> = {
        let registry = inner.registry.read();
        registry
            .checkers
            .iter()
            .map(|(name, checker)| (name.clone(), checker.clone()))
            .collect()
    };

    for (name, checker) in roster {
        check_cycle(inner, &name, checker.as_ref()).await;
    }
}

/// One probe attempt for one checker, honoring its backoff window
async fn check_cycle(inner: &Inner, name: &str, checker: &dyn HealthCheck) {
    let now = Instant::now();

    let backoff = {
        let registry = inner.registry.read();
        registry.backoff.get(name).copied().unwrap_or_default()
    };
    if !backoff.current.is_zero() {
        if let Some(last_attempt) = backoff.last_attempt {
            if now.duration_since(last_attempt) < backoff.current {
                trace!(name, backoff = ?backoff.current, "check suppressed by backoff");
                return;
            }
        }
    }

    // Stamp the attempt before probing so a slow probe cannot be started a
    // second time by an overlapping tick.
    {
        let mut registry = inner.registry.write();
        registry.backoff.entry(name.to_string()).or_default().last_attempt = Some(now);
    }

    let liveness = checker.check_liveness().await;
    let readiness = checker.check_readiness().await;
    let failed = liveness.is_err() || readiness.is_err();

    {
        let mut registry = inner.registry.write();
        let state = registry.backoff.entry(name.to_string()).or_default();
        if failed {
            state.current = next_backoff(
                state.current,
                inner.config.check_interval,
                inner.config.backoff_factor,
                inner.config.max_backoff,
            );
            debug!(name, backoff = ?state.current, "check failed, backing off");
        } else if !state.current.is_zero() {
            state.current = Duration::ZERO;
            debug!(name, "check recovered, backoff reset");
        }
    }

    let priority = {
        let registry = inner.registry.read();
        registry.records.get(name).map(|record| record.priority)
    };
    // The roster entry can disappear only through re-registration races;
    // without a record there is no priority to attach, so skip.
    let Some(priority) = priority else { return };

    let record = HealthRecord::from_probes(priority, liveness, readiness);
    if inner.send_update(name.to_string(), record).await.is_err() {
        debug!(name, "aggregator stopped, dropping auto-check result");
    }
}

/// Next suppression window after a failed attempt
///
/// Seeds at half the check interval, then multiplies, clamped to the
/// ceiling.
fn next_backoff(current: Duration, interval: Duration, factor: f64, max: Duration) -> Duration {
    let next = if current.is_zero() {
        interval / 2
    } else {
        current.mul_f64(factor)
    };
    next.min(max)
}
