//! Probe endpoint handlers and server wiring

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{debug, info};

use pulse_aggregator::{HealthAggregator, ShutdownSignal};
use pulse_core::{Error, Result};

use crate::response::{OverallResponse, ProbeResponse};

/// Build the probe router over an aggregator handle
pub fn probe_router(aggregator: HealthAggregator) -> Router {
    Router::new()
        .route("/liveness", get(liveness_handler))
        .route("/readiness", get(readiness_handler))
        .route("/health", get(health_handler))
        .with_state(aggregator)
}

/// Serve the router until the shutdown signal fires
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: ShutdownSignal,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| Error::Io(e.to_string()))?;
    info!(listen = %addr, "probe server starting");

    let mut rx = shutdown.subscribe();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = rx.recv().await;
            info!("probe server shutting down");
        })
        .await
        .map_err(|e| Error::Io(e.to_string()))
}

/// `GET /liveness`
async fn liveness_handler(State(aggregator): State<HealthAggregator>) -> Json<ProbeResponse> {
    let (alive, errors) = aggregator.liveness();
    debug!(alive, "liveness probed");
    Json(ProbeResponse::from_verdict(alive, &errors))
}

/// `GET /readiness`
async fn readiness_handler(State(aggregator): State<HealthAggregator>) -> Json<ProbeResponse> {
    let (ready, errors) = aggregator.readiness();
    debug!(ready, "readiness probed");
    Json(ProbeResponse::from_verdict(ready, &errors))
}

/// `GET /health`
async fn health_handler(State(aggregator): State<HealthAggregator>) -> Json<OverallResponse> {
    let overall = aggregator.overall_health();
    Json(OverallResponse {
        liveness: ProbeResponse::from_verdict(overall.liveness, &overall.liveness_errors),
        readiness: ProbeResponse::from_verdict(overall.readiness, &overall.readiness_errors),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ProbeStatus;
    use pulse_aggregator::AggregatorConfig;
    use pulse_checks::{AlwaysHealthy, NeverReady};
    use pulse_core::Priority;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::sleep;

    async fn settled_aggregator() -> HealthAggregator {
        let aggregator = HealthAggregator::new(
            AggregatorConfig::new()
                .with_auto_check(Duration::from_millis(50))
                .with_initial_delay(Duration::from_millis(10)),
        );
        aggregator.register(Arc::new(AlwaysHealthy::default()), Priority::Critical);
        aggregator.register(Arc::new(NeverReady::default()), Priority::Critical);
        aggregator.start();

        // Wait for the first auto-check round to land.
        for _ in 0..200 {
            if aggregator.liveness().0 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        aggregator
    }

    #[tokio::test]
    async fn test_liveness_endpoint_up() {
        let aggregator = settled_aggregator().await;
        let Json(body) = liveness_handler(State(aggregator)).await;
        assert_eq!(body, ProbeResponse::up());
    }

    #[tokio::test]
    async fn test_readiness_endpoint_down_with_details() {
        let aggregator = settled_aggregator().await;
        let Json(body) = readiness_handler(State(aggregator)).await;
        assert_eq!(body.status, ProbeStatus::Down);
        assert_eq!(body.details.get("down"), Some(&ProbeStatus::Down));
    }

    #[tokio::test]
    async fn test_health_endpoint_reports_both_axes() {
        let aggregator = settled_aggregator().await;
        let Json(body) = health_handler(State(aggregator)).await;
        assert_eq!(body.liveness.status, ProbeStatus::Up);
        assert_eq!(body.readiness.status, ProbeStatus::Down);
    }

    #[tokio::test]
    async fn test_router_builds() {
        let aggregator = HealthAggregator::with_defaults();
        let _router = probe_router(aggregator);
    }
}
