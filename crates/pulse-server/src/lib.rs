//! # Pulse Server
//!
//! HTTP probe endpoints over a shared
//! [`HealthAggregator`](pulse_aggregator::HealthAggregator):
//! - `GET /liveness` and `GET /readiness` with the aggregate verdict body
//! - `GET /health` with both verdicts
//!
//! Responses always carry HTTP 200; the verdict lives in the body, where
//! `details` names the failing checker and is omitted entirely when the
//! verdict is UP.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod response;
pub mod routes;

pub use response::{OverallResponse, ProbeResponse, ProbeStatus};
pub use routes::{probe_router, serve};
