//! # Pulse Checks
//!
//! Built-in checker implementations for the Pulse aggregator:
//! - Fixed-outcome checkers for wiring and tests
//! - TCP reachability checks
//! - HTTP endpoint checks
//!
//! All checkers implement [`pulse_core::HealthCheck`] and can be registered
//! with any aggregator instance.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod fixed;
pub mod http;
pub mod tcp;

pub use fixed::{AlwaysHealthy, NeverReady};
pub use http::HttpCheck;
pub use tcp::TcpCheck;
