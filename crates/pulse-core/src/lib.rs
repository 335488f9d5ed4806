//! # Pulse Core
//!
//! Core types, traits, and error handling for the Pulse health aggregator.
//!
//! This crate provides the foundational abstractions shared by the rest of
//! the workspace:
//! - The [`HealthCheck`] capability trait implemented by checkers
//! - Priority tiers and per-checker health records
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod check;
pub mod error;
pub mod types;

pub use check::HealthCheck;
pub use error::{Error, Result};
pub use types::{Axis, HealthRecord, Priority};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::check::HealthCheck;
    pub use crate::error::{Error, Result};
    pub use crate::types::{Axis, HealthRecord, Priority};
}
