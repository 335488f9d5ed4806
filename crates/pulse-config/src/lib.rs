//! # Pulse Config
//!
//! File configuration for the Pulse service binary:
//! - serde types covering the server, the aggregator, and the check roster
//! - Loading from YAML, TOML, or JSON with `${VAR}` environment expansion
//! - Validation

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod loader;
pub mod types;

pub use loader::{load_from_file, load_from_str, ConfigFormat};
pub use types::{AggregatorSettings, CheckConfig, Config, ServerConfig};
