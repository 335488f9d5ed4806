//! The checker capability consumed by the aggregator

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;

/// A source of liveness and readiness signals
///
/// Implementations expose a stable name (used as the registry key) and two
/// independent probes. The aggregator may invoke either probe from several
/// call paths at once — the manual submission path and the auto-check
/// scheduler — so both must tolerate concurrent calls.
#[async_trait]
pub trait HealthCheck: Send + Sync + fmt::Debug {
    /// Stable identifier for this checker
    ///
    /// Registering two checkers with the same name silently replaces the
    /// earlier registration.
    fn name(&self) -> &str;

    /// Probe whether the watched component is alive
    async fn check_liveness(&self) -> Result<()>;

    /// Probe whether the watched component can take traffic
    async fn check_readiness(&self) -> Result<()>;
}
