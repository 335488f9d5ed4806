//! Fixed-outcome checkers
//!
//! Useful as placeholders while wiring a service, and as known-good or
//! known-bad signals in tests.

use async_trait::async_trait;
use pulse_core::{Error, HealthCheck, Result};

/// A checker whose probes always succeed
#[derive(Debug, Clone)]
pub struct AlwaysHealthy {
    name: String,
}

impl AlwaysHealthy {
    /// Create a checker with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for AlwaysHealthy {
    fn default() -> Self {
        Self::new("noop")
    }
}

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_liveness(&self) -> Result<()> {
        Ok(())
    }

    async fn check_readiness(&self) -> Result<()> {
        Ok(())
    }
}

/// A checker that is alive but never ready to take traffic
#[derive(Debug, Clone)]
pub struct NeverReady {
    name: String,
}

impl NeverReady {
    /// Create a checker with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NeverReady {
    fn default() -> Self {
        Self::new("down")
    }
}

#[async_trait]
impl HealthCheck for NeverReady {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_liveness(&self) -> Result<()> {
        Ok(())
    }

    async fn check_readiness(&self) -> Result<()> {
        Err(Error::probe("not accepting traffic"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_always_healthy() {
        let check = AlwaysHealthy::default();
        assert_eq!(check.name(), "noop");
        assert!(check.check_liveness().await.is_ok());
        assert!(check.check_readiness().await.is_ok());
    }

    #[tokio::test]
    async fn test_never_ready_is_still_alive() {
        let check = NeverReady::new("maintenance");
        assert_eq!(check.name(), "maintenance");
        assert!(check.check_liveness().await.is_ok());
        assert_eq!(
            check.check_readiness().await,
            Err(Error::probe("not accepting traffic"))
        );
    }
}
