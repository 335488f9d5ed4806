//! TCP reachability checks

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use pulse_core::{Error, HealthCheck, Result};

/// Checks that a TCP endpoint accepts connections
///
/// Both axes use the same probe: a target that accepts a connection is
/// considered alive and ready.
#[derive(Debug, Clone)]
pub struct TcpCheck {
    name: String,
    address: String,
    timeout: Duration,
}

impl TcpCheck {
    /// Create a check for `address` (`host:port`)
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Override the connect timeout (default 5s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn probe(&self) -> Result<()> {
        debug!(address = %self.address, "performing TCP health check");
        match timeout(self.timeout, TcpStream::connect(self.address.as_str())).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(Error::Connect(format!("{}: {e}", self.address))),
            Err(_) => Err(Error::Connect(format!(
                "{}: connect timed out",
                self.address
            ))),
        }
    }
}

#[async_trait]
impl HealthCheck for TcpCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_liveness(&self) -> Result<()> {
        self.probe().await
    }

    async fn check_readiness(&self) -> Result<()> {
        self.probe().await
    }
}
