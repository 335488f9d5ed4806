//! HTTP endpoint checks

use async_trait::async_trait;
use http::{StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use pulse_core::{Error, HealthCheck, Result};

/// Checks HTTP endpoints, one URI per axis
///
/// A probe passes when the endpoint answers with one of the expected status
/// codes (200 by default) within the timeout. Liveness and readiness can
/// point at different paths of the same service.
#[derive(Debug, Clone)]
pub struct HttpCheck {
    name: String,
    liveness_uri: Uri,
    readiness_uri: Uri,
    expected_status: Vec<StatusCode>,
    timeout: Duration,
    client: Client<HttpConnector, http_body_util::Empty<bytes::Bytes>>,
}

impl HttpCheck {
    /// Create a check probing `liveness_uri` and `readiness_uri`
    pub fn new(name: impl Into<String>, liveness_uri: Uri, readiness_uri: Uri) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            name: name.into(),
            liveness_uri,
            readiness_uri,
            expected_status: vec![StatusCode::OK],
            timeout: Duration::from_secs(5),
            client,
        }
    }

    /// Create a check probing the same URI on both axes
    pub fn single(name: impl Into<String>, uri: Uri) -> Self {
        Self::new(name, uri.clone(), uri)
    }

    /// Override the accepted status codes (default `[200]`)
    pub fn with_expected_status(mut self, expected: Vec<StatusCode>) -> Self {
        self.expected_status = expected;
        self
    }

    /// Override the request timeout (default 5s)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn probe(&self, uri: &Uri) -> Result<()> {
        debug!(%uri, "performing HTTP health check");

        let request = http::Request::builder()
            .method(http::Method::GET)
            .uri(uri.clone())
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| Error::Connect(format!("{uri}: failed to build request: {e}")))?;

        match timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                if self.expected_status.contains(&status) {
                    Ok(())
                } else {
                    warn!(%uri, %status, "health endpoint returned unexpected status");
                    Err(Error::probe(format!("{uri}: unexpected status {status}")))
                }
            }
            Ok(Err(e)) => Err(Error::Connect(format!("{uri}: {e}"))),
            Err(_) => Err(Error::Connect(format!("{uri}: request timed out"))),
        }
    }
}

#[async_trait]
impl HealthCheck for HttpCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_liveness(&self) -> Result<()> {
        self.probe(&self.liveness_uri).await
    }

    async fn check_readiness(&self) -> Result<()> {
        self.probe(&self.readiness_uri).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_check_unreachable_host() {
        let uri: Uri = "http://127.0.0.1:1/health".parse().unwrap();
        let check =
            HttpCheck::single("api", uri).with_timeout(Duration::from_millis(500));

        let result = check.check_liveness().await;
        assert!(matches!(result, Err(Error::Connect(_))));
    }

    #[tokio::test]
    async fn test_http_check_distinct_axis_uris() {
        let live: Uri = "http://127.0.0.1:1/livez".parse().unwrap();
        let ready: Uri = "http://127.0.0.1:1/readyz".parse().unwrap();
        let check = HttpCheck::new("api", live, ready)
            .with_timeout(Duration::from_millis(200));

        assert!(check.check_liveness().await.is_err());
        assert!(check.check_readiness().await.is_err());
    }
}
