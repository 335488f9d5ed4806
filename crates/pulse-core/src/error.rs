//! Error types for Pulse

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for Pulse
///
/// Probe errors are stored in the aggregator and handed back verbatim from
/// queries, so the type is `Clone` and carries owned payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A probe reported a failure, with the checker-supplied reason
    #[error("{0}")]
    Probe(String),

    /// A built-in network checker could not reach its target
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// The record was not refreshed within the expiry window
    #[error("Health check has expired")]
    Expired,

    /// No result has been reported for this checker since registration
    #[error("Health not yet reported")]
    Unknown,

    /// The aggregator was stopped and the update was not accepted
    #[error("Aggregator is stopped")]
    Stopped,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error, carried as text so the error stays cloneable
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Create a probe error from any displayable reason
    pub fn probe(reason: impl Into<String>) -> Self {
        Error::Probe(reason.into())
    }
}
