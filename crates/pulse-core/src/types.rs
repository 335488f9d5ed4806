//! Common types used throughout Pulse

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Importance of a health check, highest first
///
/// Queries walk the tiers in declaration order, so a Critical failure is
/// always reported ahead of a Low one. The ordering has no effect on
/// registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Failure makes the whole service unusable
    Critical,
    /// Major functionality is affected
    High,
    /// Degraded but serviceable
    Medium,
    /// Informational
    Low,
}

impl Priority {
    /// All tiers in evaluation order
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// The two independent probe axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Is the process alive at all
    Liveness,
    /// Can the process take traffic right now
    Readiness,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Liveness => write!(f, "liveness"),
            Axis::Readiness => write!(f, "readiness"),
        }
    }
}

/// Last-known health of a single registered checker
///
/// A fresh record starts with both axes `false` and no errors: the checker
/// is "unknown, not yet confirmed", and queries report it as failing until
/// a first result lands.
#[derive(Debug, Clone)]
pub struct HealthRecord {
    /// Tier the checker was registered under
    pub priority: Priority,
    /// True iff the most recent liveness probe succeeded
    pub liveness: bool,
    /// True iff the most recent readiness probe succeeded
    pub readiness: bool,
    /// When the most recent result was accepted
    pub last_update: Instant,
    /// Error from the most recent liveness probe, if it failed
    pub liveness_err: Option<Error>,
    /// Error from the most recent readiness probe, if it failed
    pub readiness_err: Option<Error>,
}

impl HealthRecord {
    /// Record for a freshly registered checker: nothing confirmed yet
    pub fn unknown(priority: Priority) -> Self {
        Self {
            priority,
            liveness: false,
            readiness: false,
            last_update: Instant::now(),
            liveness_err: None,
            readiness_err: None,
        }
    }

    /// Record built from a pair of probe outcomes
    pub fn from_probes(priority: Priority, liveness: Result<()>, readiness: Result<()>) -> Self {
        Self {
            priority,
            liveness: liveness.is_ok(),
            readiness: readiness.is_ok(),
            last_update: Instant::now(),
            liveness_err: liveness.err(),
            readiness_err: readiness.err(),
        }
    }

    /// Verdict and recorded error for one axis
    pub fn axis(&self, axis: Axis) -> (bool, Option<&Error>) {
        match axis {
            Axis::Liveness => (self.liveness, self.liveness_err.as_ref()),
            Axis::Readiness => (self.readiness, self.readiness_err.as_ref()),
        }
    }

    /// Whether both probes succeeded on the last update
    pub fn is_healthy(&self) -> bool {
        self.liveness && self.readiness
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::ALL[0], Priority::Critical);
        assert_eq!(Priority::ALL[3], Priority::Low);
    }

    #[test]
    fn test_priority_serde() {
        let json = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let parsed: Priority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(parsed, Priority::Low);
    }

    #[test]
    fn test_unknown_record_is_failing() {
        let record = HealthRecord::unknown(Priority::High);
        assert!(!record.liveness);
        assert!(!record.readiness);
        assert!(record.liveness_err.is_none());
        assert!(record.readiness_err.is_none());
        assert!(!record.is_healthy());
    }

    #[test]
    fn test_record_from_probes() {
        let record = HealthRecord::from_probes(
            Priority::Medium,
            Ok(()),
            Err(Error::probe("cache cold")),
        );
        assert!(record.liveness);
        assert!(!record.readiness);
        assert!(record.liveness_err.is_none());
        assert_eq!(record.readiness_err, Some(Error::probe("cache cold")));

        let (live, err) = record.axis(Axis::Liveness);
        assert!(live);
        assert!(err.is_none());
        let (ready, err) = record.axis(Axis::Readiness);
        assert!(!ready);
        assert_eq!(err, Some(&Error::probe("cache cold")));
    }
}
