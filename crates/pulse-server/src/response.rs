//! Serialized aggregate responses

use pulse_core::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// UP/DOWN marker used for both the top-level status and per-checker details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeStatus {
    /// The verdict passed
    #[serde(rename = "UP")]
    Up,
    /// The verdict failed
    #[serde(rename = "DOWN")]
    Down,
}

/// Body of a single probe endpoint
///
/// `{"status":"UP"}` on success; on failure the failing checker appears in
/// `details` as `{"status":"DOWN","details":{"name":"DOWN"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    /// Aggregate verdict
    pub status: ProbeStatus,
    /// Failing checkers; omitted when empty
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, ProbeStatus>,
}

impl ProbeResponse {
    /// A passing response
    pub fn up() -> Self {
        Self {
            status: ProbeStatus::Up,
            details: BTreeMap::new(),
        }
    }

    /// A failing response attributing the named checkers
    pub fn down(errors: &BTreeMap<String, Error>) -> Self {
        Self {
            status: ProbeStatus::Down,
            details: errors
                .keys()
                .map(|name| (name.clone(), ProbeStatus::Down))
                .collect(),
        }
    }

    /// Build from a query result
    pub fn from_verdict(passed: bool, errors: &BTreeMap<String, Error>) -> Self {
        if passed {
            Self::up()
        } else {
            Self::down(errors)
        }
    }
}

/// Body of the combined endpoint: both verdicts side by side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallResponse {
    /// Liveness verdict
    pub liveness: ProbeResponse,
    /// Readiness verdict
    pub readiness: ProbeResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_up_response_omits_details() {
        let body = serde_json::to_value(ProbeResponse::up()).unwrap();
        assert_eq!(body, json!({"status": "UP"}));
    }

    #[test]
    fn test_down_response_names_failing_checker() {
        let mut errors = BTreeMap::new();
        errors.insert("postgres".to_string(), Error::probe("connection refused"));

        let body = serde_json::to_value(ProbeResponse::down(&errors)).unwrap();
        assert_eq!(
            body,
            json!({"status": "DOWN", "details": {"postgres": "DOWN"}})
        );
    }

    #[test]
    fn test_response_round_trip() {
        let mut errors = BTreeMap::new();
        errors.insert("redis".to_string(), Error::Expired);
        let response = ProbeResponse::down(&errors);

        let text = serde_json::to_string(&response).unwrap();
        let parsed: ProbeResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, response);
    }
}
