//! Error types for browser scenarios

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("WebDriver failed to start: {0}")]
    DriverStartup(String),

    #[error("WebDriver not ready after {0} status checks")]
    DriverHealthCheck(usize),

    #[error("Could not open browser session: {0}")]
    SessionStart(String),

    #[error("WebDriver command failed: {0}")]
    WebDriver(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout after {} ms waiting for: {what}", .timeout.as_millis())]
    Timeout { what: String, timeout: Duration },

    #[error("Assertion failed: expected {subject} to contain {expected:?}, got {actual:?}")]
    AssertionFailed {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("Scenario body panicked: {0}")]
    Panicked(String),

    #[error("Session teardown failed: {0}")]
    Teardown(String),

    #[error("Interrupted before the run finished")]
    Interrupted,

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Coarse classification of why a scenario failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No session could be acquired, no step ran
    Acquisition,
    ElementNotFound,
    Timeout,
    Assertion,
    Teardown,
    Error,
}

impl E2eError {
    pub fn kind(&self) -> FailureKind {
        match self {
            E2eError::DriverStartup(_)
            | E2eError::DriverHealthCheck(_)
            | E2eError::SessionStart(_) => FailureKind::Acquisition,
            E2eError::ElementNotFound(_) => FailureKind::ElementNotFound,
            E2eError::Timeout { .. } => FailureKind::Timeout,
            E2eError::AssertionFailed { .. } => FailureKind::Assertion,
            E2eError::Teardown(_) => FailureKind::Teardown,
            _ => FailureKind::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_condition() {
        let err = E2eError::Timeout {
            what: "url to contain \"/questions\"".to_string(),
            timeout: Duration::from_secs(10),
        };
        assert_eq!(
            err.to_string(),
            "Timeout after 10000 ms waiting for: url to contain \"/questions\""
        );
        assert_eq!(err.kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_assertion_message_shows_both_sides() {
        let err = E2eError::AssertionFailed {
            subject: "text of class=error".to_string(),
            expected: "Incorrect Password".to_string(),
            actual: "Login failed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"Incorrect Password\""));
        assert!(msg.contains("\"Login failed\""));
        assert_eq!(err.kind(), FailureKind::Assertion);
    }

    #[test]
    fn test_acquisition_errors_are_classified_together() {
        assert_eq!(E2eError::SessionStart("refused".into()).kind(), FailureKind::Acquisition);
        assert_eq!(E2eError::DriverHealthCheck(3).kind(), FailureKind::Acquisition);
        assert_eq!(E2eError::Panicked("boom".into()).kind(), FailureKind::Error);
    }
}
