// src/error.rs
use std::fmt;

use thiserror::Error;

/// Errors surfaced to the immediate caller of the connector.
///
/// Only configuration and input problems end up here. Anything that goes wrong
/// while talking to the search backend is recorded in the returned job state.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Missing credential, bad base URL, duplicate registry entry, ...
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no service registered for platform type: \"{0}\"")]
    PlatformNotRegistered(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A platform state could not be converted back into the generic envelope.
    #[error("platform state encoding failed: {0}")]
    StateEncoding(#[from] serde_json::Error),
}

impl SourceError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SourceError::Validation(_))
    }
}

/// One offending field, addressed by a dotted path (`minLikes`, `fromAccounts.1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.path, self.message)
    }
}

/// Options (or persisted state) rejected by a platform before any network call.
#[derive(Debug, Clone, Error)]
#[error("invalid options for {platform}: {}", join_issues(.issues))]
pub struct ValidationError {
    pub platform: String,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(platform: impl Into<String>, issues: Vec<FieldIssue>) -> Self {
        Self {
            platform: platform.into(),
            issues,
        }
    }

    /// True if any issue is reported for `path` or one of its children.
    pub fn mentions(&self, path: &str) -> bool {
        self.issues.iter().any(|i| {
            i.path == path
                || i.path
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Backend interaction failures. These are never returned as `Err`: their
/// message is stored as the job's `errorMessage` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendFailure {
    #[error("Failed to submit job to Masa API")]
    JobSubmission,

    #[error("Job status: {}", .status.as_deref().unwrap_or("null"))]
    JobStatus { status: Option<String> },

    #[error("No results returned for completed job")]
    ResultFetch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_issue() {
        let err = ValidationError::new(
            "twitter-scraper",
            vec![
                FieldIssue::new("minLikes", "expected a non-negative integer"),
                FieldIssue::new("fromAccounts.0", "invalid handle"),
            ],
        );
        assert_eq!(
            err.to_string(),
            "invalid options for twitter-scraper: minLikes - expected a non-negative integer, fromAccounts.0 - invalid handle"
        );
        assert!(err.mentions("minLikes"));
        assert!(err.mentions("fromAccounts"));
        assert!(!err.mentions("from"));
    }

    #[test]
    fn status_failure_message_names_the_raw_status() {
        let f = BackendFailure::JobStatus {
            status: Some("error(fetching_status)".into()),
        };
        assert_eq!(f.to_string(), "Job status: error(fetching_status)");
        let none = BackendFailure::JobStatus { status: None };
        assert_eq!(none.to_string(), "Job status: null");
    }
}
