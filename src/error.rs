//! Error types for rating runs.

use crate::ratings::Category;
use std::fmt;
use thiserror::Error;

/// Fatal problems detected before any listing is processed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The API credential is not set in the environment or `.env`
    #[error("{0} is not set in the environment or in .env")]
    MissingCredential(&'static str),

    #[error("number of chunks must be at least 1")]
    ZeroChunks,

    #[error("chunk index {index} is out of range for {num_chunks} chunks")]
    ChunkIndexOutOfRange { index: usize, num_chunks: usize },
}

/// Why a listing ended up with one or more null ratings.
///
/// These never abort a run; they travel with the outcome so a null can be
/// explained without reading the logs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FailureReason {
    /// The listing had no usable reviews, so no call was made
    #[error("no reviews to rate")]
    NoReviews,

    /// Network error or non-success API status, after retries
    #[error("request failed: {0}")]
    Request(String),

    #[error("response had no message content")]
    EmptyResponse,

    #[error("response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("response JSON is not an object")]
    NotAnObject,

    /// The object parsed, but some categories were missing or unusable
    #[error("unusable fields: {}", format_issues(.0))]
    Fields(Vec<FieldIssue>),
}

impl FailureReason {
    /// Short stable label, used for counting outcomes in run summaries
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::NoReviews => "no_reviews",
            FailureReason::Request(_) => "request",
            FailureReason::EmptyResponse => "empty_response",
            FailureReason::MalformedJson(_) => "malformed_json",
            FailureReason::NotAnObject => "not_an_object",
            FailureReason::Fields(_) => "fields",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub category: Category,
    pub problem: FieldProblem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldProblem {
    Missing,
    /// Present but not coercible to a finite number; holds the raw JSON text
    Invalid(String),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            FieldProblem::Missing => write!(f, "{} missing", self.category.column()),
            FieldProblem::Invalid(raw) => write!(f, "{} invalid ({})", self.category.column(), raw),
        }
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_issues_display() {
        let reason = FailureReason::Fields(vec![
            FieldIssue {
                category: Category::Safety,
                problem: FieldProblem::Missing,
            },
            FieldIssue {
                category: Category::Value,
                problem: FieldProblem::Invalid("\"great\"".to_string()),
            },
        ]);
        assert_eq!(
            reason.to_string(),
            "unusable fields: safety_rating missing, value_rating invalid (\"great\")"
        );
        assert_eq!(reason.kind(), "fields");
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::ChunkIndexOutOfRange {
            index: 3,
            num_chunks: 3,
        };
        assert_eq!(err.to_string(), "chunk index 3 is out of range for 3 chunks");
        assert_eq!(
            ConfigError::MissingCredential("OPENAI_API_KEY").to_string(),
            "OPENAI_API_KEY is not set in the environment or in .env"
        );
    }
}
