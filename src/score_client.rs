use log::{debug, warn};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::config::{ApiConfig, ScoringConfig};
use crate::constants::constants;
use crate::error::{FailureReason, FieldIssue, FieldProblem};
use crate::grouper::ListingBatch;
use crate::llm::{BackendError, ChatRequest, CompletionBackend};
use crate::prompt::PromptBuilder;
use crate::ratings::{Category, CategoryRatings, ScoreOutcome};

/// How often a retryable failure is attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each one
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }
}

impl From<&ApiConfig> for RetryPolicy {
    fn from(api: &ApiConfig) -> Self {
        Self {
            max_retries: api.max_retries,
            initial_backoff: api.retry_backoff,
        }
    }
}

/// Rates one listing at a time. Never returns an error: every failure is
/// folded into a degraded outcome.
pub struct ScoreClient {
    backend: Box<dyn CompletionBackend>,
    scoring: ScoringConfig,
    prompt_builder: PromptBuilder,
    retry: RetryPolicy,
}

impl ScoreClient {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        scoring: ScoringConfig,
        retry: RetryPolicy,
    ) -> Self {
        let prompt_builder = PromptBuilder::new(scoring.max_chars_per_review);
        Self {
            backend,
            scoring,
            prompt_builder,
            retry,
        }
    }

    pub async fn score(&self, batch: &ListingBatch) -> ScoreOutcome {
        if batch.is_empty() {
            return ScoreOutcome::failed(FailureReason::NoReviews);
        }

        let request = ChatRequest::json_object(
            self.scoring.model_name.clone(),
            constants::SYSTEM_INSTRUCTIONS,
            self.prompt_builder.build(batch),
        );

        match self.complete_with_retries(batch.listing_id, &request).await {
            Ok(content) => parse_ratings(&content),
            Err(BackendError::Empty) => ScoreOutcome::failed(FailureReason::EmptyResponse),
            Err(e) => ScoreOutcome::failed(FailureReason::Request(e.to_string())),
        }
    }

    async fn complete_with_retries(
        &self,
        listing_id: i64,
        request: &ChatRequest,
    ) -> Result<String, BackendError> {
        let mut attempt = 0u32;
        let mut delay = self.retry.initial_backoff;

        loop {
            match self.backend.complete(request).await {
                Ok(content) => return Ok(content),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        "Listing {}: {} (retry {}/{} in {} ms)",
                        listing_id,
                        e,
                        attempt,
                        self.retry.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Decode the model's reply into ratings, one field at a time.
pub fn parse_ratings(content: &str) -> ScoreOutcome {
    let value: Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(e) => return ScoreOutcome::failed(FailureReason::MalformedJson(e.to_string())),
    };

    let Value::Object(object) = value else {
        return ScoreOutcome::failed(FailureReason::NotAnObject);
    };

    extract_ratings(&object)
}

fn extract_ratings(object: &Map<String, Value>) -> ScoreOutcome {
    let mut ratings = CategoryRatings::empty();
    let mut issues = Vec::new();

    for category in Category::ALL {
        match object.get(category.column()) {
            None | Some(Value::Null) => issues.push(FieldIssue {
                category,
                problem: FieldProblem::Missing,
            }),
            Some(raw) => match coerce_rating(raw) {
                Some(rating) => ratings.set(category, Some(rating)),
                None => issues.push(FieldIssue {
                    category,
                    problem: FieldProblem::Invalid(raw.to_string()),
                }),
            },
        }
    }

    if issues.is_empty() {
        debug!("Parsed complete ratings: {:?}", ratings);
        ScoreOutcome::Complete(ratings)
    } else {
        ScoreOutcome::Degraded {
            ratings,
            reason: FailureReason::Fields(issues),
        }
    }
}

/// Numbers and numeric strings become finite floats; anything else is rejected.
fn coerce_rating(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
