use thiserror::Error;

/// Failure modes inside the scoring pipeline. Every variant is absorbed by
/// the evaluator before it returns; the rule-based fallback is the error
/// boundary, so none of these reach an HTTP handler.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("model response is not a parseable JSON object: {0}")]
    MalformedResponse(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl ScoringError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
