//! Unit-scoped error taxonomy for text analysis

use thiserror::Error;

use crate::model::AnalysisFailure;
use crate::service::llm::ModelCallError;
use crate::service::retry::RetryError;

/// Everything that can go wrong while analyzing one text unit
///
/// Validation variants are never retried; call variants come out of the
/// retry controller. All of them are captured into the unit's result rather
/// than aborting the run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("invalid sentiment '{0}'")]
    InvalidSentiment(String),

    #[error("expected 2-4 distinct non-empty keywords, got {0}")]
    InvalidKeywordCount(usize),

    #[error("invalid value for attribute '{attribute}': {message}")]
    InvalidAttributeValue { attribute: String, message: String },

    #[error("input text is empty")]
    EmptyInput,

    #[error("model call failed: {0}")]
    CallFailed(ModelCallError),

    #[error("model call exhausted after {attempts} attempts: {last}")]
    CallExhausted { attempts: u32, last: ModelCallError },
}

impl AnalysisError {
    /// Machine-readable failure kind recorded alongside the message
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::MalformedResponse(_) => "malformed_response",
            AnalysisError::InvalidSentiment(_) => "invalid_sentiment",
            AnalysisError::InvalidKeywordCount(_) => "invalid_keyword_count",
            AnalysisError::InvalidAttributeValue { .. } => "invalid_attribute_value",
            AnalysisError::EmptyInput => "empty_input",
            AnalysisError::CallFailed(_) => "call_failed",
            AnalysisError::CallExhausted { .. } => "call_exhausted",
        }
    }
}

impl From<RetryError> for AnalysisError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => {
                AnalysisError::CallExhausted { attempts, last }
            }
            RetryError::Fatal(last) => AnalysisError::CallFailed(last),
        }
    }
}

impl From<AnalysisError> for AnalysisFailure {
    fn from(err: AnalysisError) -> Self {
        AnalysisFailure {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
