//! Per-unit text analysis using the LLM
//!
//! Orchestrates prompt building, the retried model call, and reply
//! validation for one text unit. Ordinary failures never escape: they are
//! captured into the unit's [`AnalysisResult`] so the run can skip and
//! continue.

use std::sync::Arc;
use std::time::Instant;

use crate::model::{AnalysisResult, AnalysisSchema};
use crate::service::llm::ModelClient;
use crate::service::retry::{call_with_retry, RetryPolicy};

pub mod error;
pub mod prompts;
pub mod validation;

pub use error::AnalysisError;
pub use prompts::{build_analysis_prompt, ANALYSIS_SYSTEM_PROMPT};
pub use validation::parse_analysis_response;

/// Analyzes one text unit at a time against a fixed schema
pub struct UnitAnalyzer {
    client: Arc<dyn ModelClient>,
    schema: Arc<AnalysisSchema>,
    policy: RetryPolicy,
}

impl UnitAnalyzer {
    pub fn new(client: Arc<dyn ModelClient>, schema: Arc<AnalysisSchema>) -> Self {
        Self::with_policy(client, schema, RetryPolicy::default())
    }

    pub fn with_policy(
        client: Arc<dyn ModelClient>,
        schema: Arc<AnalysisSchema>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            schema,
            policy,
        }
    }

    pub fn schema(&self) -> &AnalysisSchema {
        &self.schema
    }

    /// Analyze one text unit; never raises for model or validation failures
    ///
    /// Empty input short-circuits to a failure result without a model call.
    pub async fn analyze(&self, text: &str) -> AnalysisResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            tracing::warn!("Empty unit text, skipping model call");
            return failure(AnalysisError::EmptyInput);
        }

        let prompt = build_analysis_prompt(trimmed, &self.schema);
        let start = Instant::now();

        let raw = match call_with_retry(
            self.client.as_ref(),
            &self.policy,
            ANALYSIS_SYSTEM_PROMPT,
            &prompt,
        )
        .await
        {
            Ok(raw) => raw,
            Err(err) => {
                let err: AnalysisError = err.into();
                tracing::warn!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "Unit analysis call failed"
                );
                return failure(err);
            }
        };

        match parse_analysis_response(&raw, &self.schema) {
            Ok(result) => {
                tracing::debug!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    keywords = result.keywords.len(),
                    "Unit analysis complete"
                );
                result
            }
            Err(err) => {
                tracing::warn!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "Model reply failed validation"
                );
                failure(err)
            }
        }
    }
}

fn failure(err: AnalysisError) -> AnalysisResult {
    let failure: crate::model::AnalysisFailure = err.into();
    AnalysisResult::failure(failure.kind, failure.message)
}
