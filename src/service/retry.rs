//! Bounded retry with exponential backoff for model calls
//!
//! Each attempt runs under its own timeout. Transient failures (timeout,
//! rate limit, transport) are retried with a doubling, capped delay;
//! non-transient failures surface immediately. Validation of the reply
//! happens above this layer and is never retried.

use std::time::Duration;

use crate::service::llm::{ModelCallError, ModelClient};

/// Retry/backoff/timeout policy for a single logical model call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per retry
    pub base_delay: Duration,
    /// Upper bound for the backoff delay
    pub max_delay: Duration,
    /// Timeout applied to every individual attempt
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Failure of a logical call after the policy has been applied
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("model call failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ModelCallError },

    #[error("model call failed: {0}")]
    Fatal(ModelCallError),
}

/// Run one logical model call under the retry policy
pub async fn call_with_retry(
    client: &dyn ModelClient,
    policy: &RetryPolicy,
    system: &str,
    prompt: &str,
) -> Result<String, RetryError> {
    let mut attempt: u32 = 1;
    let mut delay = policy.base_delay;

    loop {
        let outcome = match tokio::time::timeout(policy.call_timeout, client.call(system, prompt))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ModelCallError::Timeout),
        };

        match outcome {
            Ok(reply) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Model call succeeded after retry");
                }
                return Ok(reply);
            }
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient model failure, backing off"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
            Err(err) if err.is_transient() => {
                tracing::error!(
                    attempts = attempt,
                    error = %err,
                    "Model call exhausted all attempts"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }
            Err(err) => {
                tracing::error!(error = %err, "Non-transient model failure");
                return Err(RetryError::Fatal(err));
            }
        }
    }
}
