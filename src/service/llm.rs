//! Shared LLM client and the model-call primitive
//!
//! [`ModelClient`] is the single seam to the language model: one prompt in,
//! raw reply text out. The live implementation wraps rig's OpenAI-compatible
//! providers; tests substitute stubs.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::{openai, openrouter};

use crate::model::Provider;

/// Environment variable for the OpenAI API key
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Environment variable for the OpenRouter API key
pub const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";

/// Sampling temperature for all analysis calls
const TEMPERATURE: f64 = 0.3;

/// Error raised by one model call
///
/// Transient kinds are retried by the retry controller; `Api` failures are
/// surfaced immediately.
#[derive(Debug, thiserror::Error)]
pub enum ModelCallError {
    #[error("model call timed out")]
    Timeout,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider rejected the request: {0}")]
    Api(String),
}

impl ModelCallError {
    pub fn is_transient(&self) -> bool {
        !matches!(self, ModelCallError::Api(_))
    }
}

/// The model-call primitive: `call(system, prompt) -> raw reply text`
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn call(&self, system: &str, prompt: &str) -> Result<String, ModelCallError>;
}

enum ProviderClient {
    OpenAi(openai::Client),
    OpenRouter(openrouter::Client),
}

/// Live client backed by rig's OpenAI-compatible providers
pub struct LlmClient {
    client: ProviderClient,
    model: String,
}

impl LlmClient {
    /// Create a client for the configured provider and model
    pub fn new(provider: Provider, api_key: &str, model: &str) -> Result<Self, ModelCallError> {
        let client = match provider {
            Provider::OpenAi => ProviderClient::OpenAi(openai::Client::new(api_key)),
            Provider::OpenRouter => ProviderClient::OpenRouter(openrouter::Client::new(api_key)),
        };

        tracing::info!(provider = ?provider, model = %model, "LLM client initialized");
        Ok(Self {
            client,
            model: model.to_string(),
        })
    }

    /// Env var holding the API key for a provider
    pub fn api_key_env(provider: Provider) -> &'static str {
        match provider {
            Provider::OpenAi => ENV_OPENAI_API_KEY,
            Provider::OpenRouter => ENV_OPENROUTER_API_KEY,
        }
    }
}

#[async_trait]
impl ModelClient for LlmClient {
    async fn call(&self, system: &str, prompt: &str) -> Result<String, ModelCallError> {
        let reply = match &self.client {
            ProviderClient::OpenAi(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(system)
                    .temperature(TEMPERATURE)
                    .build();
                agent.prompt(prompt).await
            }
            ProviderClient::OpenRouter(client) => {
                let agent = client
                    .agent(&self.model)
                    .preamble(system)
                    .temperature(TEMPERATURE)
                    .build();
                agent.prompt(prompt).await
            }
        };

        reply.map_err(|e| classify_prompt_error(&e.to_string()))
    }
}

/// Map a provider error message onto the call error taxonomy
///
/// rig surfaces provider failures as strings; rate limits and timeouts are
/// recognized so the retry controller can back off, auth/request errors are
/// treated as non-transient.
fn classify_prompt_error(message: &str) -> ModelCallError {
    let lower = message.to_lowercase();

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("rate_limit") {
        ModelCallError::RateLimited
    } else if lower.contains("timed out") || lower.contains("timeout") {
        ModelCallError::Timeout
    } else if lower.contains("401")
        || lower.contains("403")
        || lower.contains("invalid_api_key")
        || lower.contains("invalid_request")
    {
        ModelCallError::Api(message.to_string())
    } else {
        ModelCallError::Transport(message.to_string())
    }
}
