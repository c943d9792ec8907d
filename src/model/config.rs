//! Run configuration
//!
//! Loaded from a JSON config file carrying the provider/model selection and
//! the user-defined check attributes, with env overrides for the paths and
//! model name.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::schema::{AnalysisSchema, CheckAttribute, SchemaError};

/// Environment variable overriding the config file location
pub const ENV_CONFIG_PATH: &str = "RESPONSE_INSIGHT_CONFIG";

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "response_insight.json";

/// Environment variable overriding the configured model
pub const ENV_MODEL: &str = "RESPONSE_INSIGHT_MODEL";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid check attribute: {0}")]
    Schema(#[from] SchemaError),
}

/// LLM provider selection; OpenRouter speaks the OpenAI-compatible API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    OpenAi,
    OpenRouter,
}

/// Configuration for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_question: Option<String>,
    pub check_attributes: Vec<CheckAttribute>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl RunConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let contents = fs::read_to_string(path)?;
        let mut config: RunConfig = serde_json::from_str(&contents)?;

        for attribute in &config.check_attributes {
            attribute.validate()?;
        }
        if config.concurrency == 0 {
            config.concurrency = DEFAULT_CONCURRENCY;
        }

        tracing::info!(
            path = %path.display(),
            attributes = config.check_attributes.len(),
            provider = ?config.provider,
            model = %config.model,
            "Loaded run configuration"
        );
        Ok(config)
    }

    /// Load from `RESPONSE_INSIGHT_CONFIG` or the default path, applying the
    /// `RESPONSE_INSIGHT_MODEL` override
    pub fn load_default() -> Result<Self, ConfigError> {
        let path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(&path)?;

        if let Ok(model) = std::env::var(ENV_MODEL) {
            if !model.trim().is_empty() {
                tracing::info!(model = %model, "Model overridden from environment");
                config.model = model;
            }
        }
        Ok(config)
    }

    /// Persist the configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        tracing::info!(path = %path.as_ref().display(), "Saved run configuration");
        Ok(())
    }

    /// Build the immutable analysis schema for this run
    pub fn schema(&self) -> Result<AnalysisSchema, SchemaError> {
        AnalysisSchema::new(self.check_attributes.clone(), self.research_question.clone())
    }
}
