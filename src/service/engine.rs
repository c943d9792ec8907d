//! Run orchestration
//!
//! Drives a whole analysis run: concurrent per-unit model calls, optional
//! chunk consensus for long documents, keyword categorization and the final
//! frequency aggregation. Per-unit failures are recorded and skipped; only
//! setup problems abort a run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    AnalysisResult, AnalysisSchema, CategoryMapping, ConfigError, ProcessingStats, RunConfig,
    SchemaError,
};
use crate::service::analyzer::UnitAnalyzer;
use crate::service::categorizer::KeywordCategorizer;
use crate::service::consensus::merge_chunks;
use crate::service::frequency::{category_frequencies, CategoryFrequency};
use crate::service::llm::{LlmClient, ModelClient};
use crate::text::chunk_text;

/// One input unit: a survey row or a whole document, depending on the run
/// mode
#[derive(Debug, Clone, Deserialize)]
pub struct TextUnit {
    pub id: String,
    pub text: String,
}

/// Per-unit entry in the run output
#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub id: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub categories: Vec<String>,
}

/// Complete output of one analysis run
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub reports: Vec<UnitReport>,
    pub categories: CategoryMapping,
    pub frequencies: Vec<CategoryFrequency>,
    pub stats: ProcessingStats,
}

/// Setup and input problems that abort a run before any model call
#[derive(Debug, Error)]
pub enum RunError {
    #[error("schema has no check attributes")]
    EmptySchema,
    #[error("missing API key environment variable {0}")]
    MissingApiKey(&'static str),
    #[error("failed to initialize model client: {0}")]
    ClientInit(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub struct AnalysisEngine {
    analyzer: UnitAnalyzer,
    categorizer: KeywordCategorizer,
    schema: Arc<AnalysisSchema>,
    concurrency: usize,
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("schema", &self.schema)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl AnalysisEngine {
    /// Build an engine over an existing model client
    ///
    /// A schema without check attributes is a setup error here even though
    /// the schema type itself allows it.
    pub fn new(
        client: Arc<dyn ModelClient>,
        schema: AnalysisSchema,
        concurrency: usize,
    ) -> Result<Self, RunError> {
        if schema.is_empty() {
            return Err(RunError::EmptySchema);
        }
        let schema = Arc::new(schema);
        Ok(Self {
            analyzer: UnitAnalyzer::new(Arc::clone(&client), Arc::clone(&schema)),
            categorizer: KeywordCategorizer::new(client),
            schema,
            concurrency: concurrency.max(1),
        })
    }

    /// Build an engine from a run configuration, reading the provider API
    /// key from the environment
    pub fn from_config(config: &RunConfig) -> Result<Self, RunError> {
        let schema = config.schema()?;
        let env = LlmClient::api_key_env(config.provider);
        let api_key = std::env::var(env).map_err(|_| RunError::MissingApiKey(env))?;
        let client = LlmClient::new(config.provider, &api_key, &config.model)
            .map_err(|e| RunError::ClientInit(e.to_string()))?;
        Self::new(Arc::new(client), schema, config.concurrency)
    }

    /// Analyze independent units (one model call each) and aggregate
    pub async fn run_rows(&self, units: Vec<TextUnit>) -> RunOutput {
        tracing::info!(
            units = units.len(),
            concurrency = self.concurrency,
            "Starting row analysis run"
        );

        let analyzer = &self.analyzer;
        let (ids, results): (Vec<String>, Vec<AnalysisResult>) = stream::iter(units)
            .map(|unit| async move {
                let result = analyzer.analyze(&unit.text).await;
                (unit.id, result)
            })
            .buffered(self.concurrency)
            .unzip()
            .await;

        self.finish(ids, results).await
    }

    /// Analyze documents, chunking long ones and merging their chunk
    /// results into one consensus result per document
    pub async fn run_documents(&self, documents: Vec<TextUnit>) -> RunOutput {
        let mut ids: Vec<String> = Vec::with_capacity(documents.len());
        let mut jobs: Vec<(usize, String)> = Vec::new();
        for (index, document) in documents.into_iter().enumerate() {
            let chunks = chunk_text(&document.text);
            tracing::debug!(id = %document.id, chunks = chunks.len(), "Chunked document");
            ids.push(document.id);
            for chunk in chunks {
                jobs.push((index, chunk));
            }
        }
        tracing::info!(
            documents = ids.len(),
            chunks = jobs.len(),
            concurrency = self.concurrency,
            "Starting document analysis run"
        );

        let analyzer = &self.analyzer;
        let chunk_results: Vec<(usize, AnalysisResult)> = stream::iter(jobs)
            .map(|(index, text)| async move { (index, analyzer.analyze(&text).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut per_document: Vec<Vec<AnalysisResult>> = ids.iter().map(|_| Vec::new()).collect();
        for (index, result) in chunk_results {
            per_document[index].push(result);
        }

        let results: Vec<AnalysisResult> = per_document
            .into_iter()
            .map(|mut chunks| {
                if chunks.len() == 1 {
                    // single-chunk documents keep their paraphrase
                    chunks.remove(0)
                } else {
                    merge_chunks(&chunks, &self.schema)
                }
            })
            .collect();

        self.finish(ids, results).await
    }

    /// Shared tail of both run modes: stats, categorization, frequencies
    async fn finish(&self, ids: Vec<String>, results: Vec<AnalysisResult>) -> RunOutput {
        let mut stats = ProcessingStats::default();
        for (id, result) in ids.iter().zip(&results) {
            match &result.error {
                Some(failure) => stats.add_failure(format!("unit {id}: {}", failure.message)),
                None => stats.add_success(),
            }
        }

        let keywords = KeywordCategorizer::collect_keywords(&results);
        let mapping = match self.categorizer.generate_categories(&keywords).await {
            Ok(mapping) => mapping,
            Err(err) => {
                tracing::error!(error = %err, "Category generation failed, using the fallback mapping");
                stats.add_degraded(format!("category generation: {err}"));
                CategoryMapping::fallback(&keywords)
            }
        };

        let assignments: Vec<Vec<String>> = results
            .iter()
            .map(|result| KeywordCategorizer::assign_categories(result, &mapping))
            .collect();
        let frequencies = category_frequencies(&assignments, &mapping);

        let reports: Vec<UnitReport> = ids
            .into_iter()
            .zip(results)
            .zip(assignments)
            .map(|((id, result), categories)| UnitReport {
                id,
                result,
                categories,
            })
            .collect();

        tracing::info!(
            total = stats.total_units,
            failed = stats.failed,
            categories = mapping.len(),
            "Run finished"
        );

        RunOutput {
            reports,
            categories: mapping,
            frequencies,
            stats,
        }
    }
}
