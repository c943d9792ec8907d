pub mod analyzer;
pub mod categorizer;
pub mod consensus;
pub mod engine;
pub mod frequency;
pub mod llm;
pub mod retry;

pub use analyzer::UnitAnalyzer;
pub use categorizer::KeywordCategorizer;
pub use engine::{AnalysisEngine, RunError, RunOutput, TextUnit, UnitReport};
pub use frequency::CategoryFrequency;
pub use llm::{LlmClient, ModelCallError, ModelClient};
pub use retry::RetryPolicy;
