pub mod category;
pub mod config;
pub mod result;
pub mod schema;
pub mod stats;

pub use category::{CategoryGroup, CategoryMapping, FALLBACK_CATEGORY, NONE_CATEGORY};
pub use config::{ConfigError, Provider, RunConfig};
pub use result::{AnalysisFailure, AnalysisResult, CheckValue, Sentiment};
pub use schema::{AnalysisSchema, AnswerType, CheckAttribute, SchemaError};
pub use stats::ProcessingStats;
