//! Per-unit analysis results
//!
//! One [`AnalysisResult`] is produced per text unit (spreadsheet row or
//! document chunk). Results are never mutated after creation; chunk consensus
//! produces a new instance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bucketing threshold for the mean chunk sentiment. A mean of exactly 1/3
/// (e.g. chunks [positive, positive, negative]) buckets positive.
const SENTIMENT_BUCKET_THRESHOLD: f64 = 1.0 / 3.0;

/// Sentiment classification of one text unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
}

impl Sentiment {
    /// Numeric score used for chunk consensus: positive +1, mixed 0, negative -1
    pub fn score(self) -> i8 {
        match self {
            Sentiment::Positive => 1,
            Sentiment::Mixed => 0,
            Sentiment::Negative => -1,
        }
    }

    /// Re-bucket a mean chunk score back into a sentiment
    pub fn from_mean(mean: f64) -> Self {
        if mean >= SENTIMENT_BUCKET_THRESHOLD {
            Sentiment::Positive
        } else if mean <= -SENTIMENT_BUCKET_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Mixed
        }
    }

    /// Parse a model-supplied literal, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "mixed" => Some(Sentiment::Mixed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Mixed => "mixed",
        }
    }
}

/// Answer to one check attribute, tagged by the attribute's declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CheckValue {
    Bool(bool),
    Category(String),
    Categories(Vec<String>),
    /// The attribute does not apply to this text
    NotCoded,
}

impl CheckValue {
    pub fn is_coded(&self) -> bool {
        !matches!(self, CheckValue::NotCoded)
    }
}

/// Recorded unit-scoped failure: a machine-readable kind plus message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub kind: String,
    pub message: String,
}

/// Analysis of one text unit
///
/// When `error` is present, all analytic fields are unset; downstream
/// consumers (chunk consensus, category assignment) skip such results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paraphrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_checks: BTreeMap<String, CheckValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<AnalysisFailure>,
}

impl AnalysisResult {
    /// Build a failure result with every analytic field unset
    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            paraphrase: None,
            sentiment: None,
            sentiment_reason: None,
            keywords: Vec::new(),
            custom_checks: BTreeMap::new(),
            error: Some(AnalysisFailure {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
