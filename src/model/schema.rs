//! Classification schema: user-defined check attributes plus run-wide context
//!
//! A schema is immutable once built; every prompt of a run is rendered
//! against the same attribute list.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors raised when building a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("check attribute question must not be empty")]
    EmptyQuestion,

    #[error("attribute '{0}' requires at least one category")]
    MissingCategories(String),

    #[error("attribute '{0}' declares an empty category name")]
    EmptyCategory(String),

    #[error("attribute '{0}' declares duplicate category '{1}'")]
    DuplicateCategory(String, String),

    #[error("boolean attribute '{0}' must not declare categories")]
    UnexpectedCategories(String),
}

/// Declared answer type of a check attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Boolean,
    Categorical,
    MultiCategorical,
}

/// A user-defined classification question
///
/// Invariant: categorical and multi-categorical attributes carry at least one
/// distinct non-empty category; boolean attributes carry none. Use
/// [`CheckAttribute::new`] or call [`CheckAttribute::validate`] after
/// deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckAttribute {
    pub question: String,
    pub answer_type: AnswerType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl CheckAttribute {
    /// Create a validated attribute
    pub fn new(
        question: impl Into<String>,
        answer_type: AnswerType,
        categories: Vec<String>,
        definition: Option<String>,
    ) -> Result<Self, SchemaError> {
        let attribute = Self {
            question: question.into(),
            answer_type,
            categories,
            definition,
        };
        attribute.validate()?;
        Ok(attribute)
    }

    /// Check the attribute invariants
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.question.trim().is_empty() {
            return Err(SchemaError::EmptyQuestion);
        }

        match self.answer_type {
            AnswerType::Boolean => {
                if !self.categories.is_empty() {
                    return Err(SchemaError::UnexpectedCategories(self.question.clone()));
                }
            }
            AnswerType::Categorical | AnswerType::MultiCategorical => {
                if self.categories.is_empty() {
                    return Err(SchemaError::MissingCategories(self.question.clone()));
                }
                let mut seen: Vec<String> = Vec::new();
                for category in &self.categories {
                    if category.trim().is_empty() {
                        return Err(SchemaError::EmptyCategory(self.question.clone()));
                    }
                    let key = category.trim().to_lowercase();
                    if seen.contains(&key) {
                        return Err(SchemaError::DuplicateCategory(
                            self.question.clone(),
                            category.clone(),
                        ));
                    }
                    seen.push(key);
                }
            }
        }

        Ok(())
    }

    /// Resolve a category answer to its declared spelling, case-insensitively
    pub fn canonical_category(&self, candidate: &str) -> Option<&str> {
        let needle = candidate.trim();
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(needle))
            .map(String::as_str)
    }
}

/// Ordered attribute list plus optional corpus-level research question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSchema {
    attributes: Vec<CheckAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    research_question: Option<String>,
}

impl AnalysisSchema {
    /// Build a schema, validating every attribute
    ///
    /// An empty attribute list is representable here (sentiment/keyword-only
    /// runs); the run driver treats it as a fatal precondition instead.
    pub fn new(
        attributes: Vec<CheckAttribute>,
        research_question: Option<String>,
    ) -> Result<Self, SchemaError> {
        for attribute in &attributes {
            attribute.validate()?;
        }
        let research_question =
            research_question.and_then(|q| (!q.trim().is_empty()).then_some(q));
        Ok(Self {
            attributes,
            research_question,
        })
    }

    pub fn attributes(&self) -> &[CheckAttribute] {
        &self.attributes
    }

    pub fn research_question(&self) -> Option<&str> {
        self.research_question.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Look up an attribute by its question text
    pub fn attribute(&self, question: &str) -> Option<&CheckAttribute> {
        self.attributes.iter().find(|a| a.question == question)
    }
}
