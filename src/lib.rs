//! LLM-backed analysis of free-text survey responses
//!
//! Each text unit is classified against a user-defined schema (sentiment,
//! keywords, custom checks), long documents are chunked and merged by
//! consensus, and the run ends with keyword categorization and category
//! frequency aggregation.

pub mod model;
pub mod service;
pub mod text;
