//! Keyword categorization
//!
//! Pools the keywords extracted across a run, asks the model for a thematic
//! grouping and normalizes the reply into a [`CategoryMapping`] that covers
//! every pooled keyword exactly once.

mod prompts;

pub use prompts::{build_category_prompt, CATEGORY_SYSTEM_PROMPT, MAX_PROMPT_KEYWORDS};

use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{
    AnalysisResult, CategoryGroup, CategoryMapping, FALLBACK_CATEGORY, NONE_CATEGORY,
};
use crate::service::analyzer::AnalysisError;
use crate::service::llm::ModelClient;
use crate::service::retry::{call_with_retry, RetryPolicy};

/// Expected category count range; replies outside it are kept with a warning
const EXPECTED_CATEGORIES: std::ops::RangeInclusive<usize> = 5..=10;

pub struct KeywordCategorizer {
    client: Arc<dyn ModelClient>,
    policy: RetryPolicy,
}

impl KeywordCategorizer {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(client: Arc<dyn ModelClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Pool the keywords of all successful results: trimmed, lowercased,
    /// deduplicated and sorted
    pub fn collect_keywords(results: &[AnalysisResult]) -> Vec<String> {
        let mut pool: Vec<String> = Vec::new();
        for result in results.iter().filter(|r| !r.is_error()) {
            for keyword in &result.keywords {
                let normalized = keyword.trim().to_lowercase();
                if !normalized.is_empty() && !pool.contains(&normalized) {
                    pool.push(normalized);
                }
            }
        }
        pool.sort();
        pool
    }

    /// Ask the model for a thematic grouping of the pooled keywords
    ///
    /// The reply is normalized so that every input keyword lands in exactly
    /// one category: unknown keywords are dropped, duplicates keep their
    /// first category and unassigned keywords fall back to
    /// [`FALLBACK_CATEGORY`].
    pub async fn generate_categories(
        &self,
        keywords: &[String],
    ) -> Result<CategoryMapping, AnalysisError> {
        if keywords.is_empty() {
            return Ok(CategoryMapping::new(Vec::new()));
        }

        let prompt = build_category_prompt(keywords);
        let raw =
            call_with_retry(self.client.as_ref(), &self.policy, CATEGORY_SYSTEM_PROMPT, &prompt)
                .await?;
        let mapping = parse_category_response(&raw, keywords)?;

        if !EXPECTED_CATEGORIES.contains(&mapping.len()) {
            tracing::warn!(
                categories = mapping.len(),
                "Category count outside the expected range"
            );
        }
        tracing::info!(
            keywords = keywords.len(),
            categories = mapping.len(),
            "Generated keyword categories"
        );
        Ok(mapping)
    }

    /// Map a unit's keywords onto category names, in mapping order
    ///
    /// Error results and results without keywords land in the
    /// [`NONE_CATEGORY`] sentinel.
    pub fn assign_categories(result: &AnalysisResult, mapping: &CategoryMapping) -> Vec<String> {
        if result.is_error() || result.keywords.is_empty() {
            return vec![NONE_CATEGORY.to_string()];
        }

        let assigned: Vec<String> = mapping
            .groups()
            .iter()
            .filter(|group| {
                result
                    .keywords
                    .iter()
                    .any(|k| CategoryMapping::group_contains(group, k))
            })
            .map(|group| group.name.clone())
            .collect();

        if assigned.is_empty() {
            vec![NONE_CATEGORY.to_string()]
        } else {
            assigned
        }
    }
}

/// Parse the model's category JSON and normalize it to full, exactly-once
/// coverage of the input pool
fn parse_category_response(
    raw: &str,
    keywords: &[String],
) -> Result<CategoryMapping, AnalysisError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let body = match (start, end) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => {
            return Err(AnalysisError::MalformedResponse(
                "no JSON object in category reply".to_string(),
            ))
        }
    };

    let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedResponse(format!("category reply: {e}")))?;

    let known: HashSet<&str> = keywords.iter().map(String::as_str).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for (name, value) in &parsed {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let entries = value.as_array().ok_or_else(|| {
            AnalysisError::MalformedResponse(format!("category \"{name}\" is not a list"))
        })?;

        let mut members: Vec<String> = Vec::new();
        for entry in entries {
            let keyword = match entry.as_str() {
                Some(s) => s.trim().to_lowercase(),
                None => continue,
            };
            // unknown keywords are dropped, duplicates keep the first category
            if known.contains(keyword.as_str()) && seen.insert(keyword.clone()) {
                members.push(keyword);
            }
        }
        if !members.is_empty() {
            groups.push(CategoryGroup {
                name: name.to_string(),
                keywords: members,
            });
        }
    }

    let missing: Vec<String> = keywords
        .iter()
        .filter(|k| !seen.contains(k.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        tracing::warn!(
            missing = missing.len(),
            "Keywords not covered by the model mapping, using the fallback category"
        );
        groups.push(CategoryGroup {
            name: FALLBACK_CATEGORY.to_string(),
            keywords: missing,
        });
    }

    Ok(CategoryMapping::new(groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;
    use crate::service::llm::ModelCallError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    struct CannedClient {
        reply: String,
    }

    #[async_trait]
    impl ModelClient for CannedClient {
        async fn call(&self, _system: &str, _prompt: &str) -> Result<String, ModelCallError> {
            Ok(self.reply.clone())
        }
    }

    fn success(keywords: &[&str]) -> AnalysisResult {
        AnalysisResult {
            paraphrase: Some("p".to_string()),
            sentiment: Some(Sentiment::Mixed),
            sentiment_reason: None,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            custom_checks: BTreeMap::new(),
            error: None,
        }
    }

    #[test]
    fn collect_keywords_dedupes_case_insensitively_and_sorts() {
        let results = vec![
            success(&["Geld", "Personal"]),
            success(&["geld", "Finanzierung"]),
            AnalysisResult::failure("call_exhausted", "skip me"),
        ];
        let pool = KeywordCategorizer::collect_keywords(&results);
        assert_eq!(pool, vec!["finanzierung", "geld", "personal"]);
    }

    #[test]
    fn parse_assigns_missing_keywords_to_fallback() {
        let keywords = vec!["geld".to_string(), "moral".to_string(), "personal".to_string()];
        let raw = r#"{"Finances": ["geld"], "Staffing": ["personal"]}"#;
        let mapping = parse_category_response(raw, &keywords).unwrap();
        let names: Vec<&str> = mapping.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Finances", "Staffing", FALLBACK_CATEGORY]);
        assert_eq!(mapping.groups()[2].keywords, vec!["moral"]);
    }

    #[test]
    fn parse_drops_unknown_keywords_and_duplicate_assignments() {
        let keywords = vec!["geld".to_string(), "personal".to_string()];
        let raw = r#"{"A": ["geld", "invented"], "B": ["Geld", "personal"]}"#;
        let mapping = parse_category_response(raw, &keywords).unwrap();
        assert_eq!(mapping.groups()[0].keywords, vec!["geld"]);
        assert_eq!(mapping.groups()[1].keywords, vec!["personal"]);
    }

    #[test]
    fn parse_rejects_replies_without_json() {
        let keywords = vec!["geld".to_string()];
        let err = parse_category_response("I cannot do that", &keywords).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn assign_categories_uses_none_sentinel_for_errors_and_misses() {
        let mapping = CategoryMapping::new(vec![CategoryGroup {
            name: "Finances".to_string(),
            keywords: vec!["geld".to_string()],
        }]);

        let failed = AnalysisResult::failure("call_exhausted", "boom");
        assert_eq!(
            KeywordCategorizer::assign_categories(&failed, &mapping),
            vec![NONE_CATEGORY.to_string()]
        );

        let unmatched = success(&["moral"]);
        assert_eq!(
            KeywordCategorizer::assign_categories(&unmatched, &mapping),
            vec![NONE_CATEGORY.to_string()]
        );
    }

    #[test]
    fn assign_categories_matches_case_insensitively_in_mapping_order() {
        let mapping = CategoryMapping::new(vec![
            CategoryGroup {
                name: "Finances".to_string(),
                keywords: vec!["geld".to_string()],
            },
            CategoryGroup {
                name: "Staffing".to_string(),
                keywords: vec!["personal".to_string()],
            },
        ]);
        let unit = success(&["Personal", "GELD"]);
        assert_eq!(
            KeywordCategorizer::assign_categories(&unit, &mapping),
            vec!["Finances".to_string(), "Staffing".to_string()]
        );
    }

    #[tokio::test]
    async fn generate_categories_short_circuits_on_empty_pool() {
        let client = Arc::new(CannedClient {
            reply: "should never be called".to_string(),
        });
        let categorizer = KeywordCategorizer::new(client);
        let mapping = categorizer.generate_categories(&[]).await.unwrap();
        assert!(mapping.is_empty());
    }

    #[tokio::test]
    async fn generate_categories_parses_a_model_reply() {
        let client = Arc::new(CannedClient {
            reply: r#"{"Finances": ["geld"], "Staffing": ["personal"]}"#.to_string(),
        });
        let categorizer = KeywordCategorizer::new(client);
        let keywords = vec!["geld".to_string(), "personal".to_string()];
        let mapping = categorizer.generate_categories(&keywords).await.unwrap();
        assert_eq!(mapping.len(), 2);
    }
}
