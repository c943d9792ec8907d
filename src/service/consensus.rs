//! Chunk-to-document consensus
//!
//! Folds the per-chunk results of one logical document into a single
//! document-level result. Error chunks are excluded from consensus; a
//! document whose chunks all failed is itself a failure.

use std::collections::BTreeMap;

use crate::model::{
    AnalysisResult, AnalysisSchema, AnswerType, CheckAttribute, CheckValue, Sentiment,
};

/// Failure kind recorded when no chunk of a document succeeded
pub const ALL_CHUNKS_FAILED: &str = "all_chunks_failed";

/// Maximum keywords kept in the document-level consensus
const MAX_CONSENSUS_KEYWORDS: usize = 4;

/// Merge the ordered chunk results of one document into a consensus result
///
/// The consensus carries sentiment, keywords, custom checks and the
/// sentiment reason of the majority sentiment; it does not synthesize a
/// document-level paraphrase.
pub fn merge_chunks(chunks: &[AnalysisResult], schema: &AnalysisSchema) -> AnalysisResult {
    let successful: Vec<&AnalysisResult> = chunks.iter().filter(|c| !c.is_error()).collect();

    if successful.is_empty() {
        tracing::warn!(
            chunk_count = chunks.len(),
            "No successful chunk results to merge"
        );
        return AnalysisResult::failure(
            ALL_CHUNKS_FAILED,
            format!("no successful chunk results out of {}", chunks.len()),
        );
    }

    let sentiment = consensus_sentiment(&successful);
    let sentiment_reason = successful
        .iter()
        .find(|c| c.sentiment == Some(sentiment))
        .and_then(|c| c.sentiment_reason.clone());
    let keywords = consensus_keywords(&successful);

    let mut custom_checks = BTreeMap::new();
    for attribute in schema.attributes() {
        custom_checks.insert(
            attribute.question.clone(),
            consensus_check(attribute, &successful),
        );
    }

    tracing::debug!(
        chunks = chunks.len(),
        successful = successful.len(),
        sentiment = sentiment.as_str(),
        "Merged chunk results"
    );

    AnalysisResult {
        paraphrase: None,
        sentiment: Some(sentiment),
        sentiment_reason,
        keywords,
        custom_checks,
        error: None,
    }
}

/// Mean of the chunk sentiment scores, re-bucketed at the ±1/3 thresholds
fn consensus_sentiment(successful: &[&AnalysisResult]) -> Sentiment {
    let sum: i32 = successful
        .iter()
        .filter_map(|c| c.sentiment)
        .map(|s| s.score() as i32)
        .sum();
    let mean = sum as f64 / successful.len() as f64;
    Sentiment::from_mean(mean)
}

/// Pool chunk keywords, dedupe case-insensitively, rank by cross-chunk
/// frequency (ties keep first-seen order), keep the top four
fn consensus_keywords(successful: &[&AnalysisResult]) -> Vec<String> {
    struct Ranked {
        key: String,
        display: String,
        count: usize,
    }

    let mut ranked: Vec<Ranked> = Vec::new();
    for chunk in successful {
        for keyword in &chunk.keywords {
            let display = keyword.trim();
            if display.is_empty() {
                continue;
            }
            let key = display.to_lowercase();
            match ranked.iter_mut().find(|r| r.key == key) {
                Some(entry) => entry.count += 1,
                None => ranked.push(Ranked {
                    key,
                    display: display.to_string(),
                    count: 1,
                }),
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
        .into_iter()
        .take(MAX_CONSENSUS_KEYWORDS)
        .map(|r| r.display)
        .collect()
}

/// Resolve one attribute across chunks: majority vote for boolean and
/// categorical answers, set union for multi-categorical ones
fn consensus_check(attribute: &CheckAttribute, successful: &[&AnalysisResult]) -> CheckValue {
    let answers: Vec<&CheckValue> = successful
        .iter()
        .filter_map(|c| c.custom_checks.get(&attribute.question))
        .filter(|v| v.is_coded())
        .collect();

    if answers.is_empty() {
        return CheckValue::NotCoded;
    }

    match attribute.answer_type {
        AnswerType::Boolean | AnswerType::Categorical => majority_vote(&answers),
        AnswerType::MultiCategorical => {
            let mut union: Vec<&str> = Vec::new();
            for answer in &answers {
                if let CheckValue::Categories(categories) = answer {
                    for category in categories {
                        if !union.contains(&category.as_str()) {
                            union.push(category);
                        }
                    }
                }
            }
            // declared-category order keeps the union deterministic
            let ordered: Vec<String> = attribute
                .categories
                .iter()
                .filter(|c| union.contains(&c.as_str()))
                .cloned()
                .collect();
            if ordered.is_empty() {
                CheckValue::NotCoded
            } else {
                CheckValue::Categories(ordered)
            }
        }
    }
}

/// Most frequent answer; ties resolve to the value seen first
fn majority_vote(answers: &[&CheckValue]) -> CheckValue {
    let mut tally: Vec<(&CheckValue, usize)> = Vec::new();
    for answer in answers {
        match tally.iter_mut().find(|(v, _)| v == answer) {
            Some((_, count)) => *count += 1,
            None => tally.push((answer, 1)),
        }
    }

    let mut best = &tally[0];
    for entry in &tally[1..] {
        if entry.1 > best.1 {
            best = entry;
        }
    }
    best.0.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CheckAttribute;

    fn test_schema() -> AnalysisSchema {
        AnalysisSchema::new(
            vec![
                CheckAttribute::new(
                    "Does the response mention funding?",
                    AnswerType::Boolean,
                    vec![],
                    None,
                )
                .unwrap(),
                CheckAttribute::new(
                    "Which area is affected?",
                    AnswerType::Categorical,
                    vec!["Staff".to_string(), "Budget".to_string()],
                    None,
                )
                .unwrap(),
                CheckAttribute::new(
                    "Which topics come up?",
                    AnswerType::MultiCategorical,
                    vec!["Money".to_string(), "Morale".to_string(), "Tools".to_string()],
                    None,
                )
                .unwrap(),
            ],
            None,
        )
        .unwrap()
    }

    fn chunk(
        sentiment: Sentiment,
        keywords: &[&str],
        checks: &[(&str, CheckValue)],
    ) -> AnalysisResult {
        AnalysisResult {
            paraphrase: Some("chunk paraphrase".to_string()),
            sentiment: Some(sentiment),
            sentiment_reason: Some(format!("{} reason", sentiment.as_str())),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            custom_checks: checks
                .iter()
                .map(|(q, v)| (q.to_string(), v.clone()))
                .collect(),
            error: None,
        }
    }

    #[test]
    fn two_positive_one_negative_buckets_positive() {
        let chunks = vec![
            chunk(Sentiment::Positive, &["a", "b"], &[]),
            chunk(Sentiment::Positive, &["a", "c"], &[]),
            chunk(Sentiment::Negative, &["b", "d"], &[]),
        ];
        let merged = merge_chunks(&chunks, &test_schema());
        assert_eq!(merged.sentiment, Some(Sentiment::Positive));
        assert_eq!(merged.sentiment_reason.as_deref(), Some("positive reason"));
    }

    #[test]
    fn all_failed_chunks_yield_error_result() {
        let chunks = vec![
            AnalysisResult::failure("call_exhausted", "timed out"),
            AnalysisResult::failure("malformed_response", "no JSON"),
        ];
        let merged = merge_chunks(&chunks, &test_schema());
        assert!(merged.is_error());
        assert_eq!(merged.error.as_ref().unwrap().kind, ALL_CHUNKS_FAILED);
    }

    #[test]
    fn single_success_among_failures_yields_success() {
        let chunks = vec![
            AnalysisResult::failure("call_exhausted", "timed out"),
            chunk(Sentiment::Mixed, &["budget", "staff"], &[]),
        ];
        let merged = merge_chunks(&chunks, &test_schema());
        assert!(!merged.is_error());
        assert_eq!(merged.sentiment, Some(Sentiment::Mixed));
        assert_eq!(merged.keywords, vec!["budget", "staff"]);
    }

    #[test]
    fn sentiment_consensus_is_monotonic_in_chunk_replacement() {
        // replacing one negative chunk with positive never decreases the mean
        let base = vec![
            chunk(Sentiment::Negative, &["a", "b"], &[]),
            chunk(Sentiment::Mixed, &["a", "b"], &[]),
            chunk(Sentiment::Negative, &["a", "b"], &[]),
        ];
        let mut flipped = base.clone();
        flipped[0] = chunk(Sentiment::Positive, &["a", "b"], &[]);

        let schema = test_schema();
        let before = merge_chunks(&base, &schema).sentiment.unwrap().score();
        let after = merge_chunks(&flipped, &schema).sentiment.unwrap().score();
        assert!(after >= before);
    }

    #[test]
    fn keywords_rank_by_frequency_with_first_seen_tiebreak() {
        let chunks = vec![
            chunk(Sentiment::Mixed, &["Geld", "Personal"], &[]),
            chunk(Sentiment::Mixed, &["geld", "Werkzeug"], &[]),
            chunk(Sentiment::Mixed, &["GELD", "Moral", "Personal"], &[]),
        ];
        let merged = merge_chunks(&chunks, &test_schema());
        // "Geld" appears 3x (case-insensitive), "Personal" 2x, then the
        // singletons in first-seen order; first-seen casing is kept
        assert_eq!(merged.keywords, vec!["Geld", "Personal", "Werkzeug", "Moral"]);
    }

    #[test]
    fn boolean_majority_vote_with_first_seen_tiebreak() {
        let q = "Does the response mention funding?";
        let chunks = vec![
            chunk(Sentiment::Mixed, &["a", "b"], &[(q, CheckValue::Bool(false))]),
            chunk(Sentiment::Mixed, &["a", "b"], &[(q, CheckValue::Bool(true))]),
        ];
        let merged = merge_chunks(&chunks, &test_schema());
        // 1-1 tie resolves to the first-seen value
        assert_eq!(merged.custom_checks[q], CheckValue::Bool(false));
    }

    #[test]
    fn categorical_majority_ignores_not_coded_chunks() {
        let q = "Which area is affected?";
        let chunks = vec![
            chunk(Sentiment::Mixed, &["a", "b"], &[(q, CheckValue::NotCoded)]),
            chunk(
                Sentiment::Mixed,
                &["a", "b"],
                &[(q, CheckValue::Category("Budget".to_string()))],
            ),
            chunk(
                Sentiment::Mixed,
                &["a", "b"],
                &[(q, CheckValue::Category("Budget".to_string()))],
            ),
            chunk(
                Sentiment::Mixed,
                &["a", "b"],
                &[(q, CheckValue::Category("Staff".to_string()))],
            ),
        ];
        let merged = merge_chunks(&chunks, &test_schema());
        assert_eq!(
            merged.custom_checks[q],
            CheckValue::Category("Budget".to_string())
        );
    }

    #[test]
    fn multi_categorical_resolves_by_union_in_declared_order() {
        let q = "Which topics come up?";
        let chunks = vec![
            chunk(
                Sentiment::Mixed,
                &["a", "b"],
                &[(q, CheckValue::Categories(vec!["Tools".to_string()]))],
            ),
            chunk(
                Sentiment::Mixed,
                &["a", "b"],
                &[(
                    q,
                    CheckValue::Categories(vec!["Money".to_string(), "Tools".to_string()]),
                )],
            ),
        ];
        let merged = merge_chunks(&chunks, &test_schema());
        assert_eq!(
            merged.custom_checks[q],
            CheckValue::Categories(vec!["Money".to_string(), "Tools".to_string()])
        );
    }

    #[test]
    fn unanswered_attribute_is_not_coded() {
        let chunks = vec![chunk(Sentiment::Mixed, &["a", "b"], &[])];
        let merged = merge_chunks(&chunks, &test_schema());
        assert_eq!(
            merged.custom_checks["Which topics come up?"],
            CheckValue::NotCoded
        );
    }

    #[test]
    fn merged_result_has_no_paraphrase() {
        let chunks = vec![chunk(Sentiment::Positive, &["a", "b"], &[])];
        let merged = merge_chunks(&chunks, &test_schema());
        assert_eq!(merged.paraphrase, None);
    }
}
