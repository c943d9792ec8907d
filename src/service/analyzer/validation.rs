//! Validation of model replies against the analysis schema
//!
//! Parses the raw reply as JSON and checks it field by field. Unlike lenient
//! coercion (padding keywords, defaulting sentiment), every mismatch is
//! rejected with a specific error so failed units are visible in the stats.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{
    AnalysisResult, AnalysisSchema, AnswerType, CheckAttribute, CheckValue, Sentiment,
};
use crate::service::analyzer::error::AnalysisError;

const MIN_KEYWORDS: usize = 2;
const MAX_KEYWORDS: usize = 4;

/// Literal accepted as an explicit "does not apply" answer
const NOT_CODED_LITERAL: &str = "not coded";

/// Parse and validate a raw model reply into an [`AnalysisResult`]
pub fn parse_analysis_response(
    raw: &str,
    schema: &AnalysisSchema,
) -> Result<AnalysisResult, AnalysisError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| AnalysisError::MalformedResponse("no JSON object in reply".to_string()))?;

    let value: Value = serde_json::from_str(json)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| AnalysisError::MalformedResponse("reply is not a JSON object".to_string()))?;

    for key in ["paraphrase", "sentiment", "keywords", "custom_checks"] {
        if !object.contains_key(key) {
            return Err(AnalysisError::MalformedResponse(format!(
                "missing key '{key}'"
            )));
        }
    }

    let paraphrase = object
        .get("paraphrase")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AnalysisError::MalformedResponse("paraphrase must be a non-empty string".to_string())
        })?
        .to_string();

    let sentiment = validate_sentiment(&object["sentiment"])?;
    let sentiment_reason = validate_sentiment_reason(object.get("sentiment_reason"))?;
    let keywords = validate_keywords(&object["keywords"])?;

    let checks_object = object["custom_checks"].as_object().ok_or_else(|| {
        AnalysisError::MalformedResponse("custom_checks must be a JSON object".to_string())
    })?;

    let mut custom_checks = BTreeMap::new();
    for attribute in schema.attributes() {
        let answer = checks_object.get(&attribute.question);
        let value = validate_check_value(attribute, answer)?;
        custom_checks.insert(attribute.question.clone(), value);
    }

    Ok(AnalysisResult {
        paraphrase: Some(paraphrase),
        sentiment: Some(sentiment),
        sentiment_reason,
        keywords,
        custom_checks,
        error: None,
    })
}

/// Locate the JSON object inside the reply, tolerating code fences and
/// surrounding prose
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn validate_sentiment(value: &Value) -> Result<Sentiment, AnalysisError> {
    let literal = value
        .as_str()
        .ok_or_else(|| AnalysisError::InvalidSentiment(value.to_string()))?;
    Sentiment::parse(literal).ok_or_else(|| AnalysisError::InvalidSentiment(literal.to_string()))
}

fn validate_sentiment_reason(value: Option<&Value>) -> Result<Option<String>, AnalysisError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(reason)) => {
            let trimmed = reason.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(AnalysisError::MalformedResponse(format!(
            "sentiment_reason must be a string, got {other}"
        ))),
    }
}

fn validate_keywords(value: &Value) -> Result<Vec<String>, AnalysisError> {
    let entries = value.as_array().ok_or_else(|| {
        AnalysisError::MalformedResponse("keywords must be a JSON array".to_string())
    })?;

    let mut keywords: Vec<String> = Vec::with_capacity(entries.len());
    let mut seen: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let keyword = entry
            .as_str()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(AnalysisError::InvalidKeywordCount(entries.len()))?;
        let key = keyword.to_lowercase();
        if seen.contains(&key) {
            // duplicates collapse below the declared count
            return Err(AnalysisError::InvalidKeywordCount(entries.len()));
        }
        seen.push(key);
        keywords.push(keyword.to_string());
    }

    if !(MIN_KEYWORDS..=MAX_KEYWORDS).contains(&keywords.len()) {
        return Err(AnalysisError::InvalidKeywordCount(keywords.len()));
    }
    Ok(keywords)
}

/// Validate one attribute answer against its declared type
///
/// A missing key, JSON null, or the "not coded" literal all mean the
/// attribute does not apply to this text.
fn validate_check_value(
    attribute: &CheckAttribute,
    answer: Option<&Value>,
) -> Result<CheckValue, AnalysisError> {
    let invalid = |message: String| AnalysisError::InvalidAttributeValue {
        attribute: attribute.question.clone(),
        message,
    };

    let value = match answer {
        None | Some(Value::Null) => return Ok(CheckValue::NotCoded),
        Some(value) => value,
    };

    match attribute.answer_type {
        AnswerType::Boolean => match value {
            Value::Bool(b) => Ok(CheckValue::Bool(*b)),
            Value::String(s) if s.trim().eq_ignore_ascii_case(NOT_CODED_LITERAL) => {
                Ok(CheckValue::NotCoded)
            }
            other => Err(invalid(format!("expected true/false/null, got {other}"))),
        },
        AnswerType::Categorical => match value {
            Value::String(s) if s.trim().eq_ignore_ascii_case(NOT_CODED_LITERAL) => {
                Ok(CheckValue::NotCoded)
            }
            Value::String(s) => attribute
                .canonical_category(s)
                .map(|c| CheckValue::Category(c.to_string()))
                .ok_or_else(|| invalid(format!("'{s}' is not a declared category"))),
            other => Err(invalid(format!("expected a category string, got {other}"))),
        },
        AnswerType::MultiCategorical => match value {
            Value::Array(entries) => {
                let mut selected: Vec<&str> = Vec::with_capacity(entries.len());
                for entry in entries {
                    let answer = entry
                        .as_str()
                        .ok_or_else(|| invalid(format!("expected category strings, got {entry}")))?;
                    let canonical = attribute
                        .canonical_category(answer)
                        .ok_or_else(|| invalid(format!("'{answer}' is not a declared category")))?;
                    if !selected.contains(&canonical) {
                        selected.push(canonical);
                    }
                }
                if selected.is_empty() {
                    return Ok(CheckValue::NotCoded);
                }
                // stored in declared-category order
                let ordered: Vec<String> = attribute
                    .categories
                    .iter()
                    .filter(|c| selected.contains(&c.as_str()))
                    .cloned()
                    .collect();
                Ok(CheckValue::Categories(ordered))
            }
            Value::String(s) if s.trim().eq_ignore_ascii_case(NOT_CODED_LITERAL) => {
                Ok(CheckValue::NotCoded)
            }
            other => Err(invalid(format!("expected a category list, got {other}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerType, CheckAttribute};

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

    fn valid_reply() -> String {
        r#"{
            "paraphrase": "The budget was reduced and the team is frustrated.",
            "sentiment": "negative",
            "sentiment_reason": "Complains about cuts.",
            "keywords": ["budget", "frustration"],
            "custom_checks": {
                "Does the response mention funding?": true,
                "Which area is affected?": "budget",
                "Which topics come up?": ["morale", "Money"]
            }
        }"#
        .to_string()
    }

    #[test]
    fn accepts_valid_reply_and_restores_category_spelling() {
        let result = parse_analysis_response(&valid_reply(), &test_schema()).unwrap();
        assert!(!result.is_error());
        assert_eq!(result.sentiment, Some(Sentiment::Negative));
        assert_eq!(
            result.custom_checks["Which area is affected?"],
            CheckValue::Category("Budget".to_string())
        );
        // multi answers come back in declared-category order
        assert_eq!(
            result.custom_checks["Which topics come up?"],
            CheckValue::Categories(vec!["Money".to_string(), "Morale".to_string()])
        );
    }

    #[test]
    fn accepts_fenced_json() {
        let fenced = format!("```json\n{}\n```", valid_reply());
        let result = parse_analysis_response(&fenced, &test_schema()).unwrap();
        assert!(!result.is_error());
    }

    #[test]
    fn rejects_bad_sentiment() {
        let reply = valid_reply().replace("\"negative\"", "\"neutral\"");
        let err = parse_analysis_response(&reply, &test_schema()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidSentiment(_)));
    }

    #[test]
    fn rejects_wrong_keyword_count() {
        let reply = valid_reply().replace(
            "[\"budget\", \"frustration\"]",
            "[\"budget\", \"cuts\", \"team\", \"morale\", \"tools\"]",
        );
        let err = parse_analysis_response(&reply, &test_schema()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidKeywordCount(5)));
    }

    #[test]
    fn rejects_duplicate_keywords_case_insensitively() {
        let reply = valid_reply().replace(
            "[\"budget\", \"frustration\"]",
            "[\"Budget\", \"budget\"]",
        );
        let err = parse_analysis_response(&reply, &test_schema()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidKeywordCount(_)));
    }

    #[test]
    fn rejects_non_boolean_for_boolean_attribute() {
        let reply = valid_reply().replace(
            "\"Does the response mention funding?\": true",
            "\"Does the response mention funding?\": \"yes\"",
        );
        let err = parse_analysis_response(&reply, &test_schema()).unwrap_err();
        match err {
            AnalysisError::InvalidAttributeValue { attribute, .. } => {
                assert_eq!(attribute, "Does the response mention funding?");
            }
            other => panic!("expected attribute error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_undeclared_category() {
        let reply = valid_reply().replace("\"budget\"", "\"Marketing\"");
        let err = parse_analysis_response(&reply, &test_schema()).unwrap_err();
        match err {
            AnalysisError::InvalidAttributeValue { attribute, message } => {
                assert_eq!(attribute, "Which area is affected?");
                assert!(message.contains("Marketing"));
            }
            other => panic!("expected attribute error, got {other:?}"),
        }
    }

    #[test]
    fn missing_top_level_key_is_malformed() {
        let reply = r#"{"paraphrase": "x", "sentiment": "mixed", "keywords": ["a", "b"]}"#;
        let err = parse_analysis_response(reply, &test_schema()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn unparseable_reply_is_malformed() {
        let err = parse_analysis_response("the model rambled instead", &test_schema()).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn null_and_missing_attribute_answers_are_not_coded() {
        let reply = r#"{
            "paraphrase": "Off-topic remark.",
            "sentiment": "mixed",
            "keywords": ["weather", "small talk"],
            "custom_checks": {
                "Does the response mention funding?": null,
                "Which topics come up?": []
            }
        }"#;
        let result = parse_analysis_response(reply, &test_schema()).unwrap();
        assert_eq!(
            result.custom_checks["Does the response mention funding?"],
            CheckValue::NotCoded
        );
        assert_eq!(
            result.custom_checks["Which area is affected?"],
            CheckValue::NotCoded
        );
        assert_eq!(
            result.custom_checks["Which topics come up?"],
            CheckValue::NotCoded
        );
    }
}
