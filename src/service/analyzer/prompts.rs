//! Prompts for per-unit text analysis

use crate::model::{AnalysisSchema, AnswerType};

/// System prompt for the analysis call
pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert in qualitative text analysis. \
Always answer with the requested JSON object and nothing else.";

/// Build the analysis prompt for one text unit
///
/// Byte-identical output for identical (text, schema), so runs are
/// reproducible against a stub model.
pub fn build_analysis_prompt(text: &str, schema: &AnalysisSchema) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "Analyze the following text and return the results as a single JSON object.\n\n",
    );

    if let Some(question) = schema.research_question() {
        prompt.push_str(&format!(
            "Research question (shared context for all checks): {question}\n\n"
        ));
    }

    prompt.push_str(&format!("Text: \"{text}\"\n\n"));

    prompt.push_str(
        "Provide:\n\
         1. paraphrase: a COMPACT rephrasing of the core statement (at most 1-2 sentences)\n\
         2. sentiment: classify as \"positive\", \"negative\" or \"mixed\"\n\
         3. sentiment_reason: a SHORT justification for the sentiment (at most 30 words)\n\
         4. keywords: extract 2-4 keywords (close to the text, lightly abstracted)\n",
    );

    if !schema.attributes().is_empty() {
        prompt.push_str("5. custom_checks: answer each of the following questions:\n");
        for attribute in schema.attributes() {
            prompt.push_str(&format!("   - {}", attribute.question));
            match attribute.answer_type {
                AnswerType::Boolean => {
                    prompt.push_str(
                        " (answer: true, false, or null if the text has no bearing on the topic)",
                    );
                }
                AnswerType::Categorical => {
                    prompt.push_str(&format!(
                        " (answer: exactly one of [{}], or null if the text has no bearing on the topic)",
                        quoted_list(&attribute.categories)
                    ));
                }
                AnswerType::MultiCategorical => {
                    prompt.push_str(&format!(
                        " (answer: a list with any of [{}], or [] if the text has no bearing on the topic)",
                        quoted_list(&attribute.categories)
                    ));
                }
            }
            if let Some(definition) = &attribute.definition {
                prompt.push_str(&format!("\n     Definition/rules: {definition}"));
            }
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "\nResponse format (follow strictly):\n\
         {\n\
         \x20 \"paraphrase\": \"...\",\n\
         \x20 \"sentiment\": \"positive|negative|mixed\",\n\
         \x20 \"sentiment_reason\": \"...\",\n\
         \x20 \"keywords\": [\"keyword1\", \"keyword2\"],\n\
         \x20 \"custom_checks\": {\n",
    );

    let attribute_count = schema.attributes().len();
    for (idx, attribute) in schema.attributes().iter().enumerate() {
        let placeholder = match attribute.answer_type {
            AnswerType::Boolean => "true|false|null".to_string(),
            AnswerType::Categorical => format!("\"{}|...\"|null", attribute.categories[0]),
            AnswerType::MultiCategorical => format!("[\"{}\", ...]", attribute.categories[0]),
        };
        prompt.push_str(&format!("    \"{}\": {}", attribute.question, placeholder));
        if idx + 1 < attribute_count {
            prompt.push_str(",\n");
        } else {
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "  }\n\
         }\n\n\
         IMPORTANT:\n\
         - Answer ONLY with the JSON object, without additional text\n\
         - Keep the paraphrase COMPACT (at most 1-2 sentences)\n\
         - Keep the sentiment_reason SHORT (at most 30 words)\n\
         - Set a custom check to null when the text has NO bearing on its topic",
    );

    prompt
}

fn quoted_list(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerType, CheckAttribute};

    fn sample_schema() -> AnalysisSchema {
        AnalysisSchema::new(
            vec![
                CheckAttribute::new(
                    "Does the response mention funding?",
                    AnswerType::Boolean,
                    vec![],
                    Some("Count grants and subsidies as funding.".to_string()),
                )
                .unwrap(),
                CheckAttribute::new(
                    "Which area is affected?",
                    AnswerType::Categorical,
                    vec!["Staff".to_string(), "Budget".to_string()],
                    None,
                )
                .unwrap(),
            ],
            Some("How do teams experience the budget process?".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn prompt_is_deterministic() {
        let schema = sample_schema();
        let a = build_analysis_prompt("The budget was cut again.", &schema);
        let b = build_analysis_prompt("The budget was cut again.", &schema);
        assert_eq!(a, b);
    }

    #[test]
    fn research_question_precedes_attribute_questions() {
        let schema = sample_schema();
        let prompt = build_analysis_prompt("Some text.", &schema);

        let rq = prompt
            .find("How do teams experience the budget process?")
            .unwrap();
        let attr = prompt.find("Does the response mention funding?").unwrap();
        assert!(rq < attr);
    }

    #[test]
    fn definition_follows_its_question() {
        let schema = sample_schema();
        let prompt = build_analysis_prompt("Some text.", &schema);
        assert!(prompt.contains("Definition/rules: Count grants and subsidies as funding."));
    }

    #[test]
    fn skeleton_lists_every_attribute_key() {
        let schema = sample_schema();
        let prompt = build_analysis_prompt("Some text.", &schema);
        assert!(prompt.contains("\"Does the response mention funding?\": true|false|null"));
        assert!(prompt.contains("\"Which area is affected?\": \"Staff|...\"|null"));
    }

    #[test]
    fn empty_schema_omits_custom_checks_section() {
        let schema = AnalysisSchema::new(vec![], None).unwrap();
        let prompt = build_analysis_prompt("Some text.", &schema);
        assert!(!prompt.contains("5. custom_checks"));
        assert!(prompt.contains("\"custom_checks\": {"));
    }
}
