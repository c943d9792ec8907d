//! Prompt construction for keyword category generation

use std::fmt::Write;

/// Keywords beyond this count are summarized rather than listed
pub const MAX_PROMPT_KEYWORDS: usize = 100;

pub const CATEGORY_SYSTEM_PROMPT: &str = "You are an expert at organizing \
survey keywords into thematic categories. You respond with strict JSON only, \
no prose and no markdown fences.";

/// Build the category-generation prompt for a deduplicated keyword pool
pub fn build_category_prompt(keywords: &[String]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Group the following keywords from survey responses into thematic categories.\n\n",
    );

    prompt.push_str("Keywords:\n");
    for keyword in keywords.iter().take(MAX_PROMPT_KEYWORDS) {
        let _ = writeln!(prompt, "- {keyword}");
    }
    if keywords.len() > MAX_PROMPT_KEYWORDS {
        let _ = writeln!(prompt, "... (and {} more)", keywords.len() - MAX_PROMPT_KEYWORDS);
    }

    prompt.push_str(
        "\nRules:\n\
         1. Create between 5 and 10 categories.\n\
         2. Assign every keyword to exactly one category.\n\
         3. Category names are short noun phrases.\n\
         4. Do not invent keywords that are not in the list.\n\n\
         Respond with a single JSON object mapping each category name to the \
         list of its keywords, for example:\n\
         {\n  \"Category name\": [\"keyword1\", \"keyword2\"]\n}\n\n\
         IMPORTANT: respond with the JSON object only.",
    );

    prompt
}
