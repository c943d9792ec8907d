//! Corpus-wide keyword categories
//!
//! A [`CategoryMapping`] groups every keyword observed in a run into thematic
//! categories. First-seen category order is preserved; it drives assignment
//! order and frequency tie-breaking.

use serde::{Deserialize, Serialize};

/// Sentinel category for units with no keywords (or failed units)
pub const NONE_CATEGORY: &str = "None";

/// Catch-all category used when generation fails or leaves keywords uncovered
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

/// One named category and the keywords assigned to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Ordered grouping of all corpus keywords into categories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMapping {
    groups: Vec<CategoryGroup>,
}

impl CategoryMapping {
    pub fn new(groups: Vec<CategoryGroup>) -> Self {
        Self { groups }
    }

    /// Single catch-all mapping holding every keyword, used when the
    /// category generator is unavailable
    pub fn fallback(keywords: &[String]) -> Self {
        Self {
            groups: vec![CategoryGroup {
                name: FALLBACK_CATEGORY.to_string(),
                keywords: keywords.to_vec(),
            }],
        }
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether a keyword belongs to the named group, case-insensitively
    pub fn group_contains(group: &CategoryGroup, keyword: &str) -> bool {
        let needle = keyword.trim();
        group
            .keywords
            .iter()
            .any(|k| k.trim().eq_ignore_ascii_case(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_mapping_holds_all_keywords() {
        let keywords = vec!["geld".to_string(), "finanzierung".to_string()];
        let mapping = CategoryMapping::fallback(&keywords);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.groups()[0].name, FALLBACK_CATEGORY);
        assert_eq!(mapping.groups()[0].keywords, keywords);
    }

    #[test]
    fn group_lookup_is_case_insensitive() {
        let group = CategoryGroup {
            name: "Finances".to_string(),
            keywords: vec!["Geld".to_string()],
        };
        assert!(CategoryMapping::group_contains(&group, "geld"));
        assert!(!CategoryMapping::group_contains(&group, "personal"));
    }
}
