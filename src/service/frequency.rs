//! Category frequency aggregation

use serde::Serialize;

use crate::model::CategoryMapping;

/// One category row in the run output: how many units it was assigned to and
/// which keywords belong to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryFrequency {
    pub name: String,
    pub count: usize,
    pub keywords: Vec<String>,
}

/// Tally per-unit category assignments against the run mapping
///
/// Every mapping category appears exactly once, zero-count categories
/// included. Sentinel names seen only in assignments (such as "None") get a
/// row without keywords. Rows are ordered by descending count; ties keep
/// mapping order.
pub fn category_frequencies(
    assignments: &[Vec<String>],
    mapping: &CategoryMapping,
) -> Vec<CategoryFrequency> {
    let mut rows: Vec<CategoryFrequency> = mapping
        .groups()
        .iter()
        .map(|group| CategoryFrequency {
            name: group.name.clone(),
            count: 0,
            keywords: dedupe_keywords(&group.keywords),
        })
        .collect();

    for unit in assignments {
        for name in unit {
            match rows.iter_mut().find(|row| &row.name == name) {
                Some(row) => row.count += 1,
                None => rows.push(CategoryFrequency {
                    name: name.clone(),
                    count: 1,
                    keywords: Vec::new(),
                }),
            }
        }
    }

    // stable sort keeps mapping order among equal counts
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

fn dedupe_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for keyword in keywords {
        if !seen.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            seen.push(keyword.clone());
        }
    }
    seen
}
