//! Advisory quality scoring for generated content.

use serde::Serialize;

use reportsmith_shared::GeneratedContent;

/// Sections longer than this without citations are flagged.
const UNCITED_CHAR_THRESHOLD: usize = 100;

const ACTION_WORDS: [&str; 7] = [
    "recommend",
    "suggest",
    "propose",
    "implement",
    "consider",
    "should",
    "must",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// 0-100.
    pub overall_score: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub citations_count: usize,
}

/// Score `content` on citation density, structure and uncited prose.
pub fn validate_quality(content: &GeneratedContent) -> QualityReport {
    let mut issues = Vec::new();
    let mut suggestions = Vec::new();
    let mut citations_count = 0;

    for section in content.sections.values() {
        let text = section.content.to_plain_text();
        citations_count += section.citations.len();

        if section.citations.is_empty() && text.chars().count() > UNCITED_CHAR_THRESHOLD {
            issues.push(format!("Section '{}' lacks citations", section.title));
        }

        let lower = text.to_lowercase();
        if !ACTION_WORDS.iter().any(|word| lower.contains(word)) {
            suggestions.push(format!("Section '{}' could be more actionable", section.title));
        }
    }

    let sections = content.sections.len();
    let citation_score = (citations_count as f64 / sections.max(1) as f64 * 50.0).min(50.0);
    let structure_score = if sections >= 3 { 30.0 } else { 15.0 };
    let quality_score = if issues.is_empty() { 20.0 } else { 10.0 };

    QualityReport {
        overall_score: citation_score + structure_score + quality_score,
        issues,
        suggestions,
        citations_count,
    }
}
