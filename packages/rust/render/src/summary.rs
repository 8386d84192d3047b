//! Machine-readable overview of a generated document.

use chrono::{DateTime, Utc};
use serde::Serialize;

use reportsmith_shared::{GeneratedContent, Template, truncate_chars};

/// Characters of section text kept in each preview.
pub const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub document_info: DocumentInfo,
    pub content_stats: ContentStats,
    pub sections: Vec<SectionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub template_version: String,
    pub sources_used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentStats {
    pub total_sections: usize,
    pub total_word_count: usize,
    pub total_citations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub id: String,
    pub title: String,
    pub word_count: usize,
    pub citation_count: usize,
    pub content_preview: String,
}

impl SummaryReport {
    /// Summarize every generated section, in generation order.
    pub fn build(content: &GeneratedContent, template: &Template) -> Self {
        let sections = content
            .sections
            .iter()
            .map(|(id, section)| SectionSummary {
                id: id.clone(),
                title: section.title.clone(),
                word_count: section.word_count,
                citation_count: section.citations.len(),
                content_preview: truncate_chars(&section.content.to_plain_text(), PREVIEW_CHARS),
            })
            .collect();

        Self {
            document_info: DocumentInfo {
                title: template.metadata.name.clone(),
                generated_at: content.metadata.generated_at,
                template_version: template.metadata.version.clone(),
                sources_used: content.metadata.sources_used.clone(),
            },
            content_stats: ContentStats {
                total_sections: content.sections.len(),
                total_word_count: content.total_word_count(),
                total_citations: content.total_citations(),
            },
            sections,
        }
    }
}
