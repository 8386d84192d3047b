//! Auxiliary prompts: clarifying questions before generation and an
//! executive summary after it.

use std::sync::Arc;

use tracing::{instrument, warn};

use reportsmith_shared::{GeneratedContent, Template, truncate_chars};

use crate::ai::{CompletionProvider, complete_with_timeout};
use crate::context::{SourceFiles, assemble_context};
use crate::generation::EngineSettings;
use crate::refinement::strip_code_fence;

/// Characters of each section shown to the summary prompt.
const SUMMARY_PREVIEW_CHARS: usize = 200;

pub struct Assistant {
    provider: Arc<dyn CompletionProvider>,
    settings: EngineSettings,
}

impl Assistant {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: EngineSettings) -> Self {
        Self { provider, settings }
    }

    /// Ask the model for 3-5 questions that would improve the document.
    ///
    /// A reply that is not a JSON array of strings yields no questions; a
    /// failed call yields one `Error generating questions: ...` entry.
    #[instrument(skip_all, fields(template = %template.metadata.name, sources = sources.len()))]
    pub async fn clarifying_questions(&self, template: &Template, sources: &SourceFiles) -> Vec<String> {
        let template_json = match template.export_json() {
            Ok(json) => json,
            Err(e) => return vec![format!("Error generating questions: {e}")],
        };
        let context = assemble_context(sources, &self.settings.context);
        let prompt = format!(
            "Based on the following template and extracted content, what clarifying questions \
             should I ask the user to improve the quality and completeness of the generated document?\n\
             \n\
             Template: {template_json}\n\
             \n\
             Extracted Content: {context}\n\
             \n\
             Generate 3-5 specific, actionable questions that would help clarify:\n\
             1. Missing information needed for key sections\n\
             2. Specific requirements or preferences\n\
             3. Target audience or use case details\n\
             4. Any ambiguities in the source material\n\
             \n\
             Return as a JSON array of strings."
        );

        match complete_with_timeout(self.provider.as_ref(), &prompt, self.settings.timeout).await {
            Ok(reply) => parse_questions(&reply),
            Err(e) => {
                warn!(error = %e, "clarifying questions failed");
                vec![format!("Error generating questions: {e}")]
            }
        }
    }

    /// A summary of at most 300 words built from section previews.
    #[instrument(skip_all, fields(sections = content.sections.len()))]
    pub async fn executive_summary(&self, content: &GeneratedContent) -> String {
        let previews: Vec<String> = content
            .sections
            .values()
            .map(|s| {
                format!(
                    "{}: {}",
                    s.title,
                    truncate_chars(&s.content.to_plain_text(), SUMMARY_PREVIEW_CHARS)
                )
            })
            .collect();
        let previews = serde_json::to_string_pretty(&previews).unwrap_or_default();

        let prompt = format!(
            "Create a concise executive summary (max 300 words) based on this document content:\n\
             \n\
             {previews}\n\
             \n\
             The executive summary should:\n\
             1. Highlight key findings and insights\n\
             2. Present main recommendations\n\
             3. Be suitable for C-level executives\n\
             4. Maintain professional tone"
        );

        match complete_with_timeout(self.provider.as_ref(), &prompt, self.settings.timeout).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "executive summary failed");
                format!("Error generating executive summary: {e}")
            }
        }
    }
}

/// Accepts a JSON array, optionally fenced. Non-string entries are dropped.
fn parse_questions(reply: &str) -> Vec<String> {
    match serde_json::from_str::<serde_json::Value>(strip_code_fence(reply)) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
