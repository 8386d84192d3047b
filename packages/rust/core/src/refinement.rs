//! Whole-document refinement.
//!
//! One completion call rewrites the serialized document. The result is only
//! accepted if it parses back into [`GeneratedContent`]; otherwise the input
//! comes back unchanged with `metadata.refinement_error` set.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use reportsmith_shared::{GeneratedContent, Template};

use crate::ai::{CompletionProvider, complete_with_timeout};
use crate::context::{SourceFiles, assemble_context};
use crate::generation::EngineSettings;

pub struct RefinementEngine {
    provider: Arc<dyn CompletionProvider>,
    settings: EngineSettings,
}

impl RefinementEngine {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: EngineSettings) -> Self {
        Self { provider, settings }
    }

    /// Apply a free-text change request to `current`. Never fails: on any
    /// error the input is returned with the cause recorded.
    #[instrument(skip_all, fields(sections = current.sections.len(), request_chars = request.len()))]
    pub async fn refine(
        &self,
        current: &GeneratedContent,
        request: &str,
        template: &Template,
        sources: &SourceFiles,
    ) -> GeneratedContent {
        match self.try_refine(current, request, template, sources).await {
            Ok(mut refined) => {
                refined.metadata.refinement_error = None;
                info!(sections = refined.sections.len(), "refinement applied");
                refined
            }
            Err(message) => {
                warn!(error = %message, "refinement not applied");
                let mut unchanged = current.clone();
                unchanged.metadata.refinement_error = Some(message);
                unchanged
            }
        }
    }

    async fn try_refine(
        &self,
        current: &GeneratedContent,
        request: &str,
        template: &Template,
        sources: &SourceFiles,
    ) -> Result<GeneratedContent, String> {
        let document = serde_json::to_string_pretty(current).map_err(|e| e.to_string())?;
        let context = assemble_context(sources, &self.settings.context);
        let prompt = refinement_prompt(&document, request, template, &context);

        let reply = complete_with_timeout(self.provider.as_ref(), &prompt, self.settings.timeout)
            .await
            .map_err(|e| e.to_string())?;

        serde_json::from_str(strip_code_fence(&reply))
            .map_err(|e| format!("refined content is not valid JSON: {e}"))
    }
}

fn refinement_prompt(document: &str, request: &str, template: &Template, context: &str) -> String {
    let sections = template
        .sections()
        .iter()
        .map(|s| format!("- {}: {}", s.id, s.title))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are refining a consulting document. Here is the current content:\n\
         \n\
         {document}\n\
         \n\
         User's refinement request: {request}\n\
         \n\
         Template sections:\n\
         {sections}\n\
         \n\
         Available source context:\n\
         {context}\n\
         \n\
         Please refine the content according to the user's request while maintaining:\n\
         1. Professional tone and structure\n\
         2. Evidence-backed statements with proper citations\n\
         3. Consistency with the template structure (keep the same section ids)\n\
         4. Clear, actionable insights\n\
         \n\
         Return only the refined content, as JSON with exactly the same structure as the input."
    )
}

/// Strip one surrounding Markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
