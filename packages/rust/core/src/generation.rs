//! Section-by-section document generation.
//!
//! Each template section gets its own prompt and completion call. A failing
//! section is recorded inline as an error string; it never aborts the rest
//! of the document.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use reportsmith_shared::{
    Citation, ContentType, ContextLimits, GeneratedContent, SectionBody, SectionResult,
    ServiceConfig, Template, TemplateStyle, word_count,
};

use crate::ai::{CompletionError, CompletionProvider, complete_with_timeout};
use crate::context::{SourceFiles, assemble_context};

/// `[...]` spans; only those containing `:` become citations.
static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("valid regex"));

/// Prefix of a section body that failed to generate.
pub const GENERATION_ERROR_PREFIX: &str = "Error generating content: ";

/// How many model ids are suggested when the configured model is missing.
const SUGGESTED_MODELS: usize = 3;

/// Settings shared by every engine that talks to the completion provider.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub timeout: Duration,
    pub context: ContextLimits,
    /// Named in credential error messages.
    pub api_key_env: String,
}

impl From<&ServiceConfig> for EngineSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            timeout: config.completion_timeout,
            context: config.context.clone(),
            api_key_env: config.api_key_env.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for generation.
pub trait GenerationProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each section is generated.
    fn section_progress(&self, current: usize, total: usize, title: &str);
}

/// No-op generation progress.
pub struct SilentProgress;

impl GenerationProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section_progress(&self, _current: usize, _total: usize, _title: &str) {}
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct GenerationEngine {
    provider: Arc<dyn CompletionProvider>,
    settings: EngineSettings,
}

impl GenerationEngine {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: EngineSettings) -> Self {
        Self { provider, settings }
    }

    /// Generate every template section, in the template's list order.
    #[instrument(skip_all, fields(template = %template.metadata.name, sections = template.sections().len(), sources = sources.len()))]
    pub async fn generate(
        &self,
        template: &Template,
        sources: &SourceFiles,
        custom_instructions: Option<&str>,
        progress: &dyn GenerationProgress,
    ) -> GeneratedContent {
        let mut content = GeneratedContent::new(
            template.metadata.name.clone(),
            sources.keys().cloned().collect(),
        );

        progress.phase("Assembling source context");
        let context = assemble_context(sources, &self.settings.context);
        debug!(context_chars = context.len(), "context assembled");

        progress.phase("Generating sections");
        let total = template.sections().len();
        let mut failed = 0;

        for (i, section) in template.sections().iter().enumerate() {
            progress.section_progress(i + 1, total, &section.title);

            let prompt = section_prompt(
                &section.title,
                &section.instructions,
                section.content_type,
                &template.style,
                &context,
                custom_instructions,
            );

            let result =
                match complete_with_timeout(self.provider.as_ref(), &prompt, self.settings.timeout)
                    .await
                {
                    Ok(raw) => SectionResult {
                        title: section.title.clone(),
                        citations: extract_citations(&raw),
                        word_count: word_count(&raw),
                        content: format_content(&raw, section.content_type),
                        content_type: section.content_type,
                    },
                    Err(e) => {
                        warn!(section = %section.id, error = %e, "section generation failed");
                        failed += 1;
                        SectionResult {
                            title: section.title.clone(),
                            content: SectionBody::Text(format!(
                                "{GENERATION_ERROR_PREFIX}{}",
                                self.describe_failure(&e).await
                            )),
                            citations: Vec::new(),
                            word_count: 0,
                            content_type: section.content_type,
                        }
                    }
                };

            content.sections.insert(section.id.clone(), result);
        }

        info!(
            sections = content.sections.len(),
            failed,
            words = content.total_word_count(),
            citations = content.total_citations(),
            "generation complete"
        );
        content
    }

    /// User-facing cause for a failed section.
    async fn describe_failure(&self, error: &CompletionError) -> String {
        match error {
            CompletionError::ModelNotFound { model } => {
                let available: Vec<String> = match tokio::time::timeout(
                    self.settings.timeout,
                    self.provider.list_models(),
                )
                .await
                {
                    Ok(Ok(models)) => models.into_iter().take(SUGGESTED_MODELS).collect(),
                    _ => Vec::new(),
                };
                format!(
                    "Model not found. Current model: {model}. Available models: {}",
                    available.join(", ")
                )
            }
            CompletionError::Auth(_) => format!(
                "Invalid or missing API key. Please check your {} environment variable.",
                self.settings.api_key_env
            ),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt and reply handling
// ---------------------------------------------------------------------------

/// Build the prompt for one section.
pub fn section_prompt(
    title: &str,
    instructions: &str,
    content_type: ContentType,
    style: &TemplateStyle,
    context: &str,
    custom_instructions: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are a professional consultant creating a {title} section for a strategic analysis document.\n\
         Write in a {tone}, {writing_style} voice.\n\
         \n\
         Section Instructions: {instructions}\n\
         \n\
         Content Type: {content_type}\n\
         \n\
         Available Source Material:\n\
         {context}\n\
         \n\
         Requirements:\n\
         1. Write in a {tone}, {writing_style} tone\n\
         2. Base all statements on evidence from the source material\n\
         3. Include proper citations in format [Source: filename, page/slide X]\n\
         4. Make content actionable and insightful\n\
         5. Follow the specified content type format\n",
        tone = style.tone,
        writing_style = style.writing_style,
        content_type = content_type.as_str(),
    );

    if let Some(extra) = custom_instructions.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("\nAdditional Instructions: {extra}\n"));
    }

    prompt.push_str(match content_type {
        ContentType::List => "\nFormat as a bulleted list with clear, actionable items.",
        ContentType::Text => "\nFormat as well-structured paragraphs with clear topic sentences.",
    });
    prompt.push_str("\nGenerate the content now:");
    prompt
}

/// Bracketed spans containing `:`, split at the first colon.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    CITATION_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let body = caps.get(1)?.as_str();
            let (source, location) = body.split_once(':')?;
            Some(Citation {
                source: source.trim().to_string(),
                location: location.trim().to_string(),
                full_citation: body.to_string(),
            })
        })
        .collect()
}

/// Shape the raw completion for the section's content type.
pub fn format_content(raw: &str, content_type: ContentType) -> SectionBody {
    match content_type {
        ContentType::List => SectionBody::List(list_items(raw)),
        ContentType::Text => SectionBody::Text(raw.to_string()),
    }
}

/// Keep bullet (`-`, `•`, `*`) and numbered (`1.`) lines with their markers
/// removed. Falls back to the whole reply as a single item.
pub fn list_items(raw: &str) -> Vec<String> {
    let items: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let first = line.chars().next()?;
            if matches!(first, '-' | '\u{2022}' | '*') {
                Some(line[first.len_utf8()..].trim().to_string())
            } else if first.is_ascii_digit() {
                line.split_once('.').map(|(_, rest)| rest.trim().to_string())
            } else {
                None
            }
        })
        .collect();

    if items.is_empty() {
        vec![raw.to_string()]
    } else {
        items
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
