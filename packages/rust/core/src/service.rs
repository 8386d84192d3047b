//! Service facade: the operations an outer surface (CLI, HTTP) calls.
//!
//! Every per-session operation holds that session's lock from start to
//! finish, so two calls on the same session id never interleave.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use reportsmith_extract::{ExtractorRegistry, sanitize_filename};
use reportsmith_render::{RenderedArtifact, RendererRegistry, SummaryReport};
use reportsmith_shared::{
    ExtractedFileContent, FileType, GeneratedContent, OutputFormat, ReportError, Result,
    ServiceConfig, Template, truncate_chars,
};

use crate::ai::CompletionProvider;
use crate::assist::Assistant;
use crate::context::render_segment;
use crate::generation::{EngineSettings, GenerationEngine, GenerationProgress};
use crate::quality::{QualityReport, validate_quality};
use crate::refinement::RefinementEngine;
use crate::session::{SessionHandle, SessionStore, UploadedFile};

/// Characters of the context segment returned as an upload preview.
pub const UPLOAD_PREVIEW_CHARS: usize = 500;

/// A file handed to [`ReportService::upload_files`].
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Client-supplied name; sanitized before use.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a local file, keeping its base name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ReportError::io(path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { filename, bytes })
    }
}

/// Per-file outcome of an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFileSummary {
    pub filename: String,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub content_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub files: Vec<UploadedFile>,
    pub template: Template,
    pub has_generated_content: bool,
}

pub struct ReportService {
    config: ServiceConfig,
    sessions: SessionStore,
    extractors: Arc<ExtractorRegistry>,
    renderers: Arc<RendererRegistry>,
    provider: Arc<dyn CompletionProvider>,
    generation: GenerationEngine,
    refinement: RefinementEngine,
    assistant: Assistant,
}

impl ReportService {
    pub fn new(config: ServiceConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let settings = EngineSettings::from(&config);
        Self {
            sessions: SessionStore::new(),
            extractors: Arc::new(ExtractorRegistry::new()),
            renderers: Arc::new(RendererRegistry::new()),
            generation: GenerationEngine::new(provider.clone(), settings.clone()),
            refinement: RefinementEngine::new(provider.clone(), settings.clone()),
            assistant: Assistant::new(provider.clone(), settings),
            provider,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Apply the configured idle TTL, if any. Returns sessions removed.
    pub fn evict_idle_sessions(&self) -> usize {
        self.config
            .session_idle_ttl
            .map(|ttl| self.sessions.evict_idle(ttl))
            .unwrap_or(0)
    }

    fn existing(&self, session_id: &str) -> Result<SessionHandle> {
        self.sessions
            .get(session_id)
            .ok_or_else(|| ReportError::session_not_found(session_id))
    }

    fn get_or_create(&self, session_id: &str) -> SessionHandle {
        self.evict_idle_sessions();
        self.sessions.get_or_create(session_id)
    }

    // -----------------------------------------------------------------------
    // Sources
    // -----------------------------------------------------------------------

    /// Store and extract each file. Per-file failures are reported in the
    /// returned summaries, never as an error.
    #[instrument(skip_all, fields(session = session_id, files = files.len()))]
    pub async fn upload_files(
        &self,
        session_id: &str,
        files: Vec<UploadFile>,
    ) -> Result<Vec<UploadedFileSummary>> {
        let upload_dir = self.config.upload_dir.clone();
        tokio::fs::create_dir_all(&upload_dir)
            .await
            .map_err(|e| ReportError::io(&upload_dir, e))?;

        let handle = self.get_or_create(session_id);
        let mut session = handle.lock().await;
        let mut summaries = Vec::with_capacity(files.len());

        for file in files {
            let filename = sanitize_filename(&file.filename);
            let path = upload_dir.join(&filename);

            let registry = self.extractors.clone();
            let (task_path, task_name, bytes) = (path.clone(), filename.clone(), file.bytes);
            let extracted = tokio::task::spawn_blocking(move || {
                store_and_extract(&registry, &task_path, &task_name, &bytes)
            })
            .await
            .unwrap_or_else(|e| {
                ExtractedFileContent::failed(
                    FileType::from_filename(&filename),
                    filename.clone(),
                    format!("extraction task failed: {e}"),
                )
            });

            summaries.push(UploadedFileSummary {
                filename: filename.clone(),
                file_type: extracted.file_type,
                content_preview: truncate_chars(
                    &render_segment(&filename, &extracted, &self.config.context),
                    UPLOAD_PREVIEW_CHARS,
                ),
                error: extracted.error().map(str::to_string),
            });
            session.files.push(UploadedFile {
                filename: filename.clone(),
                path,
                file_type: extracted.file_type,
            });
            session.extracted.insert(filename, extracted);
        }

        let failed = summaries.iter().filter(|s| s.error.is_some()).count();
        info!(stored = summaries.len(), failed, "upload complete");
        Ok(summaries)
    }

    // -----------------------------------------------------------------------
    // Template
    // -----------------------------------------------------------------------

    /// The session's template, or the default one for an unknown session.
    pub async fn get_template(&self, session_id: &str) -> Template {
        match self.sessions.get(session_id) {
            Some(handle) => handle.lock().await.template.clone(),
            None => Template::default_report(),
        }
    }

    /// Replace the session's template. Validation happens first; an invalid
    /// template leaves the session (and the store) untouched.
    pub async fn set_template(&self, session_id: &str, template: Template) -> Result<()> {
        template.validate()?;
        let handle = self.get_or_create(session_id);
        handle.lock().await.template = template;
        info!(session = session_id, "template updated");
        Ok(())
    }

    /// Parse, validate and apply a JSON template.
    pub async fn set_template_json(&self, session_id: &str, json: &str) -> Result<Template> {
        let template = Template::from_json(json)?;
        self.set_template(session_id, template.clone()).await?;
        Ok(template)
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    #[instrument(skip_all, fields(session = session_id))]
    pub async fn generate(
        &self,
        session_id: &str,
        custom_instructions: Option<&str>,
        progress: &dyn GenerationProgress,
    ) -> Result<GeneratedContent> {
        let handle = self.existing(session_id)?;
        let mut session = handle.lock().await;

        let content = self
            .generation
            .generate(&session.template, &session.extracted, custom_instructions, progress)
            .await;
        session.generated = Some(content.clone());
        Ok(content)
    }

    #[instrument(skip_all, fields(session = session_id))]
    pub async fn refine(&self, session_id: &str, request: &str) -> Result<GeneratedContent> {
        let handle = self.existing(session_id)?;
        let mut session = handle.lock().await;
        let current = session
            .generated
            .as_ref()
            .ok_or_else(|| ReportError::no_content(session_id))?;

        let refined = self
            .refinement
            .refine(current, request, &session.template, &session.extracted)
            .await;
        session.generated = Some(refined.clone());
        Ok(refined)
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Export by format name. The name is checked before the session.
    pub async fn export(&self, session_id: &str, format: &str) -> Result<RenderedArtifact> {
        let format: OutputFormat = format.parse()?;
        self.export_format(session_id, format).await
    }

    #[instrument(skip_all, fields(session = session_id, %format))]
    pub async fn export_format(
        &self,
        session_id: &str,
        format: OutputFormat,
    ) -> Result<RenderedArtifact> {
        let handle = self.existing(session_id)?;
        let session = handle.lock().await;
        let content = session
            .generated
            .clone()
            .ok_or_else(|| ReportError::no_content(session_id))?;
        let template = session.template.clone();

        let renderers = self.renderers.clone();
        let output_dir = self.config.output_dir.clone();
        tokio::task::spawn_blocking(move || {
            renderers.render_to_dir(&content, &template, format, &output_dir)
        })
        .await
        .map_err(|e| ReportError::Render(format!("render task failed: {e}")))?
    }

    // -----------------------------------------------------------------------
    // Inspection and auxiliary prompts
    // -----------------------------------------------------------------------

    pub async fn get_session(&self, session_id: &str) -> Result<SessionSummary> {
        let handle = self.existing(session_id)?;
        let session = handle.lock().await;
        Ok(SessionSummary {
            session_id: session.id.clone(),
            files: session.files.clone(),
            template: session.template.clone(),
            has_generated_content: session.generated.is_some(),
        })
    }

    pub async fn validate_content(&self, session_id: &str) -> Result<QualityReport> {
        let handle = self.existing(session_id)?;
        let session = handle.lock().await;
        let content = session
            .generated
            .as_ref()
            .ok_or_else(|| ReportError::no_content(session_id))?;
        Ok(validate_quality(content))
    }

    pub async fn summary_report(&self, session_id: &str) -> Result<SummaryReport> {
        let handle = self.existing(session_id)?;
        let session = handle.lock().await;
        let content = session
            .generated
            .as_ref()
            .ok_or_else(|| ReportError::no_content(session_id))?;
        Ok(SummaryReport::build(content, &session.template))
    }

    pub async fn clarifying_questions(&self, session_id: &str) -> Result<Vec<String>> {
        let handle = self.existing(session_id)?;
        let session = handle.lock().await;
        Ok(self
            .assistant
            .clarifying_questions(&session.template, &session.extracted)
            .await)
    }

    pub async fn executive_summary(&self, session_id: &str) -> Result<String> {
        let handle = self.existing(session_id)?;
        let session = handle.lock().await;
        let content = session
            .generated
            .as_ref()
            .ok_or_else(|| ReportError::no_content(session_id))?;
        Ok(self.assistant.executive_summary(content).await)
    }

    /// Model ids offered by the provider, plus the one in use.
    pub async fn available_models(&self) -> Result<(String, Vec<String>)> {
        let models = self
            .provider
            .list_models()
            .await
            .map_err(|e| ReportError::Generation(e.to_string()))?;
        Ok((self.provider.model().to_string(), models))
    }
}

/// Write one upload to disk and extract it. Runs on a blocking thread.
fn store_and_extract(
    registry: &ExtractorRegistry,
    path: &Path,
    filename: &str,
    bytes: &[u8],
) -> ExtractedFileContent {
    if let Err(e) = std::fs::write(path, bytes) {
        warn!(file = %filename, error = %e, "failed to store upload");
        return ExtractedFileContent::failed(
            FileType::from_filename(filename),
            filename.to_string(),
            ReportError::io(path, e).to_string(),
        );
    }
    registry.extract_file(path, filename)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
