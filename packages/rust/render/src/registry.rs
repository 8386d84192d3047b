//! Renderer trait, the per-format lookup table, and output file writing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use reportsmith_shared::{GeneratedContent, OutputFormat, ReportError, Result, Template};

use crate::docx::DocxRenderer;
use crate::outline::Outline;
use crate::pdf::PdfRenderer;
use crate::pptx::PptxRenderer;

/// Prefix of every rendered file name.
pub const OUTPUT_PREFIX: &str = "generated_content";

/// Serializes name selection and the final rename across concurrent exports.
static OUTPUT_LOCK: Mutex<()> = Mutex::new(());

/// Trait that each output format implements.
pub trait DocumentRenderer: Send + Sync {
    /// The format this renderer produces.
    fn format(&self) -> OutputFormat;

    /// Lay out `outline` and return the complete file bytes.
    fn render(&self, outline: &Outline) -> Result<Vec<u8>>;
}

/// Metadata for a file written by [`RendererRegistry::render_to_dir`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct RenderedArtifact {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub sha256: String,
    pub size_bytes: usize,
}

impl RenderedArtifact {
    /// The bare file name, for display.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Registry of renderers keyed by output format.
pub struct RendererRegistry {
    renderers: HashMap<OutputFormat, Box<dyn DocumentRenderer>>,
}

impl RendererRegistry {
    /// Registry with the DOCX, PDF and PPTX renderers.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DocxRenderer));
        registry.register(Box::new(PdfRenderer));
        registry.register(Box::new(PptxRenderer));
        registry
    }

    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Add or replace the renderer for its format.
    pub fn register(&mut self, renderer: Box<dyn DocumentRenderer>) {
        self.renderers.insert(renderer.format(), renderer);
    }

    pub fn get(&self, format: OutputFormat) -> Option<&dyn DocumentRenderer> {
        self.renderers.get(&format).map(|r| r.as_ref())
    }

    /// Render `content` through `template` into memory.
    pub fn render(
        &self,
        content: &GeneratedContent,
        template: &Template,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        let renderer = self
            .get(format)
            .ok_or_else(|| ReportError::unsupported_format(format.as_str()))?;
        let outline = Outline::build(content, template);
        debug!(%format, sections = outline.sections.len(), "rendering outline");
        renderer.render(&outline)
    }

    /// Render and write a new file into `dir`.
    ///
    /// The bytes go to a hidden temp file first and are renamed into place,
    /// so a failed render never leaves a partial output behind.
    #[instrument(skip_all, fields(%format, dir = %dir.display()))]
    pub fn render_to_dir(
        &self,
        content: &GeneratedContent,
        template: &Template,
        format: OutputFormat,
        dir: &Path,
    ) -> Result<RenderedArtifact> {
        let bytes = self.render(content, template, format)?;
        std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;

        let target = {
            let _guard = OUTPUT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let target = unique_output_path(dir, format);
            write_atomic(&target, &bytes)?;
            target
        };

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let artifact = RenderedArtifact {
            path: target,
            format,
            sha256: format!("{:x}", hasher.finalize()),
            size_bytes: bytes.len(),
        };

        info!(
            file = %artifact.filename(),
            size = artifact.size_bytes,
            "document exported"
        );
        Ok(artifact)
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// `generated_content_{YYYYmmdd_HHMMSS_mmm}.{ext}`, with `_{n}` appended
/// while the name is taken.
fn unique_output_path(dir: &Path, format: OutputFormat) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S_%3f").to_string();
    stamped_output_path(dir, &stamp, format)
}

/// First free name for `stamp`: the bare name, then `_1`, `_2`, ...
fn stamped_output_path(dir: &Path, stamp: &str, format: OutputFormat) -> PathBuf {
    let ext = format.extension();
    let mut candidate = dir.join(format!("{OUTPUT_PREFIX}_{stamp}.{ext}"));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{OUTPUT_PREFIX}_{stamp}_{n}.{ext}"));
        n += 1;
    }
    candidate
}

fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let filename = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(".{filename}.tmp"));

    if let Err(e) = std::fs::write(&temp, bytes) {
        let _ = std::fs::remove_file(&temp);
        return Err(ReportError::io(&temp, e));
    }
    if let Err(e) = std::fs::rename(&temp, target) {
        let _ = std::fs::remove_file(&temp);
        return Err(ReportError::io(target, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
