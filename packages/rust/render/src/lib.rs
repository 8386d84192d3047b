//! Document rendering for ReportSmith.
//!
//! Generated content is first reduced to a format-independent [`Outline`]
//! (template order, absent sections dropped), then laid out by one
//! [`DocumentRenderer`] per [`OutputFormat`](reportsmith_shared::OutputFormat).
//! [`RendererRegistry::render_to_dir`] writes the result under a
//! collision-free timestamped name.

pub mod docx;
pub mod outline;
pub mod pdf;
pub mod pptx;
pub mod registry;
pub mod summary;
mod xml;

pub use docx::DocxRenderer;
pub use outline::{Outline, OutlineBody, OutlineSection};
pub use pdf::PdfRenderer;
pub use pptx::PptxRenderer;
pub use registry::{DocumentRenderer, OUTPUT_PREFIX, RenderedArtifact, RendererRegistry};
pub use summary::{ContentStats, DocumentInfo, SectionSummary, SummaryReport};
