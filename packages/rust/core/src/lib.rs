//! Report pipeline for ReportSmith.
//!
//! This crate ties extraction, AI generation and rendering into the
//! session-based workflow exposed by [`ReportService`]:
//! upload sources, pick a template, generate, refine, export.

pub mod ai;
pub mod assist;
pub mod context;
pub mod generation;
pub mod quality;
pub mod refinement;
pub mod service;
pub mod session;

#[cfg(test)]
mod testing;

pub use ai::{CompletionError, CompletionProvider, OpenRouterClient, complete_with_timeout};
pub use assist::Assistant;
pub use context::{SourceFiles, assemble_context, render_segment};
pub use generation::{
    EngineSettings, GenerationEngine, GenerationProgress, SilentProgress, extract_citations,
    list_items,
};
pub use quality::{QualityReport, validate_quality};
pub use refinement::RefinementEngine;
pub use service::{ReportService, SessionSummary, UploadFile, UploadedFileSummary};
pub use session::{DEFAULT_SESSION_ID, Session, SessionHandle, SessionStore, UploadedFile};
