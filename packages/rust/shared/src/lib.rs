//! Shared types, error model, and configuration for ReportSmith.
//!
//! This crate is the foundation depended on by all other ReportSmith crates.
//! It provides:
//! - [`ReportError`]: the unified error type
//! - Templates ([`Template`], [`Section`]) and their editing operations
//! - Domain types ([`ExtractedFileContent`], [`GeneratedContent`], [`OutputFormat`])
//! - Configuration ([`AppConfig`], [`ServiceConfig`], config loading)

pub mod config;
pub mod error;
pub mod template;
pub mod text;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContextLimits, DefaultsConfig, OpenRouterConfig, ServiceConfig, SessionsConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{ReportError, Result};
pub use template::{
    Formatting, FormattingUpdate, Margins, NewSection, Section, SectionUpdate, StyleUpdate,
    Template, TemplateMetadata, TemplateStructure, TemplateStyle,
};
pub use text::{truncate_chars, word_count};
pub use types::{
    Citation, ContentRecord, ContentType, DetectedHeading, ExtractedFileContent,
    ExtractionMetadata, FileType, GeneratedContent, GenerationMetadata, OutputFormat,
    SectionBody, SectionResult,
};
