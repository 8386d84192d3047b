//! Application configuration for ReportSmith.
//!
//! User config lives at `~/.reportsmith/reportsmith.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::types::OutputFormat;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "reportsmith.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".reportsmith";

// ---------------------------------------------------------------------------
// Config structs (matching reportsmith.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Prompt context limits.
    #[serde(default)]
    pub context: ContextLimits,

    /// Session store policy.
    #[serde(default)]
    pub sessions: SessionsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory uploaded source files are copied into.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Directory rendered documents are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Formats exported by `build` when `--format` is not given.
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            output_dir: default_output_dir(),
            formats: default_formats(),
        }
    }
}

fn default_upload_dir() -> String {
    "reportsmith-data/uploads".into()
}
fn default_output_dir() -> String {
    "reportsmith-data/outputs".into()
}
fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Docx]
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for generation and refinement.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound on a single completion call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "google/gemini-2.5-flash".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[context]` section: per-record truncation applied when flattening
/// extracted content into a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLimits {
    /// Max characters kept per PDF page.
    #[serde(default = "default_page_chars")]
    pub page_chars: usize,

    /// Max characters kept per slide text shape.
    #[serde(default = "default_slide_text_chars")]
    pub slide_text_chars: usize,

    /// Max characters kept per DOCX paragraph.
    #[serde(default = "default_paragraph_chars")]
    pub paragraph_chars: usize,

    /// Max characters kept per audio transcript.
    #[serde(default = "default_transcript_chars")]
    pub transcript_chars: usize,

    /// Max rows kept per spreadsheet sheet.
    #[serde(default = "default_sheet_rows")]
    pub sheet_rows: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            page_chars: default_page_chars(),
            slide_text_chars: default_slide_text_chars(),
            paragraph_chars: default_paragraph_chars(),
            transcript_chars: default_transcript_chars(),
            sheet_rows: default_sheet_rows(),
        }
    }
}

fn default_page_chars() -> usize {
    500
}
fn default_slide_text_chars() -> usize {
    200
}
fn default_paragraph_chars() -> usize {
    300
}
fn default_transcript_chars() -> usize {
    500
}
fn default_sheet_rows() -> usize {
    5
}

/// `[sessions]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Evict sessions idle for longer than this. Unset keeps sessions for
    /// the whole process lifetime.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_ttl_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Service config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime service configuration: merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Where uploaded files are stored.
    pub upload_dir: PathBuf,
    /// Where rendered documents are written.
    pub output_dir: PathBuf,
    /// Timeout applied to every AI completion call.
    pub completion_timeout: Duration,
    /// Prompt context truncation limits.
    pub context: ContextLimits,
    /// Env var named in credential error messages.
    pub api_key_env: String,
    /// Optional idle eviction window for sessions.
    pub session_idle_ttl: Option<Duration>,
}

impl From<&AppConfig> for ServiceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            upload_dir: expand_home(&config.defaults.upload_dir),
            output_dir: expand_home(&config.defaults.output_dir),
            completion_timeout: Duration::from_secs(config.openrouter.timeout_secs),
            context: config.context.clone(),
            api_key_env: config.openrouter.api_key_env.clone(),
            session_idle_ttl: config.sessions.idle_ttl_secs.map(Duration::from_secs),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.reportsmith/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ReportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.reportsmith/reportsmith.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ReportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReportError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReportError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(ReportError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("upload_dir"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("page_chars"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.openrouter.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(parsed.context, ContextLimits::default());
        assert_eq!(parsed.defaults.formats, vec![OutputFormat::Docx]);
        assert!(parsed.sessions.idle_ttl_secs.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/reports"
formats = ["pdf", "pptx"]

[context]
sheet_rows = 10

[sessions]
idle_ttl_secs = 600
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/reports");
        assert_eq!(config.defaults.upload_dir, "reportsmith-data/uploads");
        assert_eq!(
            config.defaults.formats,
            vec![OutputFormat::Pdf, OutputFormat::Pptx]
        );
        assert_eq!(config.context.sheet_rows, 10);
        assert_eq!(config.context.page_chars, 500);
        assert_eq!(config.sessions.idle_ttl_secs, Some(600));
    }

    #[test]
    fn unknown_format_in_config_is_rejected() {
        let toml_str = r#"
[defaults]
formats = ["html"]
"#;
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn service_config_from_app_config() {
        let app = AppConfig::default();
        let service = ServiceConfig::from(&app);
        assert_eq!(service.completion_timeout, Duration::from_secs(120));
        assert_eq!(service.output_dir, PathBuf::from("reportsmith-data/outputs"));
        assert_eq!(service.api_key_env, "OPENROUTER_API_KEY");
        assert!(service.session_idle_ttl.is_none());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "RS_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
