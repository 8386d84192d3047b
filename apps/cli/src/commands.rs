//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use reportsmith_core::{
    CompletionProvider, DEFAULT_SESSION_ID, GenerationProgress, OpenRouterClient, ReportService,
    UploadFile, UploadedFileSummary, render_segment,
};
use reportsmith_extract::{ExtractorRegistry, sanitize_filename};
use reportsmith_shared::{
    AppConfig, OutputFormat, ServiceConfig, Template, init_config, load_config, truncate_chars,
    validate_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ReportSmith: turn source documents into structured reports.
#[derive(Parser)]
#[command(
    name = "reportsmith",
    version,
    about = "Generate template-driven reports from PDFs, decks, documents and spreadsheets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract source files and show what the model would see.
    Extract {
        /// Files to extract.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the full extraction result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Template management.
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Upload sources, generate, refine, and export a report.
    Build {
        /// Source file (repeatable).
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Template JSON file (defaults to the built-in consulting report).
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Extra instructions added to every section prompt.
        #[arg(short, long)]
        instructions: Option<String>,

        /// Refinement request applied after generation (repeatable, in order).
        #[arg(long)]
        refine: Vec<String>,

        /// Output formats (comma-separated). Defaults to `[defaults].formats`.
        #[arg(long, value_delimiter = ',')]
        format: Vec<OutputFormat>,

        /// Output directory (defaults to `[defaults].output_dir`).
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Model override.
        #[arg(long)]
        model: Option<String>,

        /// Session id.
        #[arg(long, default_value = DEFAULT_SESSION_ID)]
        session: String,

        /// Also print an AI-written executive summary.
        #[arg(long)]
        executive_summary: bool,
    },

    /// Ask the model which questions would improve the report.
    Questions {
        /// Source file (repeatable).
        #[arg(short, long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Template JSON file.
        #[arg(short, long)]
        template: Option<PathBuf>,
    },

    /// List models available from the configured provider.
    Models,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Template subcommands.
#[derive(Subcommand)]
pub(crate) enum TemplateAction {
    /// Write the built-in template as JSON.
    Init {
        /// Destination file (stdout when omitted).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Check a template file.
    Validate {
        path: PathBuf,
    },
    /// Show a template's sections in render order.
    Show {
        #[arg(short, long)]
        template: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "reportsmith=info",
        1 => "reportsmith=debug",
        _ => "reportsmith=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract { files, json } => cmd_extract(&files, json).await,
        Command::Template { action } => match action {
            TemplateAction::Init { out } => cmd_template_init(out.as_deref()),
            TemplateAction::Validate { path } => cmd_template_validate(&path),
            TemplateAction::Show { template } => cmd_template_show(template.as_deref()),
        },
        Command::Build {
            files,
            template,
            instructions,
            refine,
            format,
            out_dir,
            model,
            session,
            executive_summary,
        } => {
            let opts = BuildOptions {
                files,
                template,
                instructions,
                refine,
                formats: format,
                out_dir,
                model,
                session,
                executive_summary,
            };
            cmd_build(opts).await
        }
        Command::Questions { files, template } => cmd_questions(&files, template.as_deref()).await,
        Command::Models => cmd_models().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load config, check the key, and build a service around OpenRouter.
fn connect(model: Option<&str>, out_dir: Option<&Path>) -> Result<(AppConfig, ReportService)> {
    let mut config = load_config()?;
    validate_api_key(&config)?;
    if let Some(model) = model {
        config.openrouter.default_model = model.to_string();
    }

    let mut service_config = ServiceConfig::from(&config);
    if let Some(dir) = out_dir {
        service_config.output_dir = dir.to_path_buf();
    }

    let provider: Arc<dyn CompletionProvider> =
        Arc::new(OpenRouterClient::from_config(&config.openrouter)?);
    Ok((config, ReportService::new(service_config, provider)))
}

fn read_template(path: &Path) -> Result<Template> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read template '{}': {e}", path.display()))?;
    Ok(Template::from_json(&json)?)
}

fn read_uploads(files: &[PathBuf]) -> Result<Vec<UploadFile>> {
    files
        .iter()
        .map(|path| UploadFile::from_path(path).map_err(Into::into))
        .collect()
}

fn print_uploads(summaries: &[UploadedFileSummary]) {
    for summary in summaries {
        match &summary.error {
            Some(error) => println!("  ! {} ({}): {error}", summary.filename, summary.file_type),
            None => println!("  + {} ({})", summary.filename, summary.file_type),
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_extract(files: &[PathBuf], json: bool) -> Result<()> {
    let config = load_config()?;
    let registry = Arc::new(ExtractorRegistry::new());

    for path in files {
        if !path.is_file() {
            return Err(eyre!("'{}' is not a file", path.display()));
        }
        let filename = sanitize_filename(&path.to_string_lossy());
        let (task_registry, task_path, task_name) =
            (registry.clone(), path.clone(), filename.clone());
        let extracted = tokio::task::spawn_blocking(move || {
            task_registry.extract_file(&task_path, &task_name)
        })
        .await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&extracted)?);
            continue;
        }

        println!("{}", render_segment(&filename, &extracted, &config.context));
        for (name, value) in &extracted.metadata.counters {
            println!("  {name}: {value}");
        }
        if let Some(error) = extracted.error() {
            println!("  error: {error}");
        }
        println!();
    }
    Ok(())
}

fn cmd_template_init(out: Option<&Path>) -> Result<()> {
    let json = Template::default_report().export_json()?;
    match out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            println!("Template written to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_template_validate(path: &Path) -> Result<()> {
    let template = read_template(path)?;
    println!(
        "{}: valid ({} sections, {} required)",
        path.display(),
        template.sections().len(),
        template.required_sections().len()
    );
    Ok(())
}

fn cmd_template_show(path: Option<&Path>) -> Result<()> {
    let template = match path {
        Some(path) => read_template(path)?,
        None => Template::default_report(),
    };

    println!("{} (v{})", template.metadata.name, template.metadata.version);
    if !template.metadata.description.is_empty() {
        println!("{}", template.metadata.description);
    }
    println!();
    for section in template.ordered_sections() {
        let required = if section.required { "*" } else { " " };
        let limit = section
            .max_length
            .map(|n| format!(" (max {n})"))
            .unwrap_or_default();
        println!(
            "  {:>3} {required} {:<24} {:<5} {}{limit}",
            section.order,
            section.id,
            section.content_type.as_str(),
            section.title
        );
    }
    Ok(())
}

struct BuildOptions {
    files: Vec<PathBuf>,
    template: Option<PathBuf>,
    instructions: Option<String>,
    refine: Vec<String>,
    formats: Vec<OutputFormat>,
    out_dir: Option<PathBuf>,
    model: Option<String>,
    session: String,
    executive_summary: bool,
}

async fn cmd_build(opts: BuildOptions) -> Result<()> {
    let (config, service) = connect(opts.model.as_deref(), opts.out_dir.as_deref())?;
    let session = opts.session.as_str();
    let formats = if opts.formats.is_empty() {
        config.defaults.formats.clone()
    } else {
        opts.formats
    };

    info!(
        session,
        files = opts.files.len(),
        model = %config.openrouter.default_model,
        "building report"
    );

    let summaries = service
        .upload_files(session, read_uploads(&opts.files)?)
        .await?;
    println!("Sources:");
    print_uploads(&summaries);

    if let Some(path) = &opts.template {
        service.set_template(session, read_template(path)?).await?;
    }

    let progress = CliProgress::new();
    let mut content = service
        .generate(session, opts.instructions.as_deref(), &progress)
        .await?;
    for request in &opts.refine {
        progress.phase(&format!("Refining: {}", truncate_chars(request, 60)));
        content = service.refine(session, request).await?;
        if let Some(error) = &content.metadata.refinement_error {
            warn!(%error, "refinement not applied");
        }
    }
    progress.finish();

    let quality = service.validate_content(session).await?;
    println!();
    println!("  Sections:  {}", content.sections.len());
    println!("  Words:     {}", content.total_word_count());
    println!("  Citations: {}", quality.citations_count);
    println!("  Quality:   {:.0}/100", quality.overall_score);
    for issue in &quality.issues {
        println!("    issue: {issue}");
    }
    for suggestion in &quality.suggestions {
        println!("    hint:  {suggestion}");
    }

    if opts.executive_summary {
        println!();
        println!("{}", service.executive_summary(session).await?);
    }

    println!();
    for format in formats {
        let artifact = service.export_format(session, format).await?;
        println!(
            "  {:<5} {} ({} bytes)",
            format.as_str(),
            artifact.path.display(),
            artifact.size_bytes
        );
    }
    println!();
    Ok(())
}

async fn cmd_questions(files: &[PathBuf], template: Option<&Path>) -> Result<()> {
    let (_, service) = connect(None, None)?;
    let summaries = service
        .upload_files(DEFAULT_SESSION_ID, read_uploads(files)?)
        .await?;
    print_uploads(&summaries);

    if let Some(path) = template {
        service
            .set_template(DEFAULT_SESSION_ID, read_template(path)?)
            .await?;
    }

    println!();
    for (i, question) in service
        .clarifying_questions(DEFAULT_SESSION_ID)
        .await?
        .iter()
        .enumerate()
    {
        println!("  {}. {question}", i + 1);
    }
    Ok(())
}

async fn cmd_models() -> Result<()> {
    let (_, service) = connect(None, None)?;
    let (current, models) = service.available_models().await?;
    for model in &models {
        let marker = if *model == current { "*" } else { " " };
        println!("{marker} {model}");
    }
    if !models.contains(&current) {
        println!();
        println!("Configured model '{current}' is not in the provider's list.");
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl GenerationProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section_progress(&self, current: usize, total: usize, title: &str) {
        self.spinner
            .set_message(format!("Generating [{current}/{total}] {title}"));
    }
}
