//! ReportSmith CLI: template-driven report generation.
//!
//! Extracts source files, asks an AI model to write each template section
//! with citations, and exports the result as DOCX, PDF or PPTX.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
