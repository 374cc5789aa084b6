//! docfill CLI - Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docfill_engine::DocxTemplateEngine;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docfill")]
#[command(version)]
#[command(about = "Render .docx templates against JSON data", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a template with a JSON data file
    Render {
        /// The .docx template
        template: PathBuf,

        /// The JSON data file
        data: PathBuf,

        /// Write the rendered document to FILE
        #[arg(short, long)]
        output: PathBuf,

        /// Resolve relative image paths against DIR (default: the data
        /// file's directory)
        #[arg(long)]
        image_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Render {
            template,
            data,
            output,
            image_dir,
        } => render(template, data, output, image_dir),
    }
}

fn render(
    template: PathBuf,
    data: PathBuf,
    output: PathBuf,
    image_dir: Option<PathBuf>,
) -> Result<()> {
    let template_bytes = std::fs::read(&template)
        .with_context(|| format!("failed to read template {}", template.display()))?;
    let json_data = std::fs::read_to_string(&data)
        .with_context(|| format!("failed to read data file {}", data.display()))?;

    let base_dir = image_dir
        .or_else(|| data.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    tracing::debug!(
        template = %template.display(),
        data = %data.display(),
        image_dir = %base_dir.display(),
        "rendering template"
    );

    let engine = DocxTemplateEngine::with_base_dir(base_dir);
    let rendered = engine.render_bytes(&template_bytes, &json_data)?;

    std::fs::write(&output, rendered)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::debug!(output = %output.display(), "wrote rendered document");
    Ok(())
}
