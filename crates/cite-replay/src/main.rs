//! cite-replay: run a document through the footnote citation processor

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quarto_cite::{CiteOptions, CiteProcessor, TagExpander};
use quarto_cite_registry::Warning;

/// Render footnote citations of a document
#[derive(Parser, Debug)]
#[command(name = "cite-replay")]
#[command(about = "Render <ref>/<references> citations and report problems", long_about = None)]
struct Args {
    /// Path to the document to render
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Citation options (JSON, or YAML for any other extension)
    #[arg(long, value_name = "FILE")]
    options: Option<PathBuf>,

    /// Print the citation report as JSON instead of the rendered text
    #[arg(long)]
    report: bool,

    /// Exit with status 2 when any citation warning was raised
    #[arg(long)]
    deny_warnings: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cite_replay=info,quarto_cite=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run() {
        Ok(true) => process::exit(2),
        Ok(false) => {}
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn load_options(path: &Path) -> Result<CiteOptions> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse options file: {}", path.display()))
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse options file: {}", path.display()))
    }
}

/// Returns whether the run should fail because of citation warnings.
fn run() -> Result<bool> {
    let args = Args::parse();

    let options = match &args.options {
        Some(path) => load_options(path)?,
        None => CiteOptions::default(),
    };

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

    info!(input = %args.input.display(), "Rendering citations");
    let document = CiteProcessor::plain(options)
        .render_document(&mut TagExpander, &source)
        .with_context(|| format!("Failed to render citations in {}", args.input.display()))?;

    if args.report {
        let json = serde_json::to_string_pretty(&document.report)
            .context("Failed to serialize citation report")?;
        println!("{}", json);
    } else {
        println!("{}", document.text);
        for warning in document.report.warnings() {
            display_warning(warning);
        }
    }

    let count = document.report.warnings().count();
    info!(
        entries = document.report.entries.len(),
        warnings = count,
        "Done"
    );
    Ok(args.deny_warnings && count > 0)
}

fn display_warning(warning: &Warning) {
    eprintln!("Warning: {} ({})", warning.title(), warning.code());
    eprintln!("  ✖ {}", warning.message());
}
