//! CLI tool for translating PowerPoint files between languages.

mod backend;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::CliConfig;
use indicatif::{ProgressBar, ProgressStyle};
use ppt_translate_core::{IgnoreTerms, JobRequest, LanguagePair, PresentationTranslator};
use ppt_translate_pptx::PptxStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Translate the text of a PowerPoint presentation, keeping its formatting.
#[derive(Parser, Debug)]
#[command(name = "ppt-translate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file (.pptx)
    input: PathBuf,

    /// Output file (default: translated_<name> next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code
    #[arg(long, default_value = "en")]
    from: String,

    /// Target language code
    #[arg(long, default_value = "ru")]
    to: String,

    /// File of terms to leave untranslated, one per line
    #[arg(short, long)]
    ignore_terms: Option<PathBuf>,

    /// JSON config file with pipeline settings and translate backends
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Slides translated concurrently
    #[arg(long)]
    slide_workers: Option<usize>,

    /// Shapes translated concurrently
    #[arg(long)]
    shape_workers: Option<usize>,

    /// Per-call timeout in seconds (0 disables it)
    #[arg(long)]
    timeout: Option<u64>,

    /// Retries after a failed translate call
    #[arg(long)]
    retries: Option<u32>,

    /// Translate endpoint for this language pair
    #[arg(long)]
    endpoint: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let pair = LanguagePair::new(&args.from, &args.to)?;
    let config = build_config(&args, &pair)?;

    let ignore_terms = match &args.ignore_terms {
        Some(path) => IgnoreTerms::from_file(path)
            .with_context(|| format!("Failed to read ignore terms from {}", path.display()))?,
        None => IgnoreTerms::default(),
    };
    if args.verbose && !ignore_terms.is_empty() {
        eprintln!("Keeping {} terms untranslated", ignore_terms.len());
    }

    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output_path(&args.input),
    };

    let translator = PresentationTranslator::new(
        config.registry()?,
        Arc::new(PptxStore::new()),
        config.translate.clone(),
    )?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")?
            .progress_chars("█▓▒░"),
    );
    bar.set_message(format!("{} ({})", args.input.display(), pair));

    let progress_bar = bar.clone();
    let handle = translator
        .submit(
            JobRequest {
                pair,
                input: args.input.clone(),
                output: output.clone(),
                ignore_terms,
            },
            move |percent| progress_bar.set_position(u64::from(percent)),
        )
        .with_context(|| format!("Failed to start translating {}", args.input.display()))?;

    let result = handle.wait();
    bar.finish_and_clear();
    let report = result.with_context(|| format!("Failed to translate {}", args.input.display()))?;

    println!(
        "Translated {} text runs on {} slides: {}",
        report.translated_runs,
        report.slides,
        output.display()
    );

    if !report.faults.is_empty() {
        eprintln!("{} text runs were left untranslated:", report.faults.len());
        for fault in &report.faults.faults {
            eprintln!("  {}", fault);
        }
    }

    Ok(())
}

/// Config file (or defaults) with command-line overrides applied.
fn build_config(args: &Args, pair: &LanguagePair) -> Result<CliConfig> {
    let mut config = match &args.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };

    if let Some(workers) = args.slide_workers {
        config.translate.slide_workers = workers;
    }
    if let Some(workers) = args.shape_workers {
        config.translate.shape_workers = workers;
    }
    if let Some(timeout) = args.timeout {
        config.translate.call_timeout_secs = timeout;
    }
    if let Some(retries) = args.retries {
        config.translate.max_retries = retries;
    }
    if let Some(endpoint) = &args.endpoint {
        config.set_endpoint(pair, endpoint)?;
    }

    config.translate.validate()?;
    Ok(config)
}

/// `translated_<name>` in the input's directory.
fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("presentation.pptx");

    input.with_file_name(format!("translated_{}", name))
}
