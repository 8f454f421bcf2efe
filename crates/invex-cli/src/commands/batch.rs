//! Batch command - run a directory or glob of documents into one report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use invex_core::{DocumentOutcome, ExtractionClient, Pipeline, ReportFormat};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Report file (default: from config)
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<BatchFormat>,

    /// Descend into subdirectories when the input is a directory
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Also save every raw model answer as JSON into this directory
    #[arg(long)]
    archive_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum BatchFormat {
    /// Excel workbook with colour markers
    Xlsx,
    /// Plain CSV
    Csv,
}

impl From<BatchFormat> for ReportFormat {
    fn from(format: BatchFormat) -> Self {
        match format {
            BatchFormat::Xlsx => ReportFormat::Xlsx,
            BatchFormat::Csv => ReportFormat::Csv,
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let mut config = super::load_config(config_path)?;

    if let Some(format) = args.format {
        config.report.format = format.into();
        if args.report.is_none() {
            let extension = match config.report.format {
                ReportFormat::Xlsx => "xlsx",
                ReportFormat::Csv => "csv",
            };
            config.report.path.set_extension(extension);
        }
    }
    if let Some(report) = &args.report {
        config.report.path = report.clone();
    }
    if let Some(dir) = &args.archive_dir {
        config.report.archive_dir = Some(dir.clone());
    }

    let files = collect_inputs(&args.input, args.recursive)?;
    if files.is_empty() {
        anyhow::bail!("No files found for input: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let client = ExtractionClient::new(config.service.clone(), config.extraction.clone())?;
    let mut pipeline = Pipeline::new(&config, client);

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut failed: Vec<(PathBuf, String)> = Vec::new();
    for path in &files {
        progress.set_message(file_label(path));
        match pipeline.process_document(path).await {
            DocumentOutcome::Processed(outcomes) => {
                for outcome in outcomes {
                    if let invex_core::PayloadOutcome::Failed { payload, error } = outcome {
                        failed.push((PathBuf::from(payload.label()), error.to_string()));
                    }
                }
            }
            DocumentOutcome::ConversionFailed(e) => failed.push((path.clone(), e.to_string())),
            DocumentOutcome::Skipped(_) => {}
        }
        progress.inc(1);
    }
    progress.finish_with_message("Complete");

    let (report, stats) = pipeline.finish();
    if report.is_empty() {
        println!("{} No rows extracted, report not written", style("!").yellow());
    } else {
        let path = report.write(&config.report)?;
        println!(
            "{} Report written to {}",
            style("✓").green(),
            path.display()
        );
    }

    println!();
    println!(
        "{} Processed {} documents in {:?}",
        style("✓").green(),
        stats.documents_processed,
        start.elapsed()
    );
    println!(
        "   {} skipped, {} conversion failures",
        style(stats.documents_skipped).yellow(),
        style(stats.conversion_failures).red()
    );
    println!(
        "   {} payloads, {} extraction failures",
        stats.payloads,
        style(stats.extraction_failures).red()
    );
    println!(
        "   {} rows, {} complete",
        stats.rows,
        style(report.complete_count()).green()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed:").red());
        for (path, error) in &failed {
            println!("  - {}: {}", path.display(), error);
        }
    }

    Ok(())
}

/// Expand a directory (optionally recursive) or a glob pattern into sorted file paths.
fn collect_inputs(input: &str, recursive: bool) -> anyhow::Result<Vec<PathBuf>> {
    let root = Path::new(input);
    let pattern = if root.is_dir() {
        let pattern = if recursive { root.join("**").join("*") } else { root.join("*") };
        pattern.to_string_lossy().into_owned()
    } else {
        input.to_string()
    };
    debug!("Expanding {}", pattern);

    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
