//! Process command - extract fields from a single document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use serde_json::json;
use tracing::{debug, info};

use invex_core::{DocumentOutcome, ExtractionClient, PayloadOutcome, Pipeline};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (image, HEIF, PDF, XLSX, DOC or DOCX)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());
    let client = ExtractionClient::new(config.service.clone(), config.extraction.clone())?;
    let mut pipeline = Pipeline::new(&config, client);

    let outcomes = match pipeline.process_document(&args.input).await {
        DocumentOutcome::Processed(outcomes) => outcomes,
        DocumentOutcome::Skipped(format) => anyhow::bail!("Unsupported file format: {}", format),
        DocumentOutcome::ConversionFailed(e) => {
            anyhow::bail!("Failed to convert {}: {}", args.input.display(), e)
        }
    };

    let output = match args.format {
        OutputFormat::Json => format_json(&outcomes)?,
        OutputFormat::Text => format_text(&outcomes),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    let failures = outcomes
        .iter()
        .filter(|o| matches!(o, PayloadOutcome::Failed { .. }))
        .count();
    if failures == outcomes.len() {
        anyhow::bail!("Extraction failed for every page of {}", args.input.display());
    }

    Ok(())
}

fn format_json(outcomes: &[PayloadOutcome]) -> anyhow::Result<String> {
    let entries: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|outcome| match outcome {
            PayloadOutcome::Extracted {
                payload,
                record,
                verdict,
            } => json!({
                "source": payload.source,
                "page": payload.page.map(|p| p + 1),
                "record": record,
                "raw": record.raw,
                "complete": verdict.is_complete(),
                "missing": verdict.missing,
            }),
            PayloadOutcome::Failed { payload, error } => json!({
                "source": payload.source,
                "page": payload.page.map(|p| p + 1),
                "error": error.to_string(),
            }),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&entries)?)
}

fn format_text(outcomes: &[PayloadOutcome]) -> String {
    let mut output = String::new();

    for outcome in outcomes {
        output.push_str(&format!("{}\n", outcome.label()));
        match outcome {
            PayloadOutcome::Extracted { record, verdict, .. } => {
                let or_dash = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
                output.push_str(&format!(
                    "  Amount:          {}\n",
                    or_dash(record.amount.as_option().map(|a| a.to_string()))
                ));
                output.push_str(&format!(
                    "  Date:            {}\n",
                    or_dash(record.date.as_option().map(|d| d.to_string()))
                ));
                output.push_str(&format!(
                    "  Trading partner: {}\n",
                    or_dash(record.trading_partner.as_option().cloned())
                ));
                output.push_str(&format!(
                    "  Registration:    {}\n",
                    or_dash(record.registration_number.as_option().cloned())
                ));
                if verdict.is_complete() {
                    output.push_str(&format!("  Complete:        {}\n", style("yes").green()));
                } else {
                    let missing: Vec<String> = verdict.missing.iter().map(|f| f.to_string()).collect();
                    output.push_str(&format!(
                        "  Complete:        {} (missing {})\n",
                        style("no").red(),
                        missing.join(", ")
                    ));
                }
            }
            PayloadOutcome::Failed { error, .. } => {
                output.push_str(&format!("  {} {}\n", style("Failed:").red(), error));
            }
        }
    }

    output
}
