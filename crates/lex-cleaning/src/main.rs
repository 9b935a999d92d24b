//! CLI entry point for the cleaning pipeline.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lex_cleaning::query::{NlQueryInterpreter, apply_filter};
use lex_cleaning::utils::column_names;
use lex_cleaning::{
    CleaningRequest, CleaningResult, CleaningStep, ExportFormat, InsightsBundle, Pipeline,
    PipelineConfig, StageStatus,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Automated cleaning for CSV and Excel uploads",
    long_about = "Cleans a CSV or XLSX file: infers types, fills gaps, merges misspellings,\n\
                  drops duplicates and statistical anomalies, and reports a quality score.\n\n\
                  EXAMPLES:\n  \
                  # Clean a file and write results/sales_cleaned.csv\n  \
                  lex-cleaning -i sales.csv -o results/\n\n  \
                  # Mask e-mails and phone numbers, export as SQL\n  \
                  lex-cleaning -i contacts.xlsx --mask-pii --format sql\n\n  \
                  # Print the insights as JSON\n  \
                  lex-cleaning -i sales.csv --json | jq .quality_score"
)]
struct Args {
    /// Path to the CSV or XLSX file to clean
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the cleaned file
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// Mask e-mail addresses and phone numbers
    #[arg(long)]
    mask_pii: bool,

    /// Format of the cleaned file (csv, json, sql)
    #[arg(long, default_value = "csv", value_parser = parse_format)]
    format: ExportFormat,

    /// Interpret a natural-language filter against the cleaned columns
    #[arg(long)]
    query: Option<String>,

    /// Print the insights as JSON to stdout instead of a summary
    ///
    /// Disables all logging so stdout only contains the JSON document.
    #[arg(long)]
    json: bool,

    /// Maximum number of cleaning log lines kept in the insights
    #[arg(long)]
    log_limit: Option<usize>,

    /// Order of the reorderable steps, e.g. "dedup,fuzzy,pii"
    #[arg(long, value_delimiter = ',', value_parser = parse_step)]
    stage_order: Option<Vec<CleaningStep>>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long)]
    quiet: bool,
}

fn parse_format(value: &str) -> std::result::Result<ExportFormat, String> {
    value.parse()
}

fn parse_step(value: &str) -> std::result::Result<CleaningStep, String> {
    CleaningStep::from_short_name(value)
        .ok_or_else(|| format!("unknown step '{}', expected fuzzy, dedup or pii", value))
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !args.input.exists() {
        return Err(anyhow!("Input file not found: {}", args.input.display()));
    }

    let mut config_builder = PipelineConfig::builder();
    if let Some(limit) = args.log_limit {
        config_builder = config_builder.log_limit(limit);
    }
    if let Some(order) = args.stage_order.clone() {
        config_builder = config_builder.stage_order(order);
    }
    let config = config_builder.build()?;

    let quiet = args.quiet || args.json;
    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(move |update| {
            if !quiet {
                debug!("[{:>3.0}%] {}", update.progress * 100.0, update.message);
            }
        })
        .build()?;

    let filename = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Input path has no file name: {}", args.input.display()))?;
    let content = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!("Loaded {} ({} bytes)", filename, content.len());

    let request = CleaningRequest::new(filename, content).with_pii_masking(args.mask_pii);
    let result = pipeline.process(&request)?;

    let output_path = write_output(&args, &result)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.insights)?);
    } else {
        print_summary(&result.insights, &output_path);
    }

    if let Some(query) = &args.query {
        let interpretation = NlQueryInterpreter::interpret(query, &column_names(&result.cleaned));
        if interpretation.is_empty() {
            warn!("Could not interpret query: {}", interpretation.explanation);
        }
        let matching = apply_filter(&result.cleaned, &interpretation)?;
        if !args.json {
            println!("\nQUERY");
            println!("{}", "-".repeat(40));
            println!("  Filter: {}", interpretation.filter_string);
            println!("  {}", interpretation.explanation);
            println!("  Matching rows: {} of {}", matching.height(), result.cleaned.height());
        }
    }

    Ok(())
}

/// Write `<stem>_cleaned.<ext>` into the output directory.
fn write_output(args: &Args, result: &CleaningResult) -> Result<PathBuf> {
    if !args.output.exists() {
        std::fs::create_dir_all(&args.output)?;
        info!("Created output directory: {}", args.output.display());
    }

    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let path = args
        .output
        .join(format!("{}_cleaned.{}", stem, args.format.extension()));

    let bytes = result.export(args.format)?;
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Cleaned data written to {}", path.display());
    Ok(path)
}

/// Human-readable run summary.
fn print_summary(insights: &InsightsBundle, output_path: &Path) {
    println!("\n{}", "=".repeat(60));
    println!("CLEANING SUMMARY");
    println!("{}\n", "=".repeat(60));

    println!("  Rows:            {} -> {}", insights.rows_original, insights.rows_cleaned);
    println!("  Duplicates:      {}", insights.duplicates_removed);
    println!("  Anomalies:       {}", insights.anomalies_detected);
    println!("  Masked values:   {}", insights.pii_masked);
    println!("  Quality score:   {:.2}", insights.quality_score);
    if insights.previously_seen {
        println!("  Note:            this file was cleaned before");
    }
    println!();
    println!("  {}", insights.summary);
    println!();

    if !insights.logs.is_empty() {
        println!("CLEANING LOG");
        println!("{}", "-".repeat(40));
        for line in &insights.logs {
            println!("  - {}", line);
        }
        println!();
    }

    let unusual: Vec<_> = insights
        .stage_reports
        .iter()
        .filter(|r| r.status != StageStatus::Completed)
        .collect();
    if !unusual.is_empty() {
        println!("STAGES");
        println!("{}", "-".repeat(40));
        for report in unusual {
            println!("  {:?}: {:?}", report.stage, report.status);
        }
        println!();
    }

    println!("Output: {}", output_path.display());
}
