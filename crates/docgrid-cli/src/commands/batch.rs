//! Batch processing command for multiple analysis payloads.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use futures_util::StreamExt;
use futures_util::stream;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use docgrid_core::DocgridConfig;

use super::process::{OutputFormat, ReconstructionArgs, Stats, process_file, render};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    #[command(flatten)]
    options: ReconstructionArgs,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    stats: Option<Stats>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = Arc::new(args.options.apply(super::load_config(config_path)?));

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("json")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    // Create output directory if specified
    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // Files are processed on the blocking pool, at most `jobs` at a time,
    // and yielded back in input order.
    let output_dir = args.output_dir.clone();
    let format = args.format;
    let mut pending = stream::iter(files)
        .map(|path| {
            let config = Arc::clone(&config);
            let output_dir = output_dir.clone();
            tokio::task::spawn_blocking(move || {
                let file_start = Instant::now();
                let outcome = process_one(&path, &config, output_dir.as_deref(), format);
                (path, outcome, file_start.elapsed().as_millis() as u64)
            })
        })
        .buffered(args.jobs.max(1));

    let mut results = Vec::new();
    while let Some(joined) = pending.next().await {
        let (path, outcome, processing_time_ms) = joined?;

        match outcome {
            Ok(stats) => {
                results.push(ProcessResult {
                    path,
                    stats: Some(stats),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        stats: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.stats.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    // Generate summary if requested
    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    // Print summary
    let tables: usize = successful.iter().filter_map(|r| r.stats).map(|s| s.tables).sum();
    let rows: usize = successful.iter().filter_map(|r| r.stats).map(|s| s.rows).sum();
    println!();
    println!(
        "{} Processed {} files in {:?} ({} tables, {} rows)",
        style("✓").green(),
        results.len(),
        start.elapsed(),
        tables,
        rows
    );
    println!(
        "   {} successful, {} failed",
        style(successful.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Process one file and write its rendered output, if an output directory
/// is set.
fn process_one(
    path: &Path,
    config: &DocgridConfig,
    output_dir: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<Stats> {
    let (output, stats) = process_file(path, config)?;

    if let Some(output_dir) = output_dir {
        let output_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let output_path = output_dir.join(format!("{}.{}", output_name, format.extension()));

        let content = render(&output, format, config.output.pretty)?;
        fs::write(&output_path, content)?;
        debug!("Wrote output to {}", output_path.display());
    }

    Ok(stats)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "tables",
        "rows",
        "omitted_tables",
        "anomalies",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(stats) = &result.stats {
            wtr.write_record([
                filename,
                "success",
                &stats.tables.to_string(),
                &stats.rows.to_string(),
                &stats.omitted.to_string(),
                &stats.anomalies.to_string(),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
