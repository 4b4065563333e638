//! Batch command - consolidate many documents into invoice tables.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use docai_core::{DocumentInput, DocumentOutcome, Pipeline};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Document files (JSON producer output) or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Skip document files that cannot be read
    #[arg(long)]
    continue_on_error: bool,

    /// Also write the chosen record of every document
    #[arg(long)]
    records: bool,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} documents to process",
        style("ℹ").blue(),
        files.len()
    );

    let mut inputs = Vec::with_capacity(files.len());
    let mut skipped = Vec::new();
    for path in &files {
        match DocumentInput::from_file(path) {
            Ok(input) => inputs.push(input),
            Err(e) if args.continue_on_error => {
                warn!("Skipping {}: {}", path.display(), e);
                skipped.push((path.clone(), e.to_string()));
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                anyhow::bail!("Reading {} failed: {}", path.display(), e);
            }
        }
    }

    let pipeline = Arc::new(Pipeline::from_config(&config));
    let outcomes = process_all(Arc::clone(&pipeline), inputs, args.jobs.max(1)).await?;

    let flagged: Vec<(String, String)> = outcomes
        .iter()
        .filter_map(|o| {
            o.structured_error()
                .map(|e| (o.source_identifier.clone(), e.to_string()))
        })
        .collect();

    // All documents are done; grouping needs every record.
    let output = pipeline.finish(outcomes);

    fs::create_dir_all(&args.output_dir)?;

    let invoices_path = args.output_dir.join(&config.export.invoices_file);
    super::write_invoice_table(
        BufWriter::new(File::create(&invoices_path)?),
        &output.invoices,
        config.export.delimiter,
    )?;
    debug!("Wrote invoices to {}", invoices_path.display());

    let summaries_path = args.output_dir.join(&config.export.summaries_file);
    write_json(&summaries_path, &output.summaries)?;

    if args.records {
        write_json(&args.output_dir.join("records.json"), &output.records)?;
    }

    // Print summary
    println!();
    println!(
        "{} Processed {} documents into {} invoices in {:?}",
        style("✓").green(),
        output.records.len(),
        output.invoices.len(),
        start.elapsed()
    );
    println!("   Invoices:  {}", invoices_path.display());
    println!("   Summaries: {}", summaries_path.display());

    if !flagged.is_empty() {
        println!();
        println!("{}", style("Unparseable hosted model responses:").yellow());
        for (source, reason) in &flagged {
            println!("  - {}: {}", source, reason);
        }
    }

    if !skipped.is_empty() {
        println!();
        println!("{}", style("Skipped files:").red());
        for (path, reason) in &skipped {
            println!("  - {}: {}", path.display(), reason);
        }
    }

    Ok(())
}

/// Run every document on the blocking pool, at most `jobs` at a time.
///
/// Outcomes come back in input order.
async fn process_all(
    pipeline: Arc<Pipeline>,
    inputs: Vec<DocumentInput>,
    jobs: usize,
) -> anyhow::Result<Vec<DocumentOutcome>> {
    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents")?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(jobs));
    let mut tasks = JoinSet::new();
    let total = inputs.len();

    for (index, input) in inputs.into_iter().enumerate() {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let pipeline = Arc::clone(&pipeline);
        let pb = pb.clone();
        tasks.spawn_blocking(move || {
            let _permit = permit;
            let outcome = pipeline.process_document(&input);
            pb.inc(1);
            (index, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined?);
    }
    pb.finish_with_message("Complete");

    outcomes.sort_by_key(|(index, _)| *index);
    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
