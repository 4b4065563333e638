//! Canonicalize command - map one producer output onto the invoice schema.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use docai_core::{Canonicalizer, ExtractionRecord};

/// Arguments for the canonicalize command.
#[derive(Args)]
pub struct CanonicalizeArgs {
    /// File holding the producer output
    #[arg(required = true)]
    input: PathBuf,

    /// Which producer wrote the input
    #[arg(short, long, value_enum, default_value = "markup")]
    producer: ProducerKind,

    /// Document identifier (default: input file name)
    #[arg(short, long)]
    source: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ProducerKind {
    /// Vision model `<s_NAME>` markup
    Markup,
    /// Hosted model JSON response
    Structured,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

pub async fn run(args: CanonicalizeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let source = args.source.clone().unwrap_or_else(|| {
        args.input
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string()
    });

    info!("Canonicalizing {:?} output for {}", args.producer, source);
    let text = fs::read_to_string(&args.input)?;
    let canonicalizer = Canonicalizer::from_config(&config.extraction);

    let record = match args.producer {
        ProducerKind::Markup => canonicalizer.from_markup(&source, &text).1,
        ProducerKind::Structured => canonicalizer.from_response(&source, &text),
    };

    if let Some(error) = &record.extraction_error {
        eprintln!("{} {}", style("⚠").yellow(), error);
    }

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&record)?,
        OutputFormat::Text => format_text(&record),
    };

    super::write_output(args.output.as_deref(), &output)
}

fn format_text(record: &ExtractionRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n", record.source_identifier));
    output.push_str(&format!("Producer: {}\n", record.producer));
    if let Some(error) = &record.extraction_error {
        output.push_str(&format!("Error: {}\n", error));
    }
    output.push('\n');

    for (name, value) in record.fields.scalars() {
        if !value.is_empty() {
            output.push_str(&format!("{:<15} {}\n", format!("{}:", name), value));
        }
    }

    if !record.fields.items.is_empty() {
        output.push_str("\nItems:\n");
        for item in &record.fields.items {
            output.push_str(&format!(
                "  - {}\n",
                item.description.as_deref().unwrap_or("(no description)")
            ));
        }
    }

    output
}
