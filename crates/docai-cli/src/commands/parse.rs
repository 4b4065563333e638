//! Parse command - decode vision model markup.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use docai_core::markup::{parse, RAW_OUTPUT_KEY};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// File holding the markup text
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit single-line JSON
    #[arg(long)]
    compact: bool,
}

pub async fn run(args: ParseArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Parsing markup from {}", args.input.display());
    let text = fs::read_to_string(&args.input)?;
    let tree = parse(&text);

    if tree.get(RAW_OUTPUT_KEY).is_some() {
        eprintln!(
            "{} No markup tags found, output holds the raw text",
            style("ℹ").blue()
        );
    }

    let json = if args.compact {
        serde_json::to_string(&tree)?
    } else {
        serde_json::to_string_pretty(&tree)?
    };

    super::write_output(args.output.as_deref(), &json)
}
