//! CLI application for invoice extraction consolidation.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, canonicalize, config, parse};

/// docai - Turn invoice model output into consolidated invoice tables
#[derive(Parser)]
#[command(name = "docai")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log more (-v info, -vv per-field debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a docai JSON config file (default: user config dir)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode vision model markup into a JSON tree
    Parse(parse::ParseArgs),

    /// Map one producer output onto the invoice schema
    Canonicalize(canonicalize::CanonicalizeArgs),

    /// Process many documents and export consolidated invoices
    Batch(batch::BatchArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        // stdout carries JSON trees and records
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Parse(args) => parse::run(args).await,
        Commands::Canonicalize(args) => canonicalize::run(args, cli.config.as_deref()).await,
        Commands::Batch(args) => batch::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args).await,
    }
}
