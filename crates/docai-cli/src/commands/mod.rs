//! Subcommands and the helpers they share.

pub mod batch;
pub mod canonicalize;
pub mod config;
pub mod parse;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

use docai_core::{ConsolidatedInvoice, DocaiConfig};

/// Location of the user's configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docai")
        .join("config.json")
}

/// Load the explicit config file, else the user's file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<DocaiConfig> {
    if let Some(path) = config_path {
        return Ok(DocaiConfig::from_file(Path::new(path))?);
    }

    let path = default_config_path();
    if path.exists() {
        debug!("Using configuration from {}", path.display());
        Ok(DocaiConfig::from_file(&path)?)
    } else {
        Ok(DocaiConfig::default())
    }
}

/// Write command output to a file, or to stdout when no file is given.
pub fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)?;
            eprintln!(
                "{} Output written to {}",
                style("✓").green(),
                path.display()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Write invoices as a delimited table; missing values are empty cells.
pub fn write_invoice_table<W: io::Write>(
    writer: W,
    invoices: &[ConsolidatedInvoice],
    delimiter: char,
) -> anyhow::Result<()> {
    if !delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be ASCII: {:?}", delimiter);
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter as u8)
        .from_writer(writer);

    wtr.write_record(ConsolidatedInvoice::COLUMNS)?;
    for invoice in invoices {
        wtr.write_record(invoice.to_row())?;
    }

    wtr.flush()?;
    Ok(())
}
