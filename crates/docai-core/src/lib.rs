//! Core library for invoice extraction normalization.
//!
//! This crate provides:
//! - Decoding of vision model `<s_NAME>` markup into a generic tree
//! - Mapping of markup trees and hosted model JSON onto one invoice schema
//! - Monetary value cleanup
//! - Consolidation of per-document records into one record per invoice
//!
//! Running the models themselves, and writing export files, is left to
//! callers.

pub mod canonical;
pub mod error;
pub mod markup;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;

pub use canonical::Canonicalizer;
pub use error::{DocaiError, ExtractionError, Result};
pub use markup::{parse, ParseNode};
pub use merge::{merge, Merger, SummaryChannel};
pub use models::config::DocaiConfig;
pub use models::invoice::{
    CanonicalInvoiceFields, ConsolidatedInvoice, ExtractionRecord, LineItem, Producer,
};
pub use normalize::{normalize_amount, AmountNormalizer};
pub use pipeline::{DocumentInput, DocumentOutcome, Pipeline, ProducerOutput, RunOutput};
