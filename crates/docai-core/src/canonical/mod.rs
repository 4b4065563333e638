//! Mapping of producer output onto the canonical invoice schema.

pub mod markup;
pub mod structured;

pub use markup::fields_from_tree;
pub use structured::{fields_from_response, json_span};

use tracing::{debug, warn};

use crate::markup::{parse, ParseNode};
use crate::models::config::ExtractionConfig;
use crate::models::invoice::{ExtractionRecord, Producer};

/// Builds extraction records from producer output and picks one per document.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    /// Whether the hosted model's record wins over the vision model's.
    prefer_structured: bool,
}

impl Canonicalizer {
    /// Create a canonicalizer preferring the hosted model.
    pub fn new() -> Self {
        Self {
            prefer_structured: true,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new().with_structured_preference(config.prefer_structured)
    }

    /// Set which producer wins when both succeeded.
    pub fn with_structured_preference(mut self, prefer: bool) -> Self {
        self.prefer_structured = prefer;
        self
    }

    /// Parse vision model markup and map it onto the schema.
    ///
    /// Returns the decoded tree alongside the record so callers can keep it
    /// for diagnostics.
    pub fn from_markup(&self, source_identifier: &str, markup: &str) -> (ParseNode, ExtractionRecord) {
        let tree = parse(markup);
        let fields = fields_from_tree(&tree);
        debug!(
            "Vision model yielded {} items for {}",
            fields.items.len(),
            source_identifier
        );
        let record = ExtractionRecord::new(source_identifier, Producer::Markup, fields);
        (tree, record)
    }

    /// Decode a hosted model response.
    ///
    /// An undecodable response becomes a failed record that keeps the raw
    /// text.
    pub fn from_response(&self, source_identifier: &str, response: &str) -> ExtractionRecord {
        match fields_from_response(response) {
            Ok(fields) => ExtractionRecord::new(source_identifier, Producer::Structured, fields),
            Err(e) => {
                warn!("Unusable hosted model response for {}: {}", source_identifier, e);
                ExtractionRecord::failed(
                    source_identifier,
                    Producer::Structured,
                    &e,
                    Some(response.to_string()),
                )
            }
        }
    }

    /// Pick one record for a document.
    ///
    /// The preferred producer's record is taken wholesale when it is usable
    /// (no error, some data); otherwise the other producer's record is taken
    /// wholesale, whatever its state. Fields are never mixed.
    pub fn choose(
        &self,
        markup: Option<ExtractionRecord>,
        structured: Option<ExtractionRecord>,
    ) -> Option<ExtractionRecord> {
        let (preferred, fallback) = if self.prefer_structured {
            (structured, markup)
        } else {
            (markup, structured)
        };

        match (preferred, fallback) {
            (Some(preferred), _) if preferred.is_usable() => Some(preferred),
            (preferred, Some(fallback)) => {
                if let Some(preferred) = preferred {
                    debug!(
                        "Falling back from {} to {} for {}",
                        preferred.producer, fallback.producer, fallback.source_identifier
                    );
                }
                Some(fallback)
            }
            (preferred, None) => preferred,
        }
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}
