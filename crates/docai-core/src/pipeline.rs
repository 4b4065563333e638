//! Per-document extraction and run-level consolidation.
//!
//! [`Pipeline::process_document`] has no shared state and can run on any
//! number of workers. [`Pipeline::finish`] must see every outcome of the run
//! because grouping needs all records that share an invoice number.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::canonical::Canonicalizer;
use crate::error::{ExtractionError, Result};
use crate::markup::ParseNode;
use crate::merge::{Merger, SummaryChannel};
use crate::models::config::DocaiConfig;
use crate::models::invoice::{ConsolidatedInvoice, ExtractionRecord, Producer};

/// What an external producer handed back for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducerOutput {
    /// Raw text returned by the producer.
    Text(String),
    /// The producer failed; the message describes why.
    Failed(String),
}

/// Everything the producers returned for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub source_identifier: String,

    /// Vision model markup.
    #[serde(default)]
    pub markup: Option<ProducerOutput>,

    /// Hosted model response.
    #[serde(default)]
    pub response: Option<ProducerOutput>,

    /// Hosted model narrative, passed through to the summaries.
    #[serde(default)]
    pub narrative: Option<String>,
}

impl DocumentInput {
    pub fn new(source_identifier: impl Into<String>) -> Self {
        Self {
            source_identifier: source_identifier.into(),
            markup: None,
            response: None,
            narrative: None,
        }
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = Some(ProducerOutput::Text(markup.into()));
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(ProducerOutput::Text(response.into()));
        self
    }

    pub fn with_narrative(mut self, narrative: impl Into<String>) -> Self {
        self.narrative = Some(narrative.into());
        self
    }

    /// Load a document description from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Result of processing one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOutcome {
    pub source_identifier: String,

    /// Decoded vision model markup, when the vision model produced any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup_tree: Option<ParseNode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup_record: Option<ExtractionRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_record: Option<ExtractionRecord>,

    /// The record that goes on to the merger.
    pub chosen: ExtractionRecord,

    /// Hosted model narrative, empty when there was none.
    pub narrative: String,
}

impl DocumentOutcome {
    /// Error of the hosted model's record, the per-document failure flag.
    pub fn structured_error(&self) -> Option<&str> {
        self.structured_record
            .as_ref()
            .and_then(|r| r.extraction_error.as_deref())
    }
}

/// Consolidated output of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutput {
    /// Chosen record per document, in document order.
    pub records: Vec<ExtractionRecord>,

    pub invoices: Vec<ConsolidatedInvoice>,

    pub summaries: SummaryChannel,
}

/// Extraction pipeline over pre-computed producer output.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    canonicalizer: Canonicalizer,
    merger: Merger,
}

impl Pipeline {
    pub fn new(canonicalizer: Canonicalizer, merger: Merger) -> Self {
        Self {
            canonicalizer,
            merger,
        }
    }

    pub fn from_config(config: &DocaiConfig) -> Self {
        Self::new(
            Canonicalizer::from_config(&config.extraction),
            Merger::from_config(&config.normalization),
        )
    }

    /// Turn one document's producer output into a single record.
    ///
    /// Never fails; producer failures become records with an error set.
    pub fn process_document(&self, input: &DocumentInput) -> DocumentOutcome {
        let source = input.source_identifier.as_str();
        info!("Processing document {}", source);

        let (markup_tree, markup_record) = match &input.markup {
            Some(ProducerOutput::Text(markup)) => {
                let (tree, record) = self.canonicalizer.from_markup(source, markup);
                (Some(tree), Some(record))
            }
            Some(ProducerOutput::Failed(message)) => {
                (None, Some(producer_failure(source, Producer::Markup, message)))
            }
            None => (None, None),
        };

        let structured_record = match &input.response {
            Some(ProducerOutput::Text(response)) => {
                Some(self.canonicalizer.from_response(source, response))
            }
            Some(ProducerOutput::Failed(message)) => {
                Some(producer_failure(source, Producer::Structured, message))
            }
            None => None,
        };

        let chosen = self
            .canonicalizer
            .choose(markup_record.clone(), structured_record.clone())
            .unwrap_or_else(|| {
                warn!("No producer output for {}", source);
                ExtractionRecord::failed(
                    source,
                    Producer::Markup,
                    &ExtractionError::NoProducerOutput,
                    None,
                )
            });

        DocumentOutcome {
            source_identifier: input.source_identifier.clone(),
            markup_tree,
            markup_record,
            structured_record,
            chosen,
            narrative: input.narrative.clone().unwrap_or_default(),
        }
    }

    /// Merge the outcomes of a complete run.
    pub fn finish(&self, outcomes: Vec<DocumentOutcome>) -> RunOutput {
        let mut summaries = SummaryChannel::new();
        let mut records = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            summaries.insert(outcome.source_identifier, outcome.narrative);
            records.push(outcome.chosen);
        }

        let invoices = self.merger.merge(&records);
        info!(
            "Consolidated {} documents into {} invoices",
            records.len(),
            invoices.len()
        );

        RunOutput {
            records,
            invoices,
            summaries,
        }
    }

    /// Process every document in order, then merge.
    pub fn run(&self, inputs: &[DocumentInput]) -> RunOutput {
        let outcomes = inputs.iter().map(|input| self.process_document(input)).collect();
        self.finish(outcomes)
    }
}

fn producer_failure(source: &str, producer: Producer, message: &str) -> ExtractionRecord {
    warn!("{} failed for {}: {}", producer, source, message);
    let error = ExtractionError::Producer {
        producer,
        message: message.to_string(),
    };
    ExtractionRecord::failed(source, producer, &error, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MARKUP: &str = "<s_menu><s_nm>Invoice: INV-1</s_nm><s_nm>Widget</s_nm></s_menu>\
                          <s_total><s_total_price>10,00</s_total_price></s_total>";

    #[test]
    fn test_markup_only_document() {
        let outcome = Pipeline::default().process_document(&DocumentInput::new("a.png").with_markup(MARKUP));

        assert!(outcome.markup_tree.is_some());
        assert_eq!(outcome.chosen.producer, Producer::Markup);
        assert_eq!(outcome.chosen.fields.invoice_number, "INV-1");
        assert_eq!(outcome.structured_error(), None);
        assert_eq!(outcome.narrative, "");
    }

    #[test]
    fn test_unparseable_response_is_flagged() {
        let input = DocumentInput::new("a.png")
            .with_markup(MARKUP)
            .with_response("I could not read this invoice.");
        let outcome = Pipeline::default().process_document(&input);

        assert_eq!(outcome.chosen.producer, Producer::Markup);
        assert_eq!(outcome.structured_error(), Some("no JSON object found in response"));
        assert_eq!(
            outcome.structured_record.unwrap().raw_output.as_deref(),
            Some("I could not read this invoice.")
        );
    }

    #[test]
    fn test_producer_failures() {
        let input = DocumentInput {
            source_identifier: "a.png".to_string(),
            markup: Some(ProducerOutput::Failed("out of memory".to_string())),
            response: Some(ProducerOutput::Failed("timeout".to_string())),
            narrative: None,
        };
        let outcome = Pipeline::default().process_document(&input);

        assert_eq!(outcome.markup_tree, None);
        assert_eq!(
            outcome.chosen.extraction_error.as_deref(),
            Some("vision model failed: out of memory")
        );
        assert_eq!(outcome.structured_error(), Some("hosted model failed: timeout"));
    }

    #[test]
    fn test_no_producer_output() {
        let outcome = Pipeline::default().process_document(&DocumentInput::new("a.png"));
        assert_eq!(
            outcome.chosen.extraction_error.as_deref(),
            Some("no producer output for document")
        );
    }

    #[test]
    fn test_run_merges_and_keeps_summaries() {
        let inputs = vec![
            DocumentInput::new("page1.png")
                .with_response(r#"{"invoice_number": "INV-7", "currency": "EUR", "grand_total": "12,5", "items": [{"description": "Widget"}]}"#)
                .with_narrative("Widget order."),
            DocumentInput::new("page2.png")
                .with_response(r#"{"invoice_number": "INV-7", "items": [{"description": "Gadget"}]}"#)
                .with_narrative("Gadget order."),
            DocumentInput::new("receipt.png").with_markup(MARKUP),
        ];

        let output = Pipeline::default().run(&inputs);

        assert_eq!(output.records.len(), 3);
        assert_eq!(output.invoices.len(), 2);
        assert_eq!(output.invoices[0].item_description, "Widget; Gadget");
        assert_eq!(output.invoices[0].grand_total, "EUR 12.5");
        assert_eq!(output.invoices[1].invoice_number, "INV-1");
        assert_eq!(output.invoices[1].grand_total, "10.00");
        assert_eq!(output.summaries.get("page2.png"), Some("Gadget order."));
        assert_eq!(output.summaries.get("receipt.png"), Some(""));
    }

    #[test]
    fn test_document_input_json() {
        let input: DocumentInput = serde_json::from_str(
            r#"{"source_identifier": "a.png", "markup": {"failed": "boom"}, "response": {"text": "{}"}}"#,
        )
        .unwrap();

        assert_eq!(input.markup, Some(ProducerOutput::Failed("boom".to_string())));
        assert_eq!(input.response, Some(ProducerOutput::Text("{}".to_string())));
        assert_eq!(input.narrative, None);
    }
}
