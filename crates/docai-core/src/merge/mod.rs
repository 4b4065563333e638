//! Consolidation of per-document records into one record per invoice.
//!
//! Records are grouped by extracted invoice number, falling back to the
//! document identifier. Two different invoices whose numbers were misread
//! identically will be merged; there is no way to tell them apart here.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::models::config::NormalizationConfig;
use crate::models::invoice::{ConsolidatedInvoice, ExtractionRecord};
use crate::normalize::AmountNormalizer;

/// Separator between item descriptions of one invoice.
pub const ITEM_SEPARATOR: &str = "; ";

/// Identity of a consolidated invoice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Extracted invoice number.
    InvoiceNumber(String),
    /// Document identifier, used when no invoice number was extracted.
    Source(String),
}

impl GroupKey {
    pub fn for_record(record: &ExtractionRecord) -> Self {
        let number = record.fields.invoice_number.trim();
        if number.is_empty() {
            GroupKey::Source(record.source_identifier.clone())
        } else {
            GroupKey::InvoiceNumber(number.to_string())
        }
    }
}

/// Merge records with the default normalizer.
pub fn merge(records: &[ExtractionRecord]) -> Vec<ConsolidatedInvoice> {
    Merger::new().merge(records)
}

/// Folds extraction records into consolidated invoices.
#[derive(Debug, Clone)]
pub struct Merger {
    /// Applied to the totals of each invoice once grouping is done.
    normalizer: Option<AmountNormalizer>,
}

impl Merger {
    pub fn new() -> Self {
        Self {
            normalizer: Some(AmountNormalizer::default()),
        }
    }

    pub fn from_config(config: &NormalizationConfig) -> Self {
        Self {
            normalizer: config
                .normalize_at_consolidation
                .then(|| AmountNormalizer::from_config(config)),
        }
    }

    /// Keep totals exactly as extracted.
    pub fn without_normalization(mut self) -> Self {
        self.normalizer = None;
        self
    }

    /// Consolidate records, keeping the first-seen order of invoices.
    ///
    /// Scalar fields come from the first record of each group. Item
    /// descriptions of all records are concatenated in order, duplicates
    /// included. Items without a description contribute nothing.
    pub fn merge(&self, records: &[ExtractionRecord]) -> Vec<ConsolidatedInvoice> {
        let mut groups: IndexMap<GroupKey, (ConsolidatedInvoice, Vec<String>)> = IndexMap::new();

        for record in records {
            let (_, descriptions) = groups
                .entry(GroupKey::for_record(record))
                .or_insert_with(|| (ConsolidatedInvoice::from_first(record), Vec::new()));

            descriptions.extend(
                record
                    .fields
                    .items
                    .iter()
                    // Missing descriptions are skipped, not rendered as text
                    .filter_map(|item| item.description.as_deref())
                    .map(|description| description.trim().to_string()),
            );
        }

        debug!("Merged {} records into {} invoices", records.len(), groups.len());

        groups
            .into_values()
            .map(|(invoice, descriptions)| self.finalize(invoice, descriptions))
            .collect()
    }

    fn finalize(&self, mut invoice: ConsolidatedInvoice, descriptions: Vec<String>) -> ConsolidatedInvoice {
        invoice.item_description = descriptions.join(ITEM_SEPARATOR);

        if let Some(normalizer) = &self.normalizer {
            let hint = Some(invoice.currency.as_str());
            invoice.subtotal = normalizer.normalize(&invoice.subtotal, hint);
            invoice.tax = normalizer.normalize(&invoice.tax, hint);
            invoice.grand_total = normalizer.normalize(&invoice.grand_total, hint);
        }

        invoice
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

/// Narrative summaries keyed by document identifier, in document order.
///
/// Passed through untouched; a repeated identifier keeps its first position
/// and its latest narrative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SummaryChannel(IndexMap<String, String>);

impl SummaryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_identifier: impl Into<String>, narrative: impl Into<String>) {
        self.0.insert(source_identifier.into(), narrative.into());
    }

    pub fn get(&self, source_identifier: &str) -> Option<&str> {
        self.0.get(source_identifier).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SummaryChannel {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut channel = Self::new();
        for (source, narrative) in iter {
            channel.insert(source, narrative);
        }
        channel
    }
}
