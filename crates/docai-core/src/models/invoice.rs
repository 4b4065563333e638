//! Invoice data models shared by both producers and the merger.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ExtractionError;

/// The extraction collaborator that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Producer {
    /// Local vision-sequence model emitting `<s_NAME>` markup.
    Markup,
    /// Hosted multimodal model emitting a JSON object.
    Structured,
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Producer::Markup => f.write_str("vision model"),
            Producer::Structured => f.write_str("hosted model"),
        }
    }
}

/// A single line item on the invoice.
///
/// Every field is optional: the markup producer only ever fills
/// `description`, and the hosted producer may omit or null any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    #[serde(deserialize_with = "lenient_opt_string")]
    pub description: Option<String>,

    #[serde(deserialize_with = "lenient_opt_string")]
    pub quantity: Option<String>,

    #[serde(deserialize_with = "lenient_opt_string")]
    pub unit_price: Option<String>,

    #[serde(deserialize_with = "lenient_opt_string")]
    pub tax_rate: Option<String>,

    #[serde(deserialize_with = "lenient_opt_string")]
    pub total_price: Option<String>,
}

impl LineItem {
    /// Create an item carrying only a description.
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }
}

/// The fixed target schema every extraction is mapped onto.
///
/// Scalar fields are plain strings that default to empty; "missing" and
/// "empty" are the same thing here, so no caller has to coalesce `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalInvoiceFields {
    #[serde(deserialize_with = "lenient_string")]
    pub invoice_number: String,

    #[serde(deserialize_with = "lenient_string")]
    pub vendor: String,

    #[serde(deserialize_with = "lenient_string")]
    pub date: String,

    #[serde(deserialize_with = "lenient_string")]
    pub buyer: String,

    #[serde(deserialize_with = "lenient_string")]
    pub address: String,

    #[serde(deserialize_with = "lenient_string")]
    pub currency: String,

    #[serde(deserialize_with = "lenient_string")]
    pub subtotal: String,

    #[serde(deserialize_with = "lenient_string")]
    pub tax: String,

    #[serde(deserialize_with = "lenient_string")]
    pub grand_total: String,

    #[serde(deserialize_with = "lenient_string")]
    pub notes: String,

    #[serde(deserialize_with = "lenient_items")]
    pub items: Vec<LineItem>,
}

impl CanonicalInvoiceFields {
    /// Scalar fields in schema order, paired with their names.
    pub fn scalars(&self) -> [(&'static str, &str); 10] {
        [
            ("invoice_number", self.invoice_number.as_str()),
            ("vendor", self.vendor.as_str()),
            ("date", self.date.as_str()),
            ("buyer", self.buyer.as_str()),
            ("address", self.address.as_str()),
            ("currency", self.currency.as_str()),
            ("subtotal", self.subtotal.as_str()),
            ("tax", self.tax.as_str()),
            ("grand_total", self.grand_total.as_str()),
            ("notes", self.notes.as_str()),
        ]
    }

    /// True when no scalar field is set and there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.scalars().iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// One producer's output for one input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Document identifier (usually the uploaded file name).
    pub source_identifier: String,

    /// Which producer built this record.
    pub producer: Producer,

    /// Canonical fields; all empty when extraction failed.
    pub fields: CanonicalInvoiceFields,

    /// Set when the producer output could not be turned into fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,

    /// Raw producer text kept for diagnostics on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl ExtractionRecord {
    /// Create a successful record.
    pub fn new(
        source_identifier: impl Into<String>,
        producer: Producer,
        fields: CanonicalInvoiceFields,
    ) -> Self {
        Self {
            source_identifier: source_identifier.into(),
            producer,
            fields,
            extraction_error: None,
            raw_output: None,
        }
    }

    /// Create a failed record with empty fields.
    pub fn failed(
        source_identifier: impl Into<String>,
        producer: Producer,
        error: &ExtractionError,
        raw_output: Option<String>,
    ) -> Self {
        Self {
            source_identifier: source_identifier.into(),
            producer,
            fields: CanonicalInvoiceFields::default(),
            extraction_error: Some(error.to_string()),
            raw_output,
        }
    }

    /// A record counts as successful when it has no error and carries data.
    pub fn is_usable(&self) -> bool {
        self.extraction_error.is_none() && !self.fields.is_empty()
    }
}

/// One record per distinct invoice after merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedInvoice {
    pub invoice_number: String,
    pub vendor: String,
    pub date: String,
    pub buyer: String,
    pub address: String,
    pub currency: String,
    pub subtotal: String,
    pub tax: String,
    pub grand_total: String,
    pub notes: String,

    /// Identifier of the first document contributing to this invoice.
    pub source_identifier: String,

    /// Item descriptions of every contributing record, joined with `"; "`.
    pub item_description: String,
}

impl ConsolidatedInvoice {
    /// Column names of the tabular export, in order.
    pub const COLUMNS: [&'static str; 12] = [
        "invoice_number",
        "vendor",
        "date",
        "buyer",
        "address",
        "currency",
        "subtotal",
        "tax",
        "grand_total",
        "notes",
        "source_file",
        "item_description",
    ];

    /// Seed an invoice from the scalar fields of its first record.
    ///
    /// The invoice number is trimmed, matching how records are grouped.
    pub fn from_first(record: &ExtractionRecord) -> Self {
        let f = &record.fields;
        Self {
            invoice_number: f.invoice_number.trim().to_string(),
            vendor: f.vendor.clone(),
            date: f.date.clone(),
            buyer: f.buyer.clone(),
            address: f.address.clone(),
            currency: f.currency.clone(),
            subtotal: f.subtotal.clone(),
            tax: f.tax.clone(),
            grand_total: f.grand_total.clone(),
            notes: f.notes.clone(),
            source_identifier: record.source_identifier.clone(),
            item_description: String::new(),
        }
    }

    /// Row values matching [`Self::COLUMNS`].
    pub fn to_row(&self) -> [&str; 12] {
        [
            self.invoice_number.as_str(),
            self.vendor.as_str(),
            self.date.as_str(),
            self.buyer.as_str(),
            self.address.as_str(),
            self.currency.as_str(),
            self.subtotal.as_str(),
            self.tax.as_str(),
            self.grand_total.as_str(),
            self.notes.as_str(),
            self.source_identifier.as_str(),
            self.item_description.as_str(),
        ]
    }
}

/// Stringify a JSON scalar; `null` is absent.
fn lenient_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_value(Value::deserialize(deserializer)?))
}

/// Accept an array of item objects or bare strings; anything else is no items.
fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(_) => serde_json::from_value(entry).ok(),
            Value::Null => None,
            scalar => lenient_value(scalar).map(LineItem::described),
        })
        .collect())
}
