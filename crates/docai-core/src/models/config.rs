//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{DocaiError, Result};

/// Main configuration for the docai pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocaiConfig {
    /// Producer preference configuration.
    pub extraction: ExtractionConfig,

    /// Monetary value cleanup configuration.
    pub normalization: NormalizationConfig,

    /// Tabular export configuration.
    pub export: ExportConfig,
}

/// Producer preference configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Take the hosted model's record wholesale whenever it succeeded.
    /// When false the vision model's record wins whenever it carries data.
    pub prefer_structured: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            prefer_structured: true,
        }
    }
}

/// Monetary value cleanup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Prefixes that mark an amount as already carrying its currency.
    pub currency_tokens: Vec<String>,

    /// Normalize `subtotal`, `tax` and `grand_total` when merging.
    pub normalize_at_consolidation: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            currency_tokens: ["$", "€", "£", "₹", "USD", "EUR", "GBP", "INR", "PLN"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            normalize_at_consolidation: true,
        }
    }
}

/// Tabular export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Field delimiter of the invoice table (must be ASCII).
    pub delimiter: char,

    /// File name of the consolidated invoice table.
    pub invoices_file: String,

    /// File name of the per-document summary map.
    pub summaries_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            invoices_file: "invoices_extracted.csv".to_string(),
            summaries_file: "summaries.json".to_string(),
        }
    }
}

impl DocaiConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check values that serde cannot constrain.
    pub fn validate(&self) -> Result<()> {
        if !self.export.delimiter.is_ascii() {
            return Err(DocaiError::Config(format!(
                "export delimiter must be ASCII, got {:?}",
                self.export.delimiter
            )));
        }
        if self
            .normalization
            .currency_tokens
            .iter()
            .any(|t| t.trim().is_empty())
        {
            return Err(DocaiError::Config(
                "currency tokens must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: DocaiConfig =
            serde_json::from_str(r#"{"export": {"delimiter": ";"}}"#).unwrap();

        assert_eq!(config.export.delimiter, ';');
        assert_eq!(config.export.invoices_file, "invoices_extracted.csv");
        assert!(config.extraction.prefer_structured);
        assert!(config.normalization.currency_tokens.contains(&"USD".to_string()));
    }

    #[test]
    fn test_validate_rejects_non_ascii_delimiter() {
        let mut config = DocaiConfig::default();
        config.export.delimiter = '§';
        assert!(matches!(config.validate(), Err(DocaiError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_blank_token() {
        let mut config = DocaiConfig::default();
        config.normalization.currency_tokens.push(" ".to_string());
        assert!(config.validate().is_err());
    }
}
