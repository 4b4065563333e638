//! Monetary value cleanup.
//!
//! Commas are unified to dots before anything else. This is lossy for
//! values that use a comma as thousands separator: `"1,234.56"` becomes
//! `"1.234.56"`. Callers that need numeric values must parse the result
//! themselves.

use lazy_static::lazy_static;

use crate::models::config::NormalizationConfig;

lazy_static! {
    static ref DEFAULT_NORMALIZER: AmountNormalizer = AmountNormalizer::default();
}

/// Normalize an amount using the default currency tokens.
///
/// See [`AmountNormalizer::normalize`].
pub fn normalize_amount(value: &str, currency_hint: Option<&str>) -> String {
    DEFAULT_NORMALIZER.normalize(value, currency_hint)
}

/// Amount normalizer with a configurable set of currency tokens.
#[derive(Debug, Clone)]
pub struct AmountNormalizer {
    currency_tokens: Vec<String>,
}

impl AmountNormalizer {
    pub fn new(currency_tokens: Vec<String>) -> Self {
        Self { currency_tokens }
    }

    pub fn from_config(config: &NormalizationConfig) -> Self {
        Self::new(config.currency_tokens.clone())
    }

    /// Clean up one amount.
    ///
    /// Blank values come back unchanged. Otherwise every `,` becomes `.`,
    /// the result is trimmed, and the trimmed currency hint is prefixed with
    /// one space unless the value already starts with `$`, with the hint
    /// itself, or with any configured currency token. The prefix guard
    /// makes the operation idempotent for every hint.
    pub fn normalize(&self, value: &str, currency_hint: Option<&str>) -> String {
        if value.trim().is_empty() {
            return value.to_string();
        }

        let cleaned = value.replace(',', ".").trim().to_string();

        let Some(hint) = currency_hint.map(str::trim).filter(|h| !h.is_empty()) else {
            return cleaned;
        };

        if cleaned.starts_with('$') || self.has_currency_prefix(&cleaned, hint) {
            return cleaned;
        }

        format!("{hint} {cleaned}")
    }

    fn has_currency_prefix(&self, value: &str, hint: &str) -> bool {
        std::iter::once(hint)
            .chain(self.currency_tokens.iter().map(String::as_str))
            .any(|token| starts_with_token(value, token))
    }
}

impl Default for AmountNormalizer {
    fn default() -> Self {
        Self::from_config(&NormalizationConfig::default())
    }
}

/// Case-insensitive prefix test; word tokens must end at a word boundary.
fn starts_with_token(value: &str, token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }

    let Some(head) = value.get(..token.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(token) {
        return false;
    }

    let word_token = token.chars().last().is_some_and(char::is_alphanumeric);
    let next = value[token.len()..].chars().next();
    !word_token || !next.is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_comma_unification() {
        assert_eq!(normalize_amount("1,234.56", None), "1.234.56");
        assert_eq!(normalize_amount(" 12,50 ", None), "12.50");
    }

    #[test]
    fn test_currency_prefix() {
        assert_eq!(normalize_amount("100", Some("USD")), "USD 100");
        assert_eq!(normalize_amount("100", Some("  EUR ")), "EUR 100");
        assert_eq!(normalize_amount("$50", Some("USD")), "$50");
    }

    #[test]
    fn test_blank_values_unchanged() {
        assert_eq!(normalize_amount("", Some("USD")), "");
        assert_eq!(normalize_amount("   ", Some("USD")), "   ");
    }

    #[test]
    fn test_blank_hint_is_ignored() {
        assert_eq!(normalize_amount("100", Some("  ")), "100");
        assert_eq!(normalize_amount("100", None), "100");
    }

    #[test]
    fn test_existing_prefix_not_doubled() {
        assert_eq!(normalize_amount("USD 100", Some("USD")), "USD 100");
        assert_eq!(normalize_amount("usd 100", Some("USD")), "usd 100");
        assert_eq!(normalize_amount("€12,00", Some("EUR")), "€12.00");
        assert_eq!(normalize_amount("CHF 5", Some("CHF")), "CHF 5");
    }

    #[test]
    fn test_word_token_needs_boundary() {
        let normalizer = AmountNormalizer::new(vec!["RS".to_string()]);
        assert_eq!(normalizer.normalize("RS 10", Some("INR")), "RS 10");
        assert_eq!(normalizer.normalize("RSVP 10", Some("INR")), "INR RSVP 10");
    }

    #[test]
    fn test_idempotent() {
        let hints = [None, Some("USD"), Some("$"), Some("CHF"), Some("₹")];
        let values = ["", "100", "1,5", "$7", "USD 3", "₹ 90", " 4 "];

        for hint in hints {
            for value in values {
                let once = normalize_amount(value, hint);
                assert_eq!(normalize_amount(&once, hint), once, "value {value:?} hint {hint:?}");
            }
        }
    }
}
