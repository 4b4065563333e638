//! Decoding of the hosted model's JSON response.
//!
//! The hosted model is prompted with the canonical schema, so a decoded
//! object maps onto [`CanonicalInvoiceFields`] field by field. Responses
//! often wrap the object in prose or code fences; only the span from the
//! first `{` to the last `}` is decoded.

use crate::error::ExtractionError;
use crate::models::invoice::CanonicalInvoiceFields;

/// Span from the first `{` to the last `}`, inclusive.
pub fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode the canonical fields embedded in a response.
pub fn fields_from_response(text: &str) -> Result<CanonicalInvoiceFields, ExtractionError> {
    let span = json_span(text).ok_or(ExtractionError::NoJsonObject)?;
    serde_json::from_str(span).map_err(|e| ExtractionError::StructuredResponseUnparseable {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::LineItem;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_span_between_first_and_last_brace() {
        let text = r#"noise {"invoice_number":"5"} trailing"#;
        assert_eq!(json_span(text), Some(r#"{"invoice_number":"5"}"#));

        let fields = fields_from_response(text).unwrap();
        assert_eq!(
            fields,
            CanonicalInvoiceFields {
                invoice_number: "5".to_string(),
                ..CanonicalInvoiceFields::default()
            }
        );
    }

    #[test]
    fn test_fenced_response() {
        let text = "```json\n{\n  \"invoice_number\": \"A-9\",\n  \"currency\": \"EUR\",\n  \
                    \"items\": [{\"description\": \"Widget\", \"quantity\": \"2\"}],\n  \
                    \"grand_total\": \"20,00\"\n}\n```";
        let fields = fields_from_response(text).unwrap();

        assert_eq!(fields.invoice_number, "A-9");
        assert_eq!(fields.currency, "EUR");
        assert_eq!(fields.grand_total, "20,00");
        assert_eq!(
            fields.items,
            vec![LineItem {
                description: Some("Widget".to_string()),
                quantity: Some("2".to_string()),
                ..LineItem::default()
            }]
        );
    }

    #[test]
    fn test_missing_braces() {
        assert_eq!(fields_from_response("sorry, no invoice"), Err(ExtractionError::NoJsonObject));
        assert_eq!(fields_from_response("} backwards {"), Err(ExtractionError::NoJsonObject));
    }

    #[test]
    fn test_malformed_object() {
        let err = fields_from_response(r#"{"invoice_number": "5",}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::StructuredResponseUnparseable { .. }));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let fields = fields_from_response(r#"{"vendor": "ACME", "confidence": 0.9}"#).unwrap();
        assert_eq!(fields.vendor, "ACME");
    }
}
