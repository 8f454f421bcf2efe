//! Locating and interpreting the JSON object in a model response.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::Result;
use super::rules::{AmountRule, DateRule, FieldRule, PartnerRule, RegistrationRule};
use crate::error::ExtractionError;
use crate::models::config::ExtractionConfig;
use crate::models::record::{ExtractionRecord, Field, FieldName};

/// Keys that must be present in every response object. Values may be null.
pub const REQUIRED_KEYS: [FieldName; 3] = [FieldName::Amount, FieldName::Date, FieldName::TradingPartner];

/// Find the first `{` and its matching `}`.
///
/// Braces inside JSON string literals are ignored, so `{"a": "}"}` is returned
/// whole. Returns `None` when no balanced object exists.
pub fn locate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse a model response into a normalized record.
pub fn parse_record(content: &str, config: &ExtractionConfig) -> Result<ExtractionRecord> {
    let Some(object_text) = locate_json_object(content) else {
        warn!("No JSON object in response: {:?}", content);
        return Err(ExtractionError::NoJson);
    };

    let raw: Value = serde_json::from_str(object_text).inspect_err(|e| {
        warn!("Malformed JSON in response ({}): {:?}", e, object_text);
    })?;

    let Value::Object(object) = &raw else {
        return Err(ExtractionError::NotAnObject);
    };

    for key in REQUIRED_KEYS {
        if !object.contains_key(key.json_key()) {
            warn!("Response lacks required key {}: {}", key, raw);
            return Err(ExtractionError::MissingField(key.json_key().to_string()));
        }
    }

    let record = ExtractionRecord {
        amount: apply(&AmountRule::new(config.zero_amount_is_absent), object, FieldName::Amount),
        date: apply(&DateRule::new(), object, FieldName::Date),
        trading_partner: apply(&PartnerRule::new(), object, FieldName::TradingPartner),
        registration_number: apply(
            &RegistrationRule::new(config.validate_registration_number),
            object,
            FieldName::RegistrationNumber,
        ),
        raw: raw.clone(),
    };

    debug!(
        "Parsed record: amount={:?} date={:?} partner={:?} registration={:?}",
        record.amount.as_option(),
        record.date.as_option().map(|d| d.to_string()),
        record.trading_partner.as_option(),
        record.registration_number.as_option()
    );
    Ok(record)
}

fn apply<R: FieldRule>(rule: &R, object: &Map<String, Value>, field: FieldName) -> Field<R::Output> {
    object
        .get(field.json_key())
        .map_or(Field::Absent, |value| rule.apply(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::InvoiceDate;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> Result<ExtractionRecord> {
        parse_record(content, &ExtractionConfig::default())
    }

    #[test]
    fn test_locate_plain_object() {
        assert_eq!(locate_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn test_locate_in_prose() {
        let text = "Sure, here is the data: {\"amount\": 1000} hope it helps. {\"x\": 2}";
        assert_eq!(locate_json_object(text), Some("{\"amount\": 1000}"));
    }

    #[test]
    fn test_locate_nested_and_strings() {
        let text = r#"```json
{"a": {"b": "}"}, "c": "\"{"}
```"#;
        assert_eq!(locate_json_object(text), Some(r#"{"a": {"b": "}"}, "c": "\"{"}"#));
    }

    #[test]
    fn test_locate_unbalanced() {
        assert_eq!(locate_json_object("not json at all"), None);
        assert_eq!(locate_json_object("{\"a\": 1"), None);
    }

    #[test]
    fn test_parse_in_prose() {
        let content = r#"Here you go: {"amount": 1000, "date": "20240703", "trading_partner": "ABC"} thanks"#;
        let record = parse(content).unwrap();

        assert_eq!(record.amount, Field::Present(1000));
        assert_eq!(record.date, Field::from(InvoiceDate::from_ymd(2024, 7, 3)));
        assert_eq!(record.trading_partner, Field::Present("ABC".to_string()));
        assert_eq!(record.registration_number, Field::Absent);
        assert_eq!(record.raw["amount"], 1000);
    }

    #[test]
    fn test_parse_full_record_in_prose() {
        let object = r#"{"amount": 1000, "date": "20240703", "trading_partner": "ABC Corp", "invoice_registration_number": "T12345678"}"#;
        let content = format!("Here is the result: {} Thank you.", object);
        let record = parse(&content).unwrap();

        assert_eq!(record.raw, serde_json::from_str::<serde_json::Value>(object).unwrap());
        assert_eq!(record.amount, Field::Present(1000));
        assert_eq!(record.date, Field::from(InvoiceDate::from_ymd(2024, 7, 3)));
        assert_eq!(record.trading_partner, Field::Present("ABC Corp".to_string()));
        assert_eq!(record.registration_number, Field::Present("T12345678".to_string()));
    }

    #[test]
    fn test_short_registration_number_is_absent() {
        let content = r#"{"amount": 1000, "date": "20240703", "trading_partner": "ABC Corp", "invoice_registration_number": "T1234567"}"#;
        let record = parse(content).unwrap();

        assert_eq!(record.registration_number, Field::Absent);
        assert_eq!(record.raw["invoice_registration_number"], "T1234567");
    }

    #[test]
    fn test_null_values_are_absent() {
        let record = parse(r#"{"amount": null, "date": null, "trading_partner": null}"#).unwrap();
        assert!(record.amount.is_absent());
        assert!(record.date.is_absent());
        assert!(record.trading_partner.is_absent());
    }

    #[test]
    fn test_missing_key_fails() {
        assert!(matches!(
            parse(r#"{"amount": 1000, "date": "20240703"}"#),
            Err(ExtractionError::MissingField(key)) if key == "trading_partner"
        ));
    }

    #[test]
    fn test_failures() {
        assert!(matches!(parse("not json at all"), Err(ExtractionError::NoJson)));
        assert!(matches!(parse("{amount: 1000}"), Err(ExtractionError::Json(_))));
    }

    #[test]
    fn test_raw_is_kept_verbatim() {
        let record = parse(r#"{"amount": "¥1,200", "date": "令和6年7月3日", "trading_partner": "ABC 御中", "invoice_registration_number": "T1234567890123"}"#).unwrap();
        assert_eq!(record.amount, Field::Present(1200));
        assert_eq!(record.date.as_option().map(|d| d.to_string()).as_deref(), Some("20240703"));
        assert_eq!(record.trading_partner, Field::Present("ABC".to_string()));
        assert_eq!(record.registration_number, Field::Present("T1234567890123".to_string()));
        assert_eq!(record.raw["trading_partner"], "ABC 御中");
    }
}
