//! Structured extraction records and completeness verdicts.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field value that is either read from the document or explicitly absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Field<T> {
    /// Value read confidently from the source.
    Present(T),
    /// Value missing or unreadable. Never a guess.
    #[default]
    Absent,
}

impl<T> Field<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Present(v),
            None => Self::Absent,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

/// Calendar date rendered canonically as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InvoiceDate(pub NaiveDate);

impl InvoiceDate {
    pub const FORMAT: &'static str = "%Y%m%d";

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }
}

impl fmt::Display for InvoiceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl Serialize for InvoiceDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InvoiceDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&text, Self::FORMAT)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Names of the extracted fields, as used in config and verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Amount,
    Date,
    TradingPartner,
    #[serde(alias = "invoice_registration_number")]
    RegistrationNumber,
}

impl FieldName {
    /// Key used in the model's JSON response.
    pub fn json_key(self) -> &'static str {
        match self {
            Self::Amount => "amount",
            Self::Date => "date",
            Self::TradingPartner => "trading_partner",
            Self::RegistrationNumber => "invoice_registration_number",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_key())
    }
}

/// Structured result for one payload. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Total amount in whole currency units.
    pub amount: Field<i64>,
    /// Transaction date.
    pub date: Field<InvoiceDate>,
    /// Counter-party name (never the issuer).
    pub trading_partner: Field<String>,
    /// Invoice registration number (`T` + digits).
    #[serde(rename = "invoice_registration_number")]
    pub registration_number: Field<String>,
    /// The model's JSON object exactly as received.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl ExtractionRecord {
    /// Whether the named field holds a value.
    pub fn has(&self, field: FieldName) -> bool {
        match field {
            FieldName::Amount => self.amount.is_present(),
            FieldName::Date => self.date.is_present(),
            FieldName::TradingPartner => self.trading_partner.is_present(),
            FieldName::RegistrationNumber => self.registration_number.is_present(),
        }
    }

    /// The three core fields as a JSON object, nulls for absent values.
    pub fn three_elements(&self) -> serde_json::Value {
        serde_json::json!({
            "amount": self.amount,
            "date": self.date,
            "trading_partner": self.trading_partner,
        })
    }
}

/// Completeness of one record under a required-field policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CompletenessVerdict {
    /// Required fields that were absent, in policy order.
    pub missing: Vec<FieldName>,
}

impl CompletenessVerdict {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for CompletenessVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_complete() { "True" } else { "False" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> ExtractionRecord {
        ExtractionRecord {
            amount: Field::Present(1000),
            date: Field::from(InvoiceDate::from_ymd(2024, 7, 3)),
            trading_partner: Field::Present("ABC Corp".to_string()),
            registration_number: Field::Absent,
            raw: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_date_renders_canonically() {
        let date = InvoiceDate::from_ymd(2024, 7, 3).unwrap();
        assert_eq!(date.to_string(), "20240703");
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"20240703\"");
    }

    #[test]
    fn test_absent_serializes_as_null() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "amount": 1000,
                "date": "20240703",
                "trading_partner": "ABC Corp",
                "invoice_registration_number": null,
            })
        );
    }

    #[test]
    fn test_three_elements() {
        let mut record = sample();
        record.trading_partner = Field::Absent;
        assert_eq!(
            record.three_elements().to_string(),
            r#"{"amount":1000,"date":"20240703","trading_partner":null}"#
        );
    }

    #[test]
    fn test_field_name_aliases() {
        let name: FieldName = serde_json::from_str("\"invoice_registration_number\"").unwrap();
        assert_eq!(name, FieldName::RegistrationNumber);
        assert_eq!(FieldName::TradingPartner.to_string(), "trading_partner");
    }
}
