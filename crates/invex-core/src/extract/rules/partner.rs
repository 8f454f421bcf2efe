//! Trading partner name cleanup.

use serde_json::Value;

use super::FieldRule;
use super::patterns::PARTNER_HONORIFIC;
use crate::models::record::Field;

/// Partner rule: trims whitespace and trailing honorifics.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartnerRule;

impl PartnerRule {
    pub fn new() -> Self {
        Self
    }
}

impl FieldRule for PartnerRule {
    type Output = String;

    fn apply(&self, value: &Value) -> Field<String> {
        match value {
            Value::String(s) => Field::from(clean_partner_name(s)),
            _ => Field::Absent,
        }
    }
}

/// `"ABC商事 御中 "` becomes `"ABC商事"`; blank names yield `None`.
pub fn clean_partner_name(name: &str) -> Option<String> {
    let name = PARTNER_HONORIFIC.replace(name.trim(), "");
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
