//! Invoice registration number normalization.

use serde_json::Value;
use tracing::debug;

use super::FieldRule;
use super::patterns::REGISTRATION_NUMBER;
use crate::models::record::Field;

/// Registration number rule.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationRule {
    /// Reject values that do not look like `T` + 8 or more characters.
    pub validate: bool,
}

impl RegistrationRule {
    pub fn new(validate: bool) -> Self {
        Self { validate }
    }
}

impl Default for RegistrationRule {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FieldRule for RegistrationRule {
    type Output = String;

    fn apply(&self, value: &Value) -> Field<String> {
        let Value::String(raw) = value else {
            return Field::Absent;
        };

        let number = normalize_registration_number(raw);
        if number.is_empty() {
            return Field::Absent;
        }
        if self.validate && !REGISTRATION_NUMBER.is_match(&number) {
            debug!("Rejecting registration number {:?}", raw);
            return Field::Absent;
        }
        Field::Present(number)
    }
}

/// Uppercase and strip spaces and hyphens: `t 1234-5678-9012 3` -> `T1234567890123`.
pub fn normalize_registration_number(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '－' | 'ー'))
        .flat_map(char::to_uppercase)
        .collect()
}
