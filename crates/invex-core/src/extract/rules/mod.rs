//! Normalization rules applied to raw field values from the model.
//!
//! Each rule maps one JSON value to a [`Field`]: a value that cannot be read
//! with confidence becomes [`Field::Absent`], never a guess.

pub mod amounts;
pub mod dates;
pub mod partner;
pub mod patterns;
pub mod registration;

pub use amounts::{parse_amount_text, AmountRule};
pub use dates::{parse_date_text, DateRule};
pub use partner::{clean_partner_name, PartnerRule};
pub use registration::{normalize_registration_number, RegistrationRule};

use serde_json::Value;

use crate::models::record::Field;

/// Trait for field normalization rules.
pub trait FieldRule {
    /// The type of value this rule produces.
    type Output;

    /// Normalize one raw JSON value. `null` is always absent.
    fn apply(&self, value: &Value) -> Field<Self::Output>;
}
