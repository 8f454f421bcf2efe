//! Amount normalization to whole currency units.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use tracing::debug;

use super::FieldRule;
use super::patterns::AMOUNT_TEXT;
use crate::models::record::Field;

/// Amount rule: integers pass through, fractions round half away from zero.
#[derive(Debug, Clone, Copy)]
pub struct AmountRule {
    /// Treat `0` as unreadable.
    pub zero_is_absent: bool,
}

impl AmountRule {
    pub fn new(zero_is_absent: bool) -> Self {
        Self { zero_is_absent }
    }
}

impl Default for AmountRule {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FieldRule for AmountRule {
    type Output = i64;

    fn apply(&self, value: &Value) -> Field<i64> {
        let amount = match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(i),
                None => n.as_f64().and_then(round_float),
            },
            Value::String(s) => parse_amount_text(s),
            Value::Null => None,
            other => {
                debug!("Ignoring non-numeric amount: {}", other);
                None
            }
        };

        match amount {
            Some(a) if a < 0 => {
                debug!("Ignoring negative amount {}", a);
                Field::Absent
            }
            Some(0) if self.zero_is_absent => Field::Absent,
            other => Field::from(other),
        }
    }
}

fn round_float(value: f64) -> Option<i64> {
    Decimal::try_from(value).ok().and_then(round_decimal)
}

fn round_decimal(value: Decimal) -> Option<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Parse an amount written as text, e.g. `¥1,234`, `1,234円`, `1 234.5`.
pub fn parse_amount_text(text: &str) -> Option<i64> {
    let caps = AMOUNT_TEXT.captures(text.trim())?;
    let integer: String = caps[1]
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();

    let number = match caps.get(2) {
        Some(fraction) => format!("{}.{}", integer, fraction.as_str()),
        None => integer,
    };

    Decimal::from_str(&number).ok().and_then(round_decimal)
}
