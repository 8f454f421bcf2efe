//! Date normalization to the canonical `YYYYMMDD` form.

use serde_json::Value;
use tracing::debug;

use super::FieldRule;
use super::patterns::{DATE_COMPACT, DATE_ERA_KANJI, DATE_ERA_SHORT, DATE_KANJI, DATE_SEPARATED};
use crate::models::record::{Field, InvoiceDate};

/// Date rule: accepts Gregorian and Japanese era notations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRule;

impl DateRule {
    pub fn new() -> Self {
        Self
    }
}

impl FieldRule for DateRule {
    type Output = InvoiceDate;

    fn apply(&self, value: &Value) -> Field<InvoiceDate> {
        match value {
            Value::String(s) => Field::from(parse_date_text(s)),
            // Some models answer 20240703 as a bare number
            Value::Number(n) => Field::from(n.as_u64().and_then(|n| parse_date_text(&n.to_string()))),
            _ => Field::Absent,
        }
    }
}

/// Parse a date string; invalid calendar dates yield `None`.
pub fn parse_date_text(text: &str) -> Option<InvoiceDate> {
    let text = text.trim();

    for pattern in [&*DATE_COMPACT, &*DATE_SEPARATED, &*DATE_KANJI] {
        if let Some(caps) = pattern.captures(text) {
            return ymd(caps[1].parse().ok()?, &caps[2], &caps[3], text);
        }
    }

    if let Some(caps) = DATE_ERA_KANJI.captures(text) {
        let year = if &caps[2] == "元" { 1 } else { caps[2].parse().ok()? };
        let year = era_to_gregorian(&caps[1], year)?;
        return ymd(year, &caps[3], &caps[4], text);
    }

    if let Some(caps) = DATE_ERA_SHORT.captures(text) {
        let year = era_to_gregorian(&caps[1].to_uppercase(), caps[2].parse().ok()?)?;
        return ymd(year, &caps[3], &caps[4], text);
    }

    debug!("Unrecognized date: {:?}", text);
    None
}

fn ymd(year: i32, month: &str, day: &str, text: &str) -> Option<InvoiceDate> {
    let date = InvoiceDate::from_ymd(year, month.parse().ok()?, day.parse().ok()?);
    if date.is_none() {
        debug!("Invalid calendar date: {:?}", text);
    }
    date
}

/// First Gregorian year of each era, minus one.
fn era_to_gregorian(era: &str, year: i32) -> Option<i32> {
    if year < 1 {
        return None;
    }
    let offset = match era {
        "令和" | "R" => 2018,
        "平成" | "H" => 1988,
        "昭和" | "S" => 1925,
        _ => return None,
    };
    Some(offset + year)
}
