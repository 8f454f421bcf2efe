//! Common regex patterns for normalizing extracted invoice fields.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Compact dates: 20240703
    pub static ref DATE_COMPACT: Regex = Regex::new(
        r"^(\d{4})(\d{2})(\d{2})$"
    ).unwrap();

    // Separated dates: 2024-07-03, 2024/7/3, 2024.07.03
    pub static ref DATE_SEPARATED: Regex = Regex::new(
        r"^(\d{4})\s*[-/.]\s*(\d{1,2})\s*[-/.]\s*(\d{1,2})$"
    ).unwrap();

    // Kanji dates: 2024年7月3日
    pub static ref DATE_KANJI: Regex = Regex::new(
        r"^(\d{4})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日?$"
    ).unwrap();

    // Era dates: 令和6年7月3日, 令和元年5月1日, 平成31年4月30日
    pub static ref DATE_ERA_KANJI: Regex = Regex::new(
        r"^(令和|平成|昭和)\s*(元|\d{1,2})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日?$"
    ).unwrap();

    // Abbreviated era dates: R6.7.3, H31/4/30
    pub static ref DATE_ERA_SHORT: Regex = Regex::new(
        r"(?i)^([RHS])\s*(\d{1,2})\s*[-/.]\s*(\d{1,2})\s*[-/.]\s*(\d{1,2})$"
    ).unwrap();

    // Amount strings: optional currency mark, digits with grouping, optional fraction
    pub static ref AMOUNT_TEXT: Regex = Regex::new(
        r"^(?:¥|￥|\\|JPY)?\s*(-?\d{1,3}(?:[,，\s\u{00a0}]\d{3})*|-?\d+)(?:\.(\d+))?\s*(?:円|JPY)?(?:\s*[(（]税込[)）])?$"
    ).unwrap();

    // Honorifics appended to a counter-party name
    pub static ref PARTNER_HONORIFIC: Regex = Regex::new(
        r"\s*(?:御中|様|殿)\s*$"
    ).unwrap();

    // Qualified invoice registration number: T + at least 8 alphanumerics
    pub static ref REGISTRATION_NUMBER: Regex = Regex::new(
        r"^T[0-9A-Z]{8,}$"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile_and_anchor() {
        assert!(DATE_COMPACT.is_match("20240703"));
        assert!(!DATE_COMPACT.is_match("2024070"));
        assert!(DATE_SEPARATED.is_match("2024/7/3"));
        assert!(DATE_KANJI.is_match("2024年7月3日"));
        assert!(DATE_ERA_KANJI.is_match("令和元年5月1日"));
        assert!(DATE_ERA_SHORT.is_match("R6.7.3"));
        assert!(AMOUNT_TEXT.is_match("¥1,234"));
        assert!(AMOUNT_TEXT.is_match("1,234円"));
        assert!(!AMOUNT_TEXT.is_match("about 1000"));
        assert!(REGISTRATION_NUMBER.is_match("T1234567890123"));
        assert!(!REGISTRATION_NUMBER.is_match("1234567890123"));
    }
}
