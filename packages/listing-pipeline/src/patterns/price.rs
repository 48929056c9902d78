//! Price recognition. Amounts are whole dollars.

use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_PRICE: i64 = 500;
pub const MAX_PRICE: i64 = 50_000_000;

lazy_static! {
    static ref LABELLED_PRICE: Regex = Regex::new(
        r"(?i)\b(?:sold\s+for|winning\s+bid|high\s+bid|current\s+bid|bid\s+to|asking(?:\s+price)?|price|hammer)\s*(?:of|:)?\s*(?:USD\s*)?\$\s*(\d[\d,]*(?:\.\d+)?)\s*([km])?\b"
    ).unwrap();

    static ref DOLLAR_AMOUNT: Regex =
        Regex::new(r"(?i)\$\s*(\d[\d,]*(?:\.\d+)?)\s*([km])?\b").unwrap();
}

pub fn is_plausible_price(price: i64) -> bool {
    (MIN_PRICE..=MAX_PRICE).contains(&price)
}

/// Parse "75,000", "75k" or "1.2m" into whole dollars.
pub fn parse_amount(digits: &str, suffix: Option<&str>) -> Option<i64> {
    let value: f64 = digits.replace(',', "").parse().ok()?;
    let multiplier = match suffix.map(|s| s.to_ascii_lowercase()) {
        Some(s) if s == "k" => 1_000.0,
        Some(s) if s == "m" => 1_000_000.0,
        _ => 1.0,
    };
    let amount = (value * multiplier).round();
    if amount.is_finite() && amount >= 0.0 && amount <= i64::MAX as f64 {
        Some(amount as i64)
    } else {
        None
    }
}

fn candidates(re: &Regex, text: &str) -> Option<i64> {
    re.captures_iter(text)
        .filter_map(|c| parse_amount(&c[1], c.get(2).map(|m| m.as_str())))
        .find(|p| is_plausible_price(*p))
}

/// Price from free text. Labelled amounts win over bare dollar figures.
pub fn find_price(text: &str) -> Option<i64> {
    candidates(&LABELLED_PRICE, text).or_else(|| candidates(&DOLLAR_AMOUNT, text))
}
