//! Odometer reading recognition.

use lazy_static::lazy_static;
use regex::Regex;

pub const MAX_MILEAGE: i64 = 1_000_000;

lazy_static! {
    static ref LABELLED_MILEAGE: Regex = Regex::new(
        r"(?i)\b(?:mileage|odometer|miles)\s*[:\-]\s*(\d[\d,]*)\s*(k)?\b"
    ).unwrap();

    // "45k miles", "12,345 mi", "~38,000 indicated miles"
    static ref MILES: Regex = Regex::new(
        r"(?i)(\d[\d,]*(?:\.\d)?)\s*(k)?\s+(?:indicated\s+|actual\s+|original\s+)?(?:miles|mi)\b"
    ).unwrap();
}

/// Mileage must be within (0, 1,000,000).
pub fn is_plausible_mileage(miles: i64) -> bool {
    miles > 0 && miles < MAX_MILEAGE
}

fn parse_miles(digits: &str, thousands: bool) -> Option<i64> {
    let value: f64 = digits.replace(',', "").parse().ok()?;
    let value = if thousands { value * 1_000.0 } else { value };
    if value.is_finite() && value >= 0.0 && value < i64::MAX as f64 {
        Some(value.round() as i64)
    } else {
        None
    }
}

fn candidates(re: &Regex, text: &str) -> Option<i64> {
    re.captures_iter(text)
        .filter_map(|c| parse_miles(&c[1], c.get(2).is_some()))
        .find(|m| is_plausible_mileage(*m))
}

pub fn find_mileage(text: &str) -> Option<i64> {
    candidates(&LABELLED_MILEAGE, text).or_else(|| candidates(&MILES, text))
}
