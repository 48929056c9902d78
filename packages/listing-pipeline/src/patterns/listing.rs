//! Auction metadata: lot number and sale outcome.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::SaleStatus;

lazy_static! {
    static ref LOT_NUMBER: Regex =
        Regex::new(r"(?i)\blot\s*(?:#|no\.?|number)?\s*:?\s*#?\s*([A-Z]?\d{1,6}(?:\.\d{1,2})?[A-Z]?)\b")
            .unwrap();

    static ref NOT_SOLD: Regex =
        Regex::new(r"(?i)\b(?:not\s+sold|reserve\s+not\s+met|no\s+sale|withdrawn)\b").unwrap();
    static ref SOLD: Regex = Regex::new(r"(?i)\bsold\s+(?:for|at)\b").unwrap();
    static ref BID_TO: Regex = Regex::new(r"(?i)\bbid\s+to\b").unwrap();
    static ref LIVE: Regex = Regex::new(
        r"(?i)\b(?:place\s+(?:a\s+)?bid|auction\s+ends|time\s+left|ends\s+in)\b"
    ).unwrap();
}

/// "Lot #S123" → "S123".
pub fn find_lot_number(text: &str) -> Option<String> {
    LOT_NUMBER
        .captures(text)
        .map(|c| c[1].to_uppercase())
}

/// Auction outcome. A negative outcome is checked before "sold".
pub fn find_sale_status(text: &str) -> Option<SaleStatus> {
    if NOT_SOLD.is_match(text) {
        Some(SaleStatus::NotSold)
    } else if SOLD.is_match(text) {
        Some(SaleStatus::Sold)
    } else if BID_TO.is_match(text) {
        Some(SaleStatus::BidTo)
    } else if LIVE.is_match(text) {
        Some(SaleStatus::Live)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lot_number() {
        assert_eq!(find_lot_number("Lot #123 · 1967 Ford Mustang").as_deref(), Some("123"));
        assert_eq!(find_lot_number("LOT S104.1 Kissimmee").as_deref(), Some("S104.1"));
        assert_eq!(find_lot_number("a lot of patina"), None);
    }

    #[test]
    fn test_sale_status() {
        assert_eq!(find_sale_status("Sold for $42,500"), Some(SaleStatus::Sold));
        assert_eq!(find_sale_status("Bid to $30,000, reserve not met"), Some(SaleStatus::NotSold));
        assert_eq!(find_sale_status("Bid to $30,000"), Some(SaleStatus::BidTo));
        assert_eq!(find_sale_status("Place bid now"), Some(SaleStatus::Live));
        assert_eq!(find_sale_status("1967 Ford Mustang"), None);
    }
}
