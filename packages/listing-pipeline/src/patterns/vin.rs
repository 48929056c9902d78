//! VIN recognition.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    // "VIN: 1FAFP404X1F123456", "Chassis #WP0AB0916...", "Serial No. ..."
    static ref LABELLED_VIN: Regex = Regex::new(
        r"(?i)\b(?:VIN|chassis|serial)(?:\s*(?:number|no\.?|#))?\s*[:#]?\s*([A-HJ-NPR-Z0-9]{17})\b"
    ).unwrap();

    static ref GENERIC_VIN: Regex = Regex::new(r"\b[A-HJ-NPR-Z0-9]{17}\b").unwrap();
}

const VIN_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKLMNPRSTUVWXYZ";

/// Whether a 17-character token is a plausible VIN.
///
/// Rejects I/O/Q, single-character repeats, straight ascending runs and
/// tokens without both letters and digits (hashes and part numbers).
pub fn is_valid_vin(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != 17 {
        return false;
    }
    if !bytes
        .iter()
        .all(|b| b.is_ascii_digit() || (b.is_ascii_uppercase() && !matches!(b, b'I' | b'O' | b'Q')))
    {
        return false;
    }
    if bytes.iter().all(|b| *b == bytes[0]) {
        return false;
    }
    if is_ascending_run(bytes) {
        return false;
    }

    let has_digit = bytes.iter().any(u8::is_ascii_digit);
    let has_letter = bytes.iter().any(u8::is_ascii_uppercase);
    has_digit && has_letter
}

fn is_ascending_run(bytes: &[u8]) -> bool {
    // 0123456789ABCDEFG... in VIN alphabet order, or wrapping digits 1234567890123...
    let positions: Vec<Option<usize>> = bytes
        .iter()
        .map(|b| VIN_ALPHABET.iter().position(|a| a == b))
        .collect();
    let sequential = positions
        .windows(2)
        .all(|w| matches!((w[0], w[1]), (Some(a), Some(b)) if b == a + 1));
    let digit_wrap = bytes.iter().all(u8::is_ascii_digit)
        && bytes
            .windows(2)
            .all(|w| (w[0] - b'0' + 1) % 10 == w[1] - b'0');
    sequential || digit_wrap
}

/// Find the most trustworthy VIN in a document.
///
/// A labelled VIN wins over any unlabelled token. Among unlabelled tokens
/// the most frequent one wins, ties going to the first occurrence.
pub fn find_vin(text: &str) -> Option<String> {
    if let Some(vin) = LABELLED_VIN
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
        .find(|v| is_valid_vin(v))
    {
        return Some(vin);
    }

    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, token) in GENERIC_VIN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|t| is_valid_vin(t))
        .enumerate()
    {
        let entry = counts.entry(token).or_insert((0, position));
        entry.0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(token, _)| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_vins_rejected() {
        assert!(!is_valid_vin("11111111111111111"));
        assert!(!is_valid_vin("AAAAAAAAAAAAAAAAA"));
        assert!(!is_valid_vin("12345678901234567"));
        assert!(!is_valid_vin("0123456789ABCDEFG"));
        assert!(!is_valid_vin("1FAFP404X1F12345"));
        assert!(!is_valid_vin("1FAFP404O1F123456"));
    }

    #[test]
    fn test_real_vin_accepted() {
        assert!(is_valid_vin("1FAFP404X1F123456"));
        assert!(is_valid_vin("WP0AB0916KS121279"));
    }

    #[test]
    fn test_labelled_vin_preferred_over_decoy() {
        let text = "Tracking ref ZZ9Z9ZZ9Z9ZZ9Z9ZZ appears in the footer. \
                    ZZ9Z9ZZ9Z9ZZ9Z9ZZ again. VIN: 1FAFP404X1F123456";
        assert_eq!(find_vin(text).as_deref(), Some("1FAFP404X1F123456"));
    }

    #[test]
    fn test_degenerate_label_falls_through() {
        let text = "VIN: 11111111111111111 chassis WP0AB0916KS121279";
        assert_eq!(find_vin(text).as_deref(), Some("WP0AB0916KS121279"));
    }

    #[test]
    fn test_most_frequent_generic_wins() {
        let text = "WP0AB0916KS121279 listed. Compare JH4DA9350LS000001. \
                    Carfax for JH4DA9350LS000001 is clean.";
        assert_eq!(find_vin(text).as_deref(), Some("JH4DA9350LS000001"));
    }

    #[test]
    fn test_generic_tie_goes_to_first() {
        let text = "WP0AB0916KS121279 and JH4DA9350LS000001";
        assert_eq!(find_vin(text).as_deref(), Some("WP0AB0916KS121279"));
    }

    #[test]
    fn test_no_vin() {
        assert_eq!(find_vin("a clean 1967 Mustang"), None);
    }
}
