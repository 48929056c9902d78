//! Model year recognition.

use lazy_static::lazy_static;
use regex::Regex;

/// First year a production automobile was sold.
pub const MIN_YEAR: i32 = 1885;

lazy_static! {
    static ref YEAR: Regex = Regex::new(r"\b(18[89]\d|19\d{2}|20\d{2})\b").unwrap();
    static ref LABELLED_YEAR: Regex =
        Regex::new(r"(?i)\b(?:model\s+)?year\s*[:\-]?\s*(18[89]\d|19\d{2}|20\d{2})\b").unwrap();
}

/// Whether a year falls within [1885, current_year + 1].
pub fn is_plausible_year(year: i32, current_year: i32) -> bool {
    (MIN_YEAR..=current_year + 1).contains(&year)
}

/// Leading model year of a listing title ("1967 Ford Mustang Fastback").
pub fn year_from_title(title: &str, current_year: i32) -> Option<i32> {
    YEAR.captures_iter(title)
        .filter_map(|c| c[1].parse::<i32>().ok())
        .find(|y| is_plausible_year(*y, current_year))
}

/// Model year from free text. A labelled year wins over the first bare one.
pub fn find_year(text: &str, current_year: i32) -> Option<i32> {
    LABELLED_YEAR
        .captures_iter(text)
        .filter_map(|c| c[1].parse::<i32>().ok())
        .find(|y| is_plausible_year(*y, current_year))
        .or_else(|| year_from_title(text, current_year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds() {
        assert!(is_plausible_year(1885, 2026));
        assert!(is_plausible_year(2027, 2026));
        assert!(!is_plausible_year(1884, 2026));
        assert!(!is_plausible_year(2028, 2026));
    }

    #[test]
    fn test_year_from_title() {
        assert_eq!(year_from_title("1967 Ford Mustang Fastback", 2026), Some(1967));
        assert_eq!(year_from_title("No year here", 2026), None);
    }

    #[test]
    fn test_future_year_skipped() {
        assert_eq!(year_from_title("2099 concept, really a 2004 Porsche", 2026), Some(2004));
    }

    #[test]
    fn test_labelled_year_preferred() {
        let text = "Listed 2024. Model Year: 1973 Porsche 911T";
        assert_eq!(find_year(text, 2026), Some(1973));
    }
}
