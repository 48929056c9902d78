//! Colors, transmission, drivetrain and body style.

use lazy_static::lazy_static;
use regex::Regex;

const COLORS: &[&str] = &[
    "black", "white", "silver", "gray", "grey", "red", "blue", "green", "yellow", "orange",
    "brown", "beige", "tan", "gold", "maroon", "burgundy", "purple", "cream", "ivory",
    "bronze", "champagne", "charcoal", "copper", "teal",
];

/// Body styles in the order they are tried. Specific before general.
const BODY_STYLES: &[(&str, &str)] = &[
    ("cabriolet", "Cabriolet"),
    ("convertible", "Convertible"),
    ("roadster", "Roadster"),
    ("speedster", "Speedster"),
    ("targa", "Targa"),
    ("fastback", "Fastback"),
    ("hatchback", "Hatchback"),
    ("station wagon", "Wagon"),
    ("wagon", "Wagon"),
    ("coupe", "Coupe"),
    ("sedan", "Sedan"),
    ("pickup", "Pickup"),
    ("truck", "Pickup"),
    ("suv", "SUV"),
    ("van", "Van"),
];

lazy_static! {
    static ref EXTERIOR_LABEL: Regex =
        Regex::new(r"(?im)\b(?:exterior(?:\s+colou?r)?|paint(?:\s+colou?r)?)\s*:\s*([^\n|]{2,40})")
            .unwrap();
    static ref INTERIOR_LABEL: Regex =
        Regex::new(r"(?im)\binterior(?:\s+colou?r)?\s*:\s*([^\n|]{2,40})").unwrap();

    // "finished in Guards Red over black leather"
    static ref FINISHED_IN: Regex = Regex::new(
        r"(?i)\b(?:finished|painted|refinished)\s+in\s+([A-Za-z][A-Za-z \-]{1,40}?)\s+over\s+(?:an?\s+)?([A-Za-z][A-Za-z \-]{1,30}?)\s+(?:leather|interior|upholstery|vinyl|cloth|leatherette|alcantara|houndstooth|velour|seats)\b"
    ).unwrap();

    static ref COLOR_OVER_COLOR: Regex = {
        let colors = COLORS.join("|");
        Regex::new(&format!(
            r"(?i)\b((?:[A-Za-z]+\s+)?(?:{colors}))\s+over\s+((?:[A-Za-z]+\s+)?(?:{colors}))\b"
        ))
        .unwrap()
    };

    static ref TRANSMISSION_LABEL: Regex =
        Regex::new(r"(?im)\btransmission\s*:\s*([^\n|]{2,60})").unwrap();
    static ref SPEED_COUNT: Regex = Regex::new(
        r"(?i)\b(\d{1,2}|four|five|six|seven|eight)[\s\-]speed\s+(manual|automatic|auto|dual[\s\-]clutch|pdk|sequential)\b"
    ).unwrap();
    static ref BARE_TRANSMISSION: Regex = Regex::new(
        r"(?i)\b(manual\s+(?:transmission|gearbox|transaxle)|automatic\s+(?:transmission|transaxle)|pdk|dual[\s\-]clutch|dct|cvt|tiptronic)\b"
    ).unwrap();

    static ref DRIVETRAIN: Regex = Regex::new(
        r"(?i)\b(all[\s\-]wheel[\s\-]drive|awd|quattro|4matic|xdrive|four[\s\-]wheel[\s\-]drive|4wd|4x4|rear[\s\-]wheel[\s\-]drive|rwd|front[\s\-]wheel[\s\-]drive|fwd)\b"
    ).unwrap();

    static ref BODY_LABEL: Regex =
        Regex::new(r"(?im)\bbody\s*(?:style|type)?\s*:\s*([^\n|]{2,30})").unwrap();
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn clean_value(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_end_matches(['.', ',', ';']).trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Exterior and interior colors.
pub fn find_colors(text: &str) -> (Option<String>, Option<String>) {
    let mut exterior = EXTERIOR_LABEL
        .captures(text)
        .and_then(|c| clean_value(&c[1]));
    let mut interior = INTERIOR_LABEL
        .captures(text)
        .and_then(|c| clean_value(&c[1]));

    if exterior.is_none() || interior.is_none() {
        let over = FINISHED_IN
            .captures(text)
            .or_else(|| COLOR_OVER_COLOR.captures(text));
        if let Some(c) = over {
            if exterior.is_none() {
                exterior = clean_value(&c[1]).map(|v| title_case(&v));
            }
            if interior.is_none() {
                interior = clean_value(&c[2]).map(|v| title_case(&v));
            }
        }
    }

    (exterior, interior)
}

fn speed_number(word: &str) -> String {
    match word.to_ascii_lowercase().as_str() {
        "four" => "4".into(),
        "five" => "5".into(),
        "six" => "6".into(),
        "seven" => "7".into(),
        "eight" => "8".into(),
        other => other.to_string(),
    }
}

fn normalize_gearbox(kind: &str) -> String {
    let lower = kind.to_ascii_lowercase();
    if lower.starts_with("manual") {
        "Manual".into()
    } else if lower.starts_with("auto") || lower == "tiptronic" || lower == "cvt" {
        "Automatic".into()
    } else if lower == "pdk" {
        "PDK".into()
    } else {
        "Dual-Clutch".into()
    }
}

/// Transmission, normalized to forms like "5-Speed Manual" or "Automatic".
pub fn find_transmission(text: &str) -> Option<String> {
    if let Some(c) = SPEED_COUNT.captures(text) {
        return Some(format!("{}-Speed {}", speed_number(&c[1]), normalize_gearbox(&c[2])));
    }
    if let Some(value) = TRANSMISSION_LABEL.captures(text).and_then(|c| clean_value(&c[1])) {
        return Some(value);
    }
    BARE_TRANSMISSION
        .captures(text)
        .map(|c| normalize_gearbox(&c[1]))
}

/// Drivetrain as one of AWD, 4WD, RWD, FWD.
pub fn find_drivetrain(text: &str) -> Option<String> {
    let found = DRIVETRAIN.captures(text)?;
    let lower = found[1].to_ascii_lowercase().replace(['-', ' '], "");
    let normalized = match lower.as_str() {
        "allwheeldrive" | "awd" | "quattro" | "4matic" | "xdrive" => "AWD",
        "fourwheeldrive" | "4wd" | "4x4" => "4WD",
        "rearwheeldrive" | "rwd" => "RWD",
        _ => "FWD",
    };
    Some(normalized.to_string())
}

/// Body style, preferring a labelled value, then the title, then free text.
pub fn find_body_style(title: Option<&str>, text: &str) -> Option<String> {
    if let Some(value) = BODY_LABEL.captures(text).and_then(|c| clean_value(&c[1])) {
        if let Some(style) = match_body_style(&value) {
            return Some(style);
        }
    }
    title.and_then(match_body_style).or_else(|| match_body_style(text))
}

fn match_body_style(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    BODY_STYLES
        .iter()
        .find(|(needle, _)| contains_word(&lower, needle))
        .map(|(_, style)| style.to_string())
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
