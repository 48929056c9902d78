//! Make and model recognition.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

const MAKES: &[&str] = &[
    "Acura", "Alfa Romeo", "AMC", "Aston Martin", "Audi", "Austin-Healey", "Bentley", "BMW",
    "Bugatti", "Buick", "Cadillac", "Chevrolet", "Chrysler", "Citroen", "Datsun", "De Tomaso",
    "DeLorean", "Dodge", "Ferrari", "Fiat", "Ford", "GMC", "Honda", "Hummer", "Hyundai",
    "Infiniti", "International Harvester", "Jaguar", "Jeep", "Jensen", "Kia", "Lamborghini",
    "Lancia", "Land Rover", "Lexus", "Lincoln", "Lotus", "Maserati", "Mazda", "McLaren",
    "Mercedes-Benz", "Mercury", "MG", "Mini", "Mitsubishi", "Nissan", "Oldsmobile", "Opel",
    "Packard", "Plymouth", "Pontiac", "Porsche", "Ram", "Range Rover", "Rivian", "Rolls-Royce",
    "Saab", "Saturn", "Shelby", "Studebaker", "Subaru", "Sunbeam", "Suzuki", "Tesla", "Toyota",
    "Triumph", "TVR", "Volkswagen", "Volvo",
];

const ALIASES: &[(&str, &str)] = &[
    ("chevy", "Chevrolet"),
    ("vw", "Volkswagen"),
    ("mercedes", "Mercedes-Benz"),
    ("mercedes benz", "Mercedes-Benz"),
    ("benz", "Mercedes-Benz"),
    ("alfa", "Alfa Romeo"),
    ("rolls royce", "Rolls-Royce"),
    ("austin healey", "Austin-Healey"),
    ("land-rover", "Land Rover"),
    ("range-rover", "Range Rover"),
    ("ih", "International Harvester"),
    ("lambo", "Lamborghini"),
];

/// Words that end a model name in a listing title.
const BOILERPLATE: &[&str] = &[
    "for sale",
    "listing",
    "auction",
    "no reserve",
    "sold",
    "|",
    " - ",
    " – ",
    " on ",
    " at ",
    ",",
    "(",
];

const MAX_MODEL_WORDS: usize = 6;

lazy_static! {
    static ref CANONICAL: HashMap<String, &'static str> = {
        let mut map: HashMap<String, &'static str> =
            MAKES.iter().map(|m| (m.to_lowercase(), *m)).collect();
        for (alias, make) in ALIASES {
            map.insert(alias.to_string(), *make);
        }
        map
    };

    // Longest names first so "Land Rover" wins over a shorter overlapping name.
    static ref MAKE: Regex = {
        let mut names: Vec<String> = CANONICAL.keys().cloned().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b({alternation})\b")).unwrap()
    };
}

/// Canonical manufacturer name for a make or alias, if known.
pub fn normalize_make(name: &str) -> Option<&'static str> {
    CANONICAL.get(&name.trim().to_lowercase()).copied()
}

/// First manufacturer named in the text.
pub fn find_make(text: &str) -> Option<String> {
    MAKE.captures_iter(text)
        .filter_map(|c| normalize_make(&c[1]))
        .map(str::to_string)
        .next()
}

/// Model from a title, read from the words right after "<year> <make>".
///
/// Only attempted when year and make are already known.
pub fn model_from_title(title: &str, year: i32, make: &str) -> Option<String> {
    let year = year.to_string();
    let target = normalize_make(make).unwrap_or(make);

    MAKE.captures_iter(title)
        .filter_map(|c| c.get(1))
        .find(|m| {
            normalize_make(m.as_str()) == Some(target)
                && title[..m.start()].trim_end().ends_with(&year)
        })
        .and_then(|m| trim_model(&title[m.end()..]))
}

fn trim_model(raw: &str) -> Option<String> {
    let lower = raw.to_ascii_lowercase();
    let cut = BOILERPLATE
        .iter()
        .filter_map(|b| lower.find(b))
        .min()
        .unwrap_or(raw.len());

    let model = raw[..cut]
        .split_whitespace()
        .take(MAX_MODEL_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let model = model.trim_matches(|c: char| !c.is_alphanumeric());
    (!model.is_empty()).then(|| model.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_make_wins() {
        assert_eq!(find_make("2015 Land Rover Defender").as_deref(), Some("Land Rover"));
        assert_eq!(find_make("1989 Aston Martin V8 Vantage").as_deref(), Some("Aston Martin"));
    }

    #[test]
    fn test_aliases_normalize() {
        assert_eq!(find_make("1969 chevy c10").as_deref(), Some("Chevrolet"));
        assert_eq!(find_make("1972 VW Beetle").as_deref(), Some("Volkswagen"));
    }

    #[test]
    fn test_make_needs_word_boundary() {
        assert_eq!(find_make("Fordham road trip"), None);
    }

    #[test]
    fn test_model_after_year_and_make() {
        assert_eq!(
            model_from_title("1967 Ford Mustang Fastback for sale on BaT", 1967, "Ford").as_deref(),
            Some("Mustang Fastback")
        );
        assert_eq!(
            model_from_title("No Reserve: 1995 Porsche 911 Carrera | Bring a Trailer", 1995, "Porsche")
                .as_deref(),
            Some("911 Carrera")
        );
    }

    #[test]
    fn test_model_through_alias() {
        assert_eq!(
            model_from_title("1969 Chevy C10 Pickup - Auction", 1969, "Chevrolet").as_deref(),
            Some("C10 Pickup")
        );
    }

    #[test]
    fn test_model_requires_year_make_sequence() {
        assert_eq!(model_from_title("Ford Mustang 1967", 1967, "Ford"), None);
    }
}
