use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::types::{EntityId, RepairClaim};

/// Items shorter than this are junk fragments.
const MIN_ITEM_LEN: usize = 3;

/// Words stripped from either end of an item.
const FILLER_WORDS: &[&str] = &["and", "included", "including", "also"];

/// A shared prefix only carries over when it names one of these.
const PREFIX_KEYWORDS: &[&str] = &[
    "brake", "brakes", "rear", "front", "left", "right", "driver", "passenger", "upper", "lower",
    "inner", "outer", "wheel", "suspension",
];

lazy_static! {
    static ref TRIGGER: Regex = Regex::new(
        r"(?i)(?:work\s+)?under\s+current\s+ownership(?:\s+(?:[a-z]+\s+){0,3}?(?:included|includes|consisted\s+of|comprised))?\s*[:,]?\s*"
    )
    .unwrap();
    static ref JOINER: Regex = Regex::new(r"(?i)\s+(?:along\s+with|as\s+well\s+as|plus)\s+").unwrap();
    static ref SPLITTER: Regex = Regex::new(r"(?i)\s*(?:,|\band\b)\s*").unwrap();
}

/// One item and the sentence it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimText {
    pub item: String,
    pub evidence: String,
}

/// Splits trigger sentences into discrete work items.
#[derive(Debug, Clone, Default)]
pub struct RepairClaimExtractor;

impl RepairClaimExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Every item claimed by a description, in order, without duplicates.
    pub fn extract_claims(&self, description: &str) -> Vec<ClaimText> {
        let mut seen = HashSet::new();
        let mut claims = Vec::new();

        for trigger in TRIGGER.find_iter(description) {
            let rest = &description[trigger.end()..];
            let span = &rest[..sentence_end(rest)];
            let evidence = description[trigger.start()..trigger.end() + span.len()].trim();

            for item in split_items(span) {
                if seen.insert(item.to_lowercase()) {
                    claims.push(ClaimText {
                        item,
                        evidence: evidence.to_string(),
                    });
                }
            }
        }

        claims
    }

    /// Claims keyed for one vehicle and canonical source URL.
    pub fn claims_for(
        &self,
        entity_id: EntityId,
        canonical_url: &str,
        description: &str,
    ) -> Vec<RepairClaim> {
        self.extract_claims(description)
            .into_iter()
            .map(|c| RepairClaim::new(entity_id, canonical_url, c.item, c.evidence))
            .collect()
    }
}

/// Byte offset of the first sentence terminator.
///
/// A period only ends a sentence when followed by whitespace or the end of
/// input, so "2.0-liter" stays intact.
fn sentence_end(text: &str) -> usize {
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            ';' | '!' | '?' | '\n' => return i,
            '.' => match chars.peek() {
                None => return i,
                Some((_, next)) if next.is_whitespace() => return i,
                _ => {}
            },
            _ => {}
        }
    }
    text.len()
}

fn split_items(span: &str) -> Vec<String> {
    let joined = JOINER.replace_all(span, ", ");

    let mut items = Vec::new();
    let mut prefix: Option<String> = None;
    for token in SPLITTER.split(&joined) {
        let Some(item) = clean(token) else {
            continue;
        };

        let words: Vec<&str> = item.split_whitespace().collect();
        let item = if words.len() > 1 {
            let head = words[..words.len() - 1].join(" ");
            prefix = has_keyword(&head).then_some(head);
            item
        } else {
            match &prefix {
                Some(p) => format!("{} {}", p, item),
                None => item,
            }
        };
        items.push(item);
    }
    items
}

fn clean(token: &str) -> Option<String> {
    let mut words: Vec<&str> = token
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();

    while words.first().is_some_and(|w| is_filler(w)) {
        words.remove(0);
    }
    while words.last().is_some_and(|w| is_filler(w)) {
        words.pop();
    }

    let item = words.join(" ");
    (item.len() >= MIN_ITEM_LEN).then_some(item)
}

fn is_filler(word: &str) -> bool {
    FILLER_WORDS.iter().any(|f| f.eq_ignore_ascii_case(word))
}

fn has_keyword(prefix: &str) -> bool {
    prefix
        .split_whitespace()
        .any(|w| PREFIX_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(w)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(text: &str) -> Vec<String> {
        RepairClaimExtractor::new()
            .extract_claims(text)
            .into_iter()
            .map(|c| c.item)
            .collect()
    }

    #[test]
    fn test_prefix_carries_to_bare_items() {
        assert_eq!(
            items("Work under current ownership included rear brake calipers, rotors, and pads."),
            vec!["rear brake calipers", "rear brake rotors", "rear brake pads"]
        );
    }

    #[test]
    fn test_prefix_needs_keyword() {
        assert_eq!(
            items("Work under current ownership included a new clutch, battery, and tires."),
            vec!["a new clutch", "battery", "tires"]
        );
    }

    #[test]
    fn test_new_multiword_item_resets_prefix() {
        assert_eq!(
            items("Work under current ownership included front brake pads, rotors, a water pump, and belts."),
            vec!["front brake pads", "front brake rotors", "a water pump", "belts"]
        );
    }

    #[test]
    fn test_joiners_become_separators() {
        assert_eq!(
            items("Under current ownership the seller replaced the fuel pump along with the filter as well as new spark plugs."),
            vec!["the seller replaced the fuel pump", "the filter", "new spark plugs"]
        );
    }

    #[test]
    fn test_span_stops_at_sentence_end() {
        let claims = RepairClaimExtractor::new().extract_claims(
            "Finished in red. Work under current ownership included a 2.0-liter engine rebuild and new hoses. \
             The car is offered with a clean title.",
        );
        let items: Vec<&str> = claims.iter().map(|c| c.item.as_str()).collect();
        assert_eq!(items, vec!["a 2.0-liter engine rebuild", "new hoses"]);
        assert_eq!(
            claims[0].evidence,
            "Work under current ownership included a 2.0-liter engine rebuild and new hoses"
        );
    }

    #[test]
    fn test_words_between_trigger_and_verb() {
        assert_eq!(
            items("Work under current ownership reportedly included rear brake calipers, rotors, and pads."),
            vec!["rear brake calipers", "rear brake rotors", "rear brake pads"]
        );
        assert_eq!(
            items("Under current ownership the car has included a new clutch."),
            vec!["a new clutch"]
        );
    }

    #[test]
    fn test_no_trigger_no_claims() {
        assert!(items("Recent service included an oil change.").is_empty());
    }

    #[test]
    fn test_duplicate_items_collapse() {
        assert_eq!(
            items("Work under current ownership included new tires. Under current ownership included New Tires and a battery."),
            vec!["new tires", "a battery"]
        );
    }
}
