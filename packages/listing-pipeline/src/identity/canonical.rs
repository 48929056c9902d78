//! URL canonicalization.
//!
//! Stored rows were written under both trailing-slash conventions, so every
//! lookup probes the raw URL plus both canonical forms.

use serde::{Deserialize, Serialize};
use url::Url;

/// A URL reduced to a comparable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalUrl {
    raw: String,
    key: String,
}

impl CanonicalUrl {
    /// Drop the query string and fragment, and normalize the trailing slash.
    ///
    /// Unparseable input is reduced by string splitting instead.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let stripped = match Url::parse(raw) {
            Ok(mut url) => {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => raw
                .split(['#', '?'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };

        Self {
            raw: raw.to_string(),
            key: stripped.trim_end_matches('/').to_string(),
        }
    }

    /// The stored comparison key (no trailing slash).
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn with_slash(&self) -> String {
        format!("{}/", self.key)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Every form a stored row might carry: raw, without and with slash.
    pub fn candidate_keys(&self) -> Vec<String> {
        let mut keys = vec![self.raw.clone()];
        for form in [self.key.clone(), self.with_slash()] {
            if !keys.contains(&form) {
                keys.push(form);
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_query_and_fragment() {
        let url = CanonicalUrl::parse("https://bringatrailer.com/listing/1967-ford-mustang/?utm_source=x#comments");
        assert_eq!(url.key(), "https://bringatrailer.com/listing/1967-ford-mustang");
        assert_eq!(url.with_slash(), "https://bringatrailer.com/listing/1967-ford-mustang/");
    }

    #[test]
    fn test_slash_conventions_share_a_key() {
        let a = CanonicalUrl::parse("https://bringatrailer.com/listing/x/");
        let b = CanonicalUrl::parse("https://bringatrailer.com/listing/x");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_candidate_keys_include_raw_and_both_forms() {
        let url = CanonicalUrl::parse("https://carsandbids.com/auctions/abc?ref=home");
        assert_eq!(
            url.candidate_keys(),
            vec![
                "https://carsandbids.com/auctions/abc?ref=home".to_string(),
                "https://carsandbids.com/auctions/abc".to_string(),
                "https://carsandbids.com/auctions/abc/".to_string(),
            ]
        );
    }

    #[test]
    fn test_unparseable_input_still_reduced() {
        let url = CanonicalUrl::parse("bringatrailer.com/listing/x/?a=1");
        assert_eq!(url.key(), "bringatrailer.com/listing/x");
    }
}
