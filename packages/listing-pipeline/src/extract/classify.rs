//! Page classification: single listing, directory, or neither.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::types::{CandidateRecord, ExtractionTier, Field, FetchedContent, PageKind};

/// Path fragments of per-vehicle pages across supported platforms.
const LISTING_PATH_HINTS: &[&str] = &[
    "/listing/", "/auctions/", "/auction/", "/lot/", "/lots/", "/vehicle/", "/vehicles/",
    "/itm/", "/cto/", "/inventory/",
];

/// Path fragments of search and index pages.
const DIRECTORY_PATH_HINTS: &[&str] = &[
    "/search", "/results", "/category", "/categories", "/make/", "/models/", "/browse",
];

/// Distinct listing links that make a page a directory on their own.
const DIRECTORY_LINK_THRESHOLD: usize = 12;

/// Lower threshold when the URL itself looks like an index page.
const DIRECTORY_PATH_LINK_THRESHOLD: usize = 3;

fn listing_links(document: &Html, page: &Url) -> usize {
    let Ok(selector) = Selector::parse("a[href]") else {
        return 0;
    };
    let own_path = page.path().trim_end_matches('/');

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page.join(href).ok())
        .filter(|url| url.host_str() == page.host_str())
        .map(|url| url.path().trim_end_matches('/').to_string())
        .filter(|path| path != own_path)
        .filter(|path| LISTING_PATH_HINTS.iter().any(|hint| path.contains(hint)))
        .collect::<HashSet<_>>()
        .len()
}

fn has_item_list(html: &str) -> bool {
    html.contains("\"ItemList\"") || html.contains("\"@type\":\"SearchResultsPage\"")
}

fn is_directory_path(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    url.query().is_some_and(|q| q.contains("q=") || q.contains("search"))
        || DIRECTORY_PATH_HINTS.iter().any(|hint| path.contains(hint))
        || path.trim_end_matches('/').is_empty()
}

/// Classify fetched content, using the extracted record as evidence.
pub fn classify(content: &FetchedContent, record: &CandidateRecord) -> PageKind {
    let page = Url::parse(content.effective_url()).ok();

    if let (Some(html), Some(page)) = (content.html.as_deref(), page.as_ref()) {
        let document = Html::parse_document(html);
        let links = listing_links(&document, page);
        let directory_url = is_directory_path(page);

        let has_own_vin = record.vin().is_some();
        if has_item_list(html)
            || (directory_url && links >= DIRECTORY_PATH_LINK_THRESHOLD)
            || (!has_own_vin && links >= DIRECTORY_LINK_THRESHOLD && record.fields().title.is_none())
        {
            return PageKind::Directory;
        }
    }

    let extracted = record.fields_extracted();
    let identified = extracted.contains(&Field::Vin)
        || (extracted.contains(&Field::Year) && extracted.contains(&Field::Make))
        || record.tier() == ExtractionTier::Structured;

    if identified {
        PageKind::SingleListing
    } else {
        PageKind::Unrecognized
    }
}
