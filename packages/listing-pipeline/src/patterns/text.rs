//! HTML reduction helpers: visible text, title, description and images.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

const SKIPPED_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Substrings of image URLs that are never listing photos.
const IMAGE_NOISE: &[&str] = &[
    "logo", "icon", "avatar", "sprite", "placeholder", "favicon", "badge", "pixel", "tracking",
];

/// Selectors for the listing's own description, most specific first.
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".post-excerpt",
    "#postingbody",
    "[itemprop='description']",
    ".listing-description",
    ".vehicle-description",
    ".detail-section.description",
    "article",
];

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    let lines: Vec<String> = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED_TEXT_PARENTS.contains(&e.name()))
            });
            if hidden {
                return None;
            }
            let line = collapse_whitespace(text);
            (!line.is_empty()).then_some(line)
        })
        .collect();
    lines.join("\n")
}

/// Visible text of a document, one text node per line.
pub fn visible_text(document: &Html) -> String {
    match select_first(document, "body") {
        Some(body) => element_text(body),
        None => element_text(document.root_element()),
    }
}

/// Content of a `<meta property=..>` or `<meta name=..>` tag.
pub fn meta_content(document: &Html, key: &str) -> Option<String> {
    let selector = format!("meta[property='{key}'], meta[name='{key}']");
    select_first(document, &selector)
        .and_then(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .filter(|v| !v.is_empty())
}

/// Listing title: og:title, then the first h1, then `<title>`.
pub fn page_title(document: &Html) -> Option<String> {
    meta_content(document, "og:title")
        .or_else(|| {
            select_first(document, "h1")
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        })
        .or_else(|| {
            select_first(document, "title")
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .filter(|t| !t.is_empty())
        })
}

/// The listing's own description block, falling back to meta description.
pub fn description(document: &Html) -> Option<String> {
    DESCRIPTION_SELECTORS
        .iter()
        .filter_map(|s| select_first(document, s))
        .map(|el| collapse_whitespace(&element_text(el)))
        .find(|text| text.len() >= 40)
        .or_else(|| meta_content(document, "og:description"))
        .or_else(|| meta_content(document, "description"))
}

/// Title from markdown or plain text: the first heading, else the first line.
pub fn text_title(text: &str) -> Option<String> {
    let lines = || text.lines().map(str::trim).filter(|l| !l.is_empty());
    lines()
        .find(|l| l.starts_with('#'))
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .or_else(|| lines().next().map(|l| l.chars().take(200).collect()))
        .filter(|t: &String| !t.is_empty())
}

fn is_listing_image(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    (url.scheme() == "http" || url.scheme() == "https")
        && !path.ends_with(".svg")
        && !path.ends_with(".gif")
        && !IMAGE_NOISE.iter().any(|n| path.contains(n))
}

/// Absolute photo URLs in document order, og:image first, deduplicated.
pub fn image_urls(document: &Html, base: &Url) -> Vec<String> {
    let mut raw: Vec<String> = Vec::new();
    if let Some(og) = meta_content(document, "og:image") {
        raw.push(og);
    }

    if let Ok(selector) = Selector::parse("img") {
        for img in document.select(&selector) {
            let attrs = img.value();
            let src = attrs
                .attr("data-src")
                .or_else(|| attrs.attr("data-lazy-src"))
                .or_else(|| attrs.attr("src"))
                .or_else(|| {
                    attrs
                        .attr("srcset")
                        .and_then(|s| s.split(',').next())
                        .and_then(|s| s.split_whitespace().next())
                });
            if let Some(src) = src {
                raw.push(src.trim().to_string());
            }
        }
    }

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|src| !src.starts_with("data:"))
        .filter_map(|src| base.join(&src).ok())
        .filter(is_listing_image)
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Convert HTML to markdown, falling back to stripped text.
pub fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|_| visible_text(&Html::parse_document(html)))
}
