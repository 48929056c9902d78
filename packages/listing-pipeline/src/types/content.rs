//! Fetched page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::attempt::FetchStrategy;

/// Form of the primary text payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Html,
    Markdown,
    PlainText,
}

/// Page content obtained by one fetch strategy.
///
/// `html` is the raw markup when the strategy had it; `text` is always a
/// readable reduction of the page suitable for pattern matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedContent {
    /// URL that was requested
    pub url: String,
    /// URL after redirects, when known
    pub final_url: Option<String>,
    pub html: Option<String>,
    pub text: String,
    pub kind: ContentKind,
    pub strategy: FetchStrategy,
    pub status: Option<u16>,
    pub title: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedContent {
    pub fn new(url: impl Into<String>, text: impl Into<String>, strategy: FetchStrategy) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            html: None,
            text: text.into(),
            kind: ContentKind::PlainText,
            strategy,
            status: None,
            title: None,
            fetched_at: Utc::now(),
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self.kind = ContentKind::Html;
        self
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_final_url(mut self, url: impl Into<String>) -> Self {
        self.final_url = Some(url.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Raw markup if present, otherwise the text payload.
    pub fn raw(&self) -> &str {
        self.html.as_deref().unwrap_or(&self.text)
    }

    /// Whether the payload carries any visible text.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// The URL to treat as the page's address (after redirects).
    pub fn effective_url(&self) -> &str {
        self.final_url.as_deref().unwrap_or(&self.url)
    }
}

/// What kind of page a fetch returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    SingleListing,
    Directory,
    Unrecognized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_kind_with_html() {
        let content = FetchedContent::new("https://example.com", "text", FetchStrategy::Direct)
            .with_html("<html></html>")
            .with_status(200);
        assert_eq!(content.kind, ContentKind::Html);
        assert_eq!(content.raw(), "<html></html>");
        assert_eq!(content.effective_url(), "https://example.com");
    }

    #[test]
    fn test_empty_content_detection() {
        let empty = FetchedContent::new("https://example.com", "  \n ", FetchStrategy::Markup);
        assert!(!empty.has_content());
    }
}
