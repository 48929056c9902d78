//! Remote rendering service (Firecrawl-compatible `/scrape` API).
//!
//! Markup and a readability-reduced markdown form are requested in one call
//! so a second round trip is never needed.

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::Fetcher;
use crate::config::{FetchConfig, SecretString};
use crate::error::{FetchError, FetchResult};
use crate::patterns::text::visible_text;
use crate::types::{ContentKind, FetchStrategy, FetchedContent};

/// Fetches pages through a JavaScript rendering service.
pub struct RenderFetcher {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    wait: Duration,
    timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 2],
    wait_for: u64,
    timeout: u64,
    only_main_content: bool,
}

#[derive(Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeData {
    markdown: Option<String>,
    raw_html: Option<String>,
    html: Option<String>,
    metadata: Option<PageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMetadata {
    title: Option<String>,
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    status_code: Option<u16>,
}

impl RenderFetcher {
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.render_timeout)
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            endpoint: config.render_api_url.trim_end_matches('/').to_string(),
            api_key: config.render_api_key.clone(),
            wait: config.render_wait,
            timeout: config.render_timeout,
        })
    }

    fn into_content(url: &Url, response: ScrapeResponse) -> FetchResult<FetchedContent> {
        if !response.success {
            return Err(FetchError::Rendering {
                message: response
                    .error
                    .unwrap_or_else(|| "scrape reported failure".to_string()),
            });
        }
        let data = response.data.ok_or_else(|| FetchError::Rendering {
            message: "no data returned".to_string(),
        })?;

        let html = data.raw_html.or(data.html);
        let metadata = data.metadata;
        if let Some(code) = metadata.as_ref().and_then(|m| m.status_code) {
            if code >= 400 {
                return Err(FetchError::Status { code });
            }
        }

        let markdown = data.markdown.filter(|m| !m.trim().is_empty());
        let text = match (&markdown, &html) {
            (Some(markdown), _) => markdown.clone(),
            (None, Some(html)) => visible_text(&Html::parse_document(html)),
            (None, None) => String::new(),
        };
        let mut content = FetchedContent::new(url.as_str(), text, FetchStrategy::Rendered);
        if let Some(html) = html {
            content = content.with_html(html);
        }
        if markdown.is_some() {
            content = content.with_kind(ContentKind::Markdown);
        }

        if let Some(metadata) = metadata {
            if let Some(title) = metadata.title {
                content = content.with_title(title);
            }
            if let Some(source) = metadata.source_url {
                content = content.with_final_url(source);
            }
            if let Some(code) = metadata.status_code {
                content = content.with_status(code);
            }
        }

        Ok(content)
    }
}

#[async_trait]
impl Fetcher for RenderFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Rendered
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, url: &Url) -> FetchResult<FetchedContent> {
        debug!(url = %url, wait_ms = self.wait.as_millis() as u64, "Rendered fetch");

        let request = ScrapeRequest {
            url: url.as_str(),
            formats: ["rawHtml", "markdown"],
            wait_for: self.wait.as_millis() as u64,
            timeout: self.timeout.as_millis() as u64,
            only_main_content: false,
        };

        let mut builder = self
            .client
            .post(format!("{}/scrape", self.endpoint))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Rendering {
                message: format!("{} - {}", status, body.chars().take(200).collect::<String>()),
            });
        }

        let parsed: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;
        Self::into_content(url, parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://carsandbids.com/auctions/abc/2004-porsche-911").unwrap()
    }

    #[test]
    fn test_response_with_both_formats() {
        let response: ScrapeResponse = serde_json::from_str(
            r##"{"success":true,"data":{"markdown":"# 2004 Porsche 911","rawHtml":"<html>__NEXT_DATA__</html>",
                 "metadata":{"title":"2004 Porsche 911","sourceURL":"https://carsandbids.com/auctions/abc","statusCode":200}}}"##,
        )
        .unwrap();

        let content = RenderFetcher::into_content(&url(), response).unwrap();
        assert_eq!(content.kind, ContentKind::Markdown);
        assert_eq!(content.html.as_deref(), Some("<html>__NEXT_DATA__</html>"));
        assert_eq!(content.title.as_deref(), Some("2004 Porsche 911"));
        assert_eq!(content.effective_url(), "https://carsandbids.com/auctions/abc");
    }

    #[test]
    fn test_markup_only_response_keeps_text() {
        let response: ScrapeResponse = serde_json::from_str(
            r#"{"success":true,"data":{"rawHtml":"<html><body><h1>2004 Porsche 911 Carrera</h1><p>Six-speed manual</p></body></html>"}}"#,
        )
        .unwrap();

        let content = RenderFetcher::into_content(&url(), response).unwrap();
        assert_eq!(content.kind, ContentKind::Html);
        assert!(content.has_content());
        assert!(content.text.contains("2004 Porsche 911 Carrera"));
        assert!(content.text.contains("Six-speed manual"));
    }

    #[test]
    fn test_reported_failure() {
        let response: ScrapeResponse =
            serde_json::from_str(r#"{"success":false,"error":"Request timed out"}"#).unwrap();
        let err = RenderFetcher::into_content(&url(), response).unwrap_err();
        assert!(matches!(err, FetchError::Rendering { message } if message.contains("timed out")));
    }

    #[test]
    fn test_upstream_status_is_surfaced() {
        let response: ScrapeResponse = serde_json::from_str(
            r#"{"success":true,"data":{"markdown":"Access denied","metadata":{"statusCode":403}}}"#,
        )
        .unwrap();
        let err = RenderFetcher::into_content(&url(), response).unwrap_err();
        assert!(err.is_blocking());
    }
}
