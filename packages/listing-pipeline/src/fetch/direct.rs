//! Direct retrieval with a browser-like request signature.

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::Fetcher;
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::patterns::text;
use crate::types::{FetchStrategy, FetchedContent};

/// Unauthenticated GET that looks like a desktop browser.
pub struct DirectFetcher {
    client: Client,
    timeout: Duration,
}

impl DirectFetcher {
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        let client = Client::builder()
            .timeout(config.direct_timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            timeout: config.direct_timeout,
        })
    }
}

#[async_trait]
impl Fetcher for DirectFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Direct
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, url: &Url) -> FetchResult<FetchedContent> {
        debug!(url = %url, "Direct fetch");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
            });
        }
        let final_url = response.url().to_string();

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let document = Html::parse_document(&html);
        let visible = text::visible_text(&document);
        let mut content = FetchedContent::new(url.as_str(), visible, FetchStrategy::Direct)
            .with_html(html)
            .with_status(status.as_u16())
            .with_final_url(final_url);
        if let Some(title) = text::page_title(&document) {
            content = content.with_title(title);
        }

        Ok(content)
    }
}
