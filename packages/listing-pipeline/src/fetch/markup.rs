//! Plain markup fetch: no browser signature, no rendering.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::Fetcher;
use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult};
use crate::patterns::text;
use crate::types::{ContentKind, FetchStrategy, FetchedContent};

/// Last resort source of raw text. The body is reduced to markdown.
pub struct MarkupFetcher {
    client: Client,
    timeout: Duration,
}

impl MarkupFetcher {
    pub fn new(config: &FetchConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.markup_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            timeout: config.markup_timeout,
        })
    }
}

#[async_trait]
impl Fetcher for MarkupFetcher {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Markup
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, url: &Url) -> FetchResult<FetchedContent> {
        debug!(url = %url, "Markup fetch");

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
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let markdown = text::html_to_markdown(&body);
        Ok(FetchedContent::new(url.as_str(), markdown, FetchStrategy::Markup)
            .with_html(body)
            .with_kind(ContentKind::Markdown)
            .with_status(status.as_u16())
            .with_final_url(final_url))
    }
}
