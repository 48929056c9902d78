//! Testing utilities.
//!
//! Provides a configurable [`MockFetcher`] to drive the pipeline without
//! network access. Pair it with [`crate::MemoryStore`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::fetch::Fetcher;
use crate::types::{FetchStrategy, FetchedContent};

/// Mock fetch strategy for testing.
///
/// Returns canned pages by URL, or a configured error for every call. A URL
/// with no page returns HTTP 404. Clones share pages and call history.
///
/// # Example
///
/// ```rust
/// use listing_pipeline::testing::MockFetcher;
/// use listing_pipeline::types::{FetchStrategy, FetchedContent};
///
/// let direct = MockFetcher::new(FetchStrategy::Direct).with_page(
///     FetchedContent::new("https://example.com/car", "1967 Ford Mustang", FetchStrategy::Direct),
/// );
/// ```
#[derive(Clone)]
pub struct MockFetcher {
    strategy: FetchStrategy,
    timeout: Duration,
    delay: Option<Duration>,
    failure: Option<Arc<FetchError>>,
    pages: Arc<RwLock<HashMap<String, FetchedContent>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

fn page_key(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

impl MockFetcher {
    pub fn new(strategy: FetchStrategy) -> Self {
        Self {
            strategy,
            timeout: Duration::from_secs(5),
            delay: None,
            failure: None,
            pages: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fail every call with this error.
    pub fn failing(mut self, error: FetchError) -> Self {
        self.failure = Some(Arc::new(error));
        self
    }

    /// Serve a page at its own URL (builder pattern).
    pub fn with_page(self, page: FetchedContent) -> Self {
        self.add_page(page);
        self
    }

    pub fn add_page(&self, page: FetchedContent) {
        self.pages
            .write()
            .unwrap()
            .insert(page_key(&page.url), page);
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Budget the orchestrator gives this strategy.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

/// Rebuild a configured error for each call; `FetchError` is not `Clone`.
fn replicate(error: &FetchError) -> FetchError {
    match error {
        FetchError::Http(source) => FetchError::Http(source.to_string().into()),
        FetchError::Status { code } => FetchError::Status { code: *code },
        FetchError::Timeout { elapsed } => FetchError::Timeout { elapsed: *elapsed },
        FetchError::MissingMarker { marker } => FetchError::MissingMarker {
            marker: marker.clone(),
        },
        FetchError::EmptyContent { len } => FetchError::EmptyContent { len: *len },
        FetchError::Rendering { message } => FetchError::Rendering {
            message: message.clone(),
        },
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, url: &Url) -> FetchResult<FetchedContent> {
        self.calls.write().unwrap().push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.failure {
            return Err(replicate(error));
        }

        let page = self.pages.read().unwrap().get(&page_key(url.as_str())).cloned();
        match page {
            Some(mut page) => {
                page.strategy = self.strategy;
                Ok(page)
            }
            None => Err(FetchError::Status { code: 404 }),
        }
    }
}
