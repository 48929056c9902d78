//! Fetch orchestration.
//!
//! A page is obtained through an escalating list of strategies, each raced
//! against its own timer. A strategy that fails, times out, or returns
//! content judged insufficient hands over to the next one; only exhausting
//! the list is a hard failure.
//!
//! # Strategies
//!
//! - [`DirectFetcher`] - browser-like GET, accepted only if the platform's
//!   structural marker is present
//! - [`RenderFetcher`] - remote rendering service (Firecrawl-compatible API)
//! - [`MarkupFetcher`] - plain GET, last resort source of raw text

mod direct;
mod markup;
mod render;

pub use direct::DirectFetcher;
pub use markup::MarkupFetcher;
pub use render::RenderFetcher;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

use crate::config::FetchConfig;
use crate::error::{FetchError, FetchResult, PipelineError};
use crate::types::{
    AttemptOutcome, ExtractionAttempt, FetchStrategy, FetchedContent, Platform,
    StructuralRequirement,
};

/// One way of obtaining page content.
#[async_trait]
pub trait Fetcher: Send + Sync {
    fn strategy(&self) -> FetchStrategy;

    /// Budget for one call; the orchestrator cancels the call when it expires.
    fn timeout(&self) -> Duration;

    async fn fetch(&self, url: &Url) -> FetchResult<FetchedContent>;
}

/// Content from the first accepted strategy plus every attempt made.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub content: FetchedContent,
    pub attempts: Vec<ExtractionAttempt>,
}

impl FetchOutcome {
    pub fn strategy(&self) -> FetchStrategy {
        self.content.strategy
    }
}

/// Runs fetch strategies in order until one is accepted.
#[derive(Clone)]
pub struct FetchOrchestrator {
    strategies: Vec<Arc<dyn Fetcher>>,
}

impl FetchOrchestrator {
    pub fn new(strategies: Vec<Arc<dyn Fetcher>>) -> Self {
        Self { strategies }
    }

    /// Direct, then rendered (when a key is configured), then markup.
    pub fn from_config(config: &FetchConfig) -> FetchResult<Self> {
        let mut strategies: Vec<Arc<dyn Fetcher>> = vec![Arc::new(DirectFetcher::new(config)?)];

        match &config.render_api_key {
            Some(key) if !key.is_empty() => {
                strategies.push(Arc::new(RenderFetcher::new(config)?));
            }
            _ => info!("Rendering strategy disabled (no API key)"),
        }

        strategies.push(Arc::new(MarkupFetcher::new(config)?));
        Ok(Self::new(strategies))
    }

    pub fn strategies(&self) -> impl Iterator<Item = FetchStrategy> + '_ {
        self.strategies.iter().map(|s| s.strategy())
    }

    /// Fetch a URL, escalating through the strategies.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, PipelineError> {
        let parsed = Url::parse(url).map_err(|_| PipelineError::InvalidRequest {
            reason: format!("invalid URL: {}", url),
        })?;
        let platform = Platform::from_url(url);

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for (index, fetcher) in self.strategies.iter().enumerate() {
            let strategy = fetcher.strategy();
            let started = Instant::now();

            let result = match tokio::time::timeout(fetcher.timeout(), fetcher.fetch(&parsed)).await
            {
                Ok(result) => result.and_then(|content| {
                    check_sufficient(platform, strategy, &content).map(|_| content)
                }),
                Err(_) => Err(FetchError::Timeout {
                    elapsed: started.elapsed(),
                }),
            };
            let elapsed = started.elapsed();

            let outcome = match &result {
                Ok(_) => AttemptOutcome::Accepted,
                Err(FetchError::Timeout { .. }) => AttemptOutcome::TimedOut,
                Err(e @ (FetchError::MissingMarker { .. } | FetchError::EmptyContent { .. })) => {
                    AttemptOutcome::Insufficient {
                        reason: e.to_string(),
                    }
                }
                Err(e) => AttemptOutcome::Failed {
                    reason: e.to_string(),
                },
            };
            attempts.push(ExtractionAttempt {
                ordinal: index as u32 + 1,
                strategy,
                elapsed,
                outcome,
            });

            match result {
                Ok(content) => {
                    info!(
                        url = %url,
                        strategy = strategy.as_str(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Fetch strategy accepted"
                    );
                    return Ok(FetchOutcome { content, attempts });
                }
                Err(e) => {
                    warn!(
                        url = %url,
                        strategy = strategy.as_str(),
                        blocked = e.is_blocking(),
                        error = %e,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Fetch strategy failed, escalating"
                    );
                }
            }
        }

        Err(PipelineError::FetchExhausted {
            url: url.to_string(),
            attempts,
        })
    }
}

/// Whether fetched content is good enough to extract from.
///
/// Direct responses must carry the platform's structural marker (or enough
/// text on unknown sites); other strategies only need visible text.
pub fn check_sufficient(
    platform: Platform,
    strategy: FetchStrategy,
    content: &FetchedContent,
) -> FetchResult<()> {
    if !content.has_content() {
        return Err(FetchError::EmptyContent {
            len: content.text.trim().len(),
        });
    }
    if strategy != FetchStrategy::Direct {
        return Ok(());
    }

    match platform.direct_requirement() {
        StructuralRequirement::Marker(marker) => {
            if content.raw().contains(marker) {
                Ok(())
            } else {
                Err(FetchError::MissingMarker {
                    marker: marker.to_string(),
                })
            }
        }
        StructuralRequirement::MinimumText(min) => {
            let len = content.text.trim().len();
            if len >= min {
                Ok(())
            } else {
                Err(FetchError::EmptyContent { len })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;

    const BAT_URL: &str = "https://bringatrailer.com/listing/1967-ford-mustang/";

    fn page(strategy: FetchStrategy, html: &str) -> FetchedContent {
        FetchedContent::new(BAT_URL, "1967 Ford Mustang", strategy).with_html(html)
    }

    #[tokio::test]
    async fn test_forbidden_direct_escalates_to_render() {
        let direct = MockFetcher::new(FetchStrategy::Direct).failing(FetchError::Status { code: 403 });
        let render = MockFetcher::new(FetchStrategy::Rendered)
            .with_page(page(FetchStrategy::Rendered, "<div>rendered</div>"));
        let orchestrator = FetchOrchestrator::new(vec![Arc::new(direct), Arc::new(render.clone())]);

        let outcome = orchestrator.fetch(BAT_URL).await.unwrap();
        assert_eq!(outcome.strategy(), FetchStrategy::Rendered);
        assert_eq!(outcome.attempts.len(), 2);
        assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed { .. }));
        assert!(outcome.attempts[1].succeeded());
        assert_eq!(render.call_count(), 1);
    }

    #[tokio::test]
    async fn test_direct_without_marker_escalates() {
        let direct = MockFetcher::new(FetchStrategy::Direct)
            .with_page(page(FetchStrategy::Direct, "<div>Just a moment...</div>"));
        let render = MockFetcher::new(FetchStrategy::Rendered)
            .with_page(page(FetchStrategy::Rendered, "<div class=\"listing-essentials\"></div>"));
        let orchestrator = FetchOrchestrator::new(vec![Arc::new(direct), Arc::new(render)]);

        let outcome = orchestrator.fetch(BAT_URL).await.unwrap();
        assert_eq!(outcome.strategy(), FetchStrategy::Rendered);
        assert!(matches!(
            outcome.attempts[0].outcome,
            AttemptOutcome::Insufficient { .. }
        ));
    }

    #[tokio::test]
    async fn test_direct_with_marker_accepted() {
        let direct = MockFetcher::new(FetchStrategy::Direct).with_page(page(
            FetchStrategy::Direct,
            "<div class=\"listing-essentials\">VIN</div>",
        ));
        let render = MockFetcher::new(FetchStrategy::Rendered);
        let orchestrator = FetchOrchestrator::new(vec![Arc::new(direct), Arc::new(render.clone())]);

        let outcome = orchestrator.fetch(BAT_URL).await.unwrap();
        assert_eq!(outcome.strategy(), FetchStrategy::Direct);
        assert_eq!(render.call_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_recoverable() {
        let slow = MockFetcher::new(FetchStrategy::Rendered)
            .with_delay(Duration::from_millis(200))
            .with_timeout(Duration::from_millis(20))
            .with_page(page(FetchStrategy::Rendered, "<div>late</div>"));
        let markup = MockFetcher::new(FetchStrategy::Markup)
            .with_page(page(FetchStrategy::Markup, "<div>plain</div>"));
        let orchestrator = FetchOrchestrator::new(vec![Arc::new(slow), Arc::new(markup)]);

        let outcome = orchestrator.fetch(BAT_URL).await.unwrap();
        assert_eq!(outcome.strategy(), FetchStrategy::Markup);
        assert_eq!(outcome.attempts[0].outcome, AttemptOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_all_strategies_failing_is_exhausted() {
        let orchestrator = FetchOrchestrator::new(vec![
            Arc::new(MockFetcher::new(FetchStrategy::Direct).failing(FetchError::Status { code: 403 })),
            Arc::new(MockFetcher::new(FetchStrategy::Rendered).failing(FetchError::Rendering {
                message: "quota".into(),
            })),
            Arc::new(MockFetcher::new(FetchStrategy::Markup)),
        ]);

        let err = orchestrator.fetch(BAT_URL).await.unwrap_err();
        match err {
            PipelineError::FetchExhausted { attempts, .. } => assert_eq!(attempts.len(), 3),
            other => panic!("expected FetchExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_generic_sites_need_minimum_text() {
        let short = FetchedContent::new("https://dealer.example.com/car", "short", FetchStrategy::Direct);
        assert!(matches!(
            check_sufficient(Platform::Generic, FetchStrategy::Direct, &short),
            Err(FetchError::EmptyContent { len: 5 })
        ));
        assert!(check_sufficient(Platform::Generic, FetchStrategy::Markup, &short).is_ok());
    }
}
