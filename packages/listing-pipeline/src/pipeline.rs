//! The ingestion pipeline.
//!
//! One invocation runs strictly in order: fetch, extract, score, classify,
//! resolve, persist. Nothing about entity identity is cached between
//! invocations; every run re-resolves from the store, which is what makes
//! duplicate and out-of-order invocations safe.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::{BatchConfig, PipelineConfig};
use crate::error::{FetchResult, PipelineError, Result};
use crate::extract::{classify, FieldExtractor};
use crate::fetch::FetchOrchestrator;
use crate::identity::IdentityResolver;
use crate::persist::PersistenceGateway;
use crate::scoring::ConfidenceScorer;
use crate::store::VehicleStore;
use crate::types::{EntityId, IngestRequest, IngestResponse, PageKind};

/// Fetch-to-persist pipeline over a vehicle store.
pub struct Pipeline<S: VehicleStore> {
    fetcher: FetchOrchestrator,
    extractor: FieldExtractor,
    resolver: IdentityResolver<S>,
    gateway: PersistenceGateway<S>,
    batch: BatchConfig,
}

impl<S: VehicleStore> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            resolver: self.resolver.clone(),
            gateway: self.gateway.clone(),
            batch: self.batch.clone(),
        }
    }
}

impl<S: VehicleStore> Pipeline<S> {
    /// Build with the configured fetch strategies.
    pub fn new(config: &PipelineConfig, store: Arc<S>) -> FetchResult<Self> {
        let fetcher = FetchOrchestrator::from_config(&config.fetch)?;
        Ok(Self::with_fetcher(fetcher, config, store))
    }

    /// Build around an existing orchestrator.
    pub fn with_fetcher(fetcher: FetchOrchestrator, config: &PipelineConfig, store: Arc<S>) -> Self {
        let scorer =
            ConfidenceScorer::new().with_low_threshold(config.persistence.low_confidence_threshold);

        Self {
            fetcher,
            extractor: FieldExtractor::new(scorer),
            resolver: IdentityResolver::new(Arc::clone(&store)),
            gateway: PersistenceGateway::new(store, config.persistence.clone()),
            batch: config.batch.clone(),
        }
    }

    /// Pin the extractor's reference year.
    pub fn with_extractor(mut self, extractor: FieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Run one invocation.
    #[instrument(skip(self, request), fields(url = %request.url, save = request.save_to_db))]
    pub async fn run(&self, request: &IngestRequest) -> Result<IngestResponse> {
        validate_url(&request.url)?;

        let outcome = self.fetcher.fetch(&request.url).await?;
        let mut record = self.extractor.extract(&outcome.content);
        let page_kind = classify(&outcome.content, &record);
        if page_kind == PageKind::Unrecognized {
            record.flag_low_confidence();
        }

        info!(
            strategy = outcome.strategy().as_str(),
            page_kind = ?page_kind,
            confidence = record.confidence(),
            low_confidence = record.is_low_confidence(),
            "Extraction complete"
        );

        if page_kind == PageKind::Directory {
            return Err(PipelineError::UnsupportedPage { kind: page_kind });
        }

        let (identity, persistence) = if request.save_to_db {
            let identity = self
                .resolver
                .resolve(&record, &request.url, request.entity_id)
                .await?;
            let report = self.gateway.upsert(identity, &record, &request.url).await?;
            (Some(identity), Some(report))
        } else {
            (None, None)
        };

        let raw = request
            .include_raw
            .then(|| outcome.content.raw().to_string());

        Ok(IngestResponse {
            success: true,
            extracted: record,
            fetch_source: outcome.strategy(),
            page_kind,
            attempts: outcome.attempts,
            identity,
            persistence,
            raw,
        })
    }

    /// Run one invocation under a wall-clock budget.
    ///
    /// On expiry the invocation is abandoned mid-step. Writes already made
    /// stay; the caller retries the URL.
    pub async fn run_with_budget(
        &self,
        request: &IngestRequest,
        budget: Duration,
    ) -> Result<IngestResponse> {
        match tokio::time::timeout(budget, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %request.url, budget_secs = budget.as_secs(), "Invocation budget exceeded");
                Err(PipelineError::BudgetExceeded { budget })
            }
        }
    }

    /// Ingest up to `batch_size` URLs one at a time with a pacing delay
    /// between them. URLs past the batch size are returned as deferred.
    pub async fn run_batch(&self, urls: &[String], save: bool) -> BatchReport {
        let take = urls.len().min(self.batch.batch_size);
        let (now, later) = urls.split_at(take);
        let mut report = BatchReport {
            deferred: later.to_vec(),
            ..Default::default()
        };

        for (index, url) in now.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.batch.pacing).await;
            }

            let mut request = IngestRequest::new(url.clone());
            request.save_to_db = save;

            match self.run_with_budget(&request, self.batch.invocation_budget).await {
                Ok(response) => {
                    let persistence = response.persistence.as_ref();
                    report.succeeded.push(BatchSuccess {
                        url: url.clone(),
                        entity_id: persistence.and_then(|p| p.entity_id),
                        created: persistence.is_some_and(|p| p.created),
                        confidence: response.extracted.confidence(),
                    });
                }
                Err(e) => {
                    let failure = BatchFailure {
                        url: url.clone(),
                        error: e.to_string(),
                    };
                    if e.is_retryable() {
                        report.retryable.push(failure);
                    } else {
                        report.failed.push(failure);
                    }
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            retryable = report.retryable.len(),
            failed = report.failed.len(),
            deferred = report.deferred.len(),
            "Batch complete"
        );
        report
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| PipelineError::InvalidRequest {
        reason: format!("invalid URL {}: {}", raw, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipelineError::InvalidRequest {
            reason: format!("unsupported scheme: {}", url.scheme()),
        });
    }
    Ok(())
}

/// One URL ingested by a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSuccess {
    pub url: String,
    pub entity_id: Option<EntityId>,
    pub created: bool,
    pub confidence: f64,
}

/// One URL that failed in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub url: String,
    pub error: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<BatchSuccess>,
    /// Failures worth retrying later (fetch exhaustion, conflicts, budget)
    pub retryable: Vec<BatchFailure>,
    pub failed: Vec<BatchFailure>,
    /// URLs beyond the batch size, untouched
    pub deferred: Vec<String>,
}
