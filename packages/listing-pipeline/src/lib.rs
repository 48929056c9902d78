//! Vehicle Listing Ingestion Pipeline
//!
//! Turns third-party auction and listing pages into normalized, deduplicated
//! vehicle records. Markup is hostile and changes constantly; invocations are
//! delivered at least once. Every write is therefore idempotent, and identity
//! is re-resolved from the store on every run.
//!
//! # Flow
//!
//! fetch (escalating strategies) → extract (embedded data, then patterns) →
//! score → classify → resolve identity (VIN, then canonical URL) → persist
//!
//! Repair claims are mined separately from stored descriptions.
//!
//! # Usage
//!
//! ```rust,ignore
//! use listing_pipeline::{IngestRequest, MemoryStore, Pipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::from_env()?;
//! let pipeline = Pipeline::new(&config, Arc::new(MemoryStore::new()))?;
//!
//! let response = pipeline
//!     .run(&IngestRequest::new("https://bringatrailer.com/listing/1967-ford-mustang/").saving())
//!     .await?;
//! ```
//!
//! # Modules
//!
//! - [`fetch`] - Fetch strategies and the escalating orchestrator
//! - [`patterns`] - Field recognizers with plausibility bounds
//! - [`extract`] - Field extraction and page classification
//! - [`scoring`] - Confidence scoring
//! - [`identity`] - URL canonicalization and identity resolution
//! - [`persist`] - Idempotent create-or-update
//! - [`claims`] - Repair claim extraction
//! - [`store`] - Storage seams and implementations
//! - [`testing`] - Mock fetcher for tests

pub mod claims;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod patterns;
pub mod persist;
pub mod pipeline;
pub mod scoring;
pub mod store;
pub mod testing;
pub mod types;

// Re-export core types at crate root
pub use config::{BatchConfig, FetchConfig, PersistenceConfig, PipelineConfig, SecretString};
pub use error::{ConfigError, ErrorResponse, FetchError, PipelineError, StoreError};
pub use types::{
    CandidateRecord, EntityId, EntityIdentity, ExtractionAttempt, ExtractionTier, Field,
    FetchStrategy, FetchedContent, IngestRequest, IngestResponse, MatchKind, PageKind,
    PersistenceReport, Platform, RepairClaim, SaleStatus, VehicleFields,
};

pub use claims::{ClaimReport, ClaimRunner, RepairClaimExtractor};
pub use extract::{classify, FieldExtractor};
pub use fetch::{FetchOrchestrator, Fetcher};
pub use identity::{CanonicalUrl, IdentityResolver};
pub use persist::PersistenceGateway;
pub use pipeline::{BatchReport, Pipeline};
pub use scoring::ConfidenceScorer;

// Re-export stores
pub use store::{MemoryStore, VehicleStore};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;
