//! Data types that flow through the pipeline.

pub mod attempt;
pub mod claim;
pub mod content;
pub mod identity;
pub mod platform;
pub mod record;
pub mod request;

pub use attempt::{AttemptOutcome, ExtractionAttempt, FetchStrategy};
pub use claim::{DedupeKey, RepairClaim};
pub use content::{ContentKind, FetchedContent, PageKind};
pub use identity::{EntityId, EntityIdentity, MatchKind};
pub use platform::{Platform, StructuralRequirement};
pub use record::{CandidateRecord, ExtractionTier, Field, SaleStatus, VehicleFields};
pub use request::{IngestRequest, IngestResponse, PersistenceReport};
