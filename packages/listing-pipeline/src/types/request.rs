//! Inbound request and response shapes.

use serde::{Deserialize, Serialize};

use super::attempt::{ExtractionAttempt, FetchStrategy};
use super::content::PageKind;
use super::identity::{EntityId, EntityIdentity};
use super::record::CandidateRecord;

/// One pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub url: String,
    #[serde(default)]
    pub save_to_db: bool,
    #[serde(default)]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub include_raw: bool,
}

impl IngestRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            save_to_db: false,
            entity_id: None,
            include_raw: false,
        }
    }

    pub fn saving(mut self) -> Self {
        self.save_to_db = true;
        self
    }

    pub fn with_entity_id(mut self, id: EntityId) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn with_raw(mut self) -> Self {
        self.include_raw = true;
        self
    }
}

/// Outcome of the persistence stage.
///
/// `errors` enumerates every secondary write (external listing, image) that
/// failed; the primary entity write succeeded if this report exists at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceReport {
    pub entity_id: Option<EntityId>,
    pub created: bool,
    pub media_saved: usize,
    /// The persisted record was flagged as low confidence
    pub low_confidence: bool,
    pub errors: Vec<String>,
}

/// Successful invocation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub extracted: CandidateRecord,
    pub fetch_source: FetchStrategy,
    pub page_kind: PageKind,
    pub attempts: Vec<ExtractionAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<EntityIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}
