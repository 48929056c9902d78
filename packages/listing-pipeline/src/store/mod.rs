//! Storage seams for vehicles, media and repair claims.
//!
//! The storage layer is split into focused traits:
//! - `VehicleRepository`: vehicle entities and external listing links
//! - `MediaRepository`: vehicle images
//! - `ClaimRepository`: repair claims and the description work queue
//! - `VehicleStore`: composite trait combining all three
//!
//! No trait assumes multi-table atomicity. Every write is independently
//! idempotent, and unique violations surface as [`StoreError::Conflict`].

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::{DedupeKey, EntityId, Platform, RepairClaim, SaleStatus, VehicleFields};

/// How long a leased description stays invisible to other claim workers.
pub fn description_lease() -> Duration {
    Duration::minutes(10)
}

/// A persisted vehicle entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleRow {
    pub id: EntityId,
    pub fields: VehicleFields,
    /// Confidence of the record the stored values were written from
    pub confidence: f64,
    pub platform: Option<Platform>,
    pub listing_url: Option<String>,
    /// Canonical form of `listing_url`, stored for lookups
    pub listing_url_key: Option<String>,
    pub discovery_url: Option<String>,
    pub description_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values for a vehicle insert.
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub id: EntityId,
    pub fields: VehicleFields,
    pub confidence: f64,
    pub platform: Platform,
    pub listing_url: String,
    pub listing_url_key: String,
}

/// Link between a vehicle and one platform's listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalListing {
    pub id: Uuid,
    pub vehicle_id: EntityId,
    pub platform: Platform,
    pub listing_url: String,
    pub listing_url_key: String,
    pub lot_number: Option<String>,
    pub sale_status: Option<SaleStatus>,
    pub price: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Values for an external listing upsert, keyed by platform and canonical URL.
#[derive(Debug, Clone)]
pub struct NewExternalListing {
    pub vehicle_id: EntityId,
    pub platform: Platform,
    pub listing_url: String,
    pub listing_url_key: String,
    pub lot_number: Option<String>,
    pub sale_status: Option<SaleStatus>,
    pub price: Option<i64>,
}

/// A stored vehicle image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleImage {
    pub id: Uuid,
    pub vehicle_id: EntityId,
    pub url: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// A description leased for claim extraction.
#[derive(Debug, Clone)]
pub struct PendingDescription {
    pub vehicle_id: EntityId,
    pub description: String,
    /// Canonical listing URL the description was taken from
    pub source_url: String,
}

/// Vehicle entities and their external listing links.
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn find_vehicle(&self, id: EntityId) -> StoreResult<Option<VehicleRow>>;

    /// Exact VIN match.
    async fn find_by_vin(&self, vin: &str) -> StoreResult<Option<VehicleRow>>;

    /// Match against the vehicle's own listing or discovery URL.
    ///
    /// `keys` are every candidate form of the URL; any match counts.
    async fn find_by_listing_url(&self, keys: &[String]) -> StoreResult<Option<VehicleRow>>;

    /// Insert a vehicle. A duplicate non-null VIN is a `Conflict`.
    async fn insert_vehicle(&self, vehicle: &NewVehicle) -> StoreResult<VehicleRow>;

    /// Replace a vehicle's field values and confidence.
    ///
    /// A changed description clears the description processed marker.
    async fn update_vehicle(
        &self,
        id: EntityId,
        fields: &VehicleFields,
        confidence: f64,
    ) -> StoreResult<VehicleRow>;

    async fn find_external_listing(
        &self,
        platform: Platform,
        keys: &[String],
    ) -> StoreResult<Option<ExternalListing>>;

    /// Create or refresh the link for (platform, canonical URL).
    async fn upsert_external_listing(
        &self,
        listing: &NewExternalListing,
    ) -> StoreResult<ExternalListing>;
}

/// Vehicle images.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// URLs already stored for a vehicle.
    async fn image_urls(&self, vehicle_id: EntityId) -> StoreResult<HashSet<String>>;

    /// Insert one image. A duplicate (vehicle, URL) is a `Conflict`.
    async fn insert_image(&self, vehicle_id: EntityId, url: &str, position: i32)
        -> StoreResult<()>;
}

/// Repair claims and the queue of descriptions awaiting extraction.
#[async_trait]
pub trait ClaimRepository: Send + Sync {
    async fn claim_exists(&self, key: &DedupeKey) -> StoreResult<bool>;

    /// Insert one claim. A duplicate dedupe key is a `Conflict`.
    async fn insert_claim(
        &self,
        vehicle_id: EntityId,
        source_url: &str,
        claim: &RepairClaim,
    ) -> StoreResult<()>;

    async fn claims_for(&self, vehicle_id: EntityId) -> StoreResult<Vec<RepairClaim>>;

    /// Lease up to `limit` unprocessed descriptions.
    ///
    /// Leased rows are skipped by other callers until the lease expires.
    async fn claim_description_batch(&self, limit: usize) -> StoreResult<Vec<PendingDescription>>;

    async fn mark_description_processed(&self, vehicle_id: EntityId) -> StoreResult<()>;
}

/// Complete vehicle storage (vehicles, media and claims).
pub trait VehicleStore: VehicleRepository + MediaRepository + ClaimRepository {}

impl<T: VehicleRepository + MediaRepository + ClaimRepository> VehicleStore for T {}

/// Shorthand for a missing vehicle.
pub(crate) fn vehicle_not_found(id: EntityId) -> StoreError {
    StoreError::NotFound {
        entity: "vehicle",
        id: id.to_string(),
    }
}
