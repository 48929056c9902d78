//! In-memory storage for tests and dry runs.
//!
//! Enforces the same uniqueness rules as the database schema: VIN when
//! non-null, one external listing per platform and canonical URL, one image
//! per vehicle and URL, one claim per dedupe key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    description_lease, vehicle_not_found, ClaimRepository, ExternalListing, MediaRepository,
    NewExternalListing, NewVehicle, PendingDescription, VehicleImage, VehicleRepository,
    VehicleRow,
};
use crate::error::{StoreError, StoreResult};
use crate::types::{DedupeKey, EntityId, Platform, RepairClaim, VehicleFields};

#[derive(Debug, Clone)]
struct StoredClaim {
    vehicle_id: EntityId,
    claim: RepairClaim,
}

/// In-memory vehicle store.
///
/// Not suitable for production as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    vehicles: RwLock<HashMap<EntityId, VehicleRow>>,
    listings: RwLock<HashMap<(Platform, String), ExternalListing>>,
    images: RwLock<Vec<VehicleImage>>,
    claims: RwLock<HashMap<DedupeKey, StoredClaim>>,
    leases: RwLock<HashMap<EntityId, DateTime<Utc>>>,
    fail_image_inserts: AtomicBool,
    miss_next_vin_lookup: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every image insert fail with a backend error.
    pub fn fail_image_inserts(&self, fail: bool) {
        self.fail_image_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make the next VIN lookup miss, as a concurrent insert racing this one would.
    pub fn miss_next_vin_lookup(&self) {
        self.miss_next_vin_lookup.store(true, Ordering::SeqCst);
    }

    pub async fn vehicle_count(&self) -> usize {
        self.vehicles.read().await.len()
    }

    pub async fn listing_count(&self) -> usize {
        self.listings.read().await.len()
    }

    pub async fn image_count(&self, vehicle_id: EntityId) -> usize {
        self.images
            .read()
            .await
            .iter()
            .filter(|i| i.vehicle_id == vehicle_id)
            .count()
    }

    pub async fn claim_count(&self) -> usize {
        self.claims.read().await.len()
    }

    /// Attach a discovery URL to a stored vehicle.
    pub async fn set_discovery_url(&self, id: EntityId, url: impl Into<String>) -> StoreResult<()> {
        let mut vehicles = self.vehicles.write().await;
        let row = vehicles.get_mut(&id).ok_or_else(|| vehicle_not_found(id))?;
        row.discovery_url = Some(url.into());
        Ok(())
    }

    fn vin_conflict() -> StoreError {
        StoreError::Conflict {
            constraint: "vehicles_vin_unique".to_string(),
        }
    }
}

fn vin_taken(vehicles: &HashMap<EntityId, VehicleRow>, vin: Option<&str>, except: Option<EntityId>) -> bool {
    match vin {
        Some(vin) => vehicles
            .values()
            .any(|v| Some(v.id) != except && v.fields.vin.as_deref() == Some(vin)),
        None => false,
    }
}

#[async_trait]
impl VehicleRepository for MemoryStore {
    async fn find_vehicle(&self, id: EntityId) -> StoreResult<Option<VehicleRow>> {
        Ok(self.vehicles.read().await.get(&id).cloned())
    }

    async fn find_by_vin(&self, vin: &str) -> StoreResult<Option<VehicleRow>> {
        if self.miss_next_vin_lookup.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .vehicles
            .read()
            .await
            .values()
            .find(|v| v.fields.vin.as_deref() == Some(vin))
            .cloned())
    }

    async fn find_by_listing_url(&self, keys: &[String]) -> StoreResult<Option<VehicleRow>> {
        let matches = |value: &Option<String>| {
            value
                .as_ref()
                .is_some_and(|v| keys.iter().any(|k| k == v))
        };
        Ok(self
            .vehicles
            .read()
            .await
            .values()
            .filter(|v| matches(&v.listing_url_key) || matches(&v.listing_url) || matches(&v.discovery_url))
            .min_by_key(|v| v.created_at)
            .cloned())
    }

    async fn insert_vehicle(&self, vehicle: &NewVehicle) -> StoreResult<VehicleRow> {
        let mut vehicles = self.vehicles.write().await;
        if vin_taken(&vehicles, vehicle.fields.vin.as_deref(), None) {
            return Err(Self::vin_conflict());
        }
        if vehicles.contains_key(&vehicle.id) {
            return Err(StoreError::Conflict {
                constraint: "vehicles_pkey".to_string(),
            });
        }

        let now = Utc::now();
        let mut fields = vehicle.fields.clone();
        fields.image_urls.clear();
        let row = VehicleRow {
            id: vehicle.id,
            fields,
            confidence: vehicle.confidence,
            platform: Some(vehicle.platform),
            listing_url: Some(vehicle.listing_url.clone()),
            listing_url_key: Some(vehicle.listing_url_key.clone()),
            discovery_url: None,
            description_processed_at: None,
            created_at: now,
            updated_at: now,
        };
        vehicles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_vehicle(
        &self,
        id: EntityId,
        fields: &VehicleFields,
        confidence: f64,
    ) -> StoreResult<VehicleRow> {
        let mut vehicles = self.vehicles.write().await;
        if vin_taken(&vehicles, fields.vin.as_deref(), Some(id)) {
            return Err(Self::vin_conflict());
        }
        let row = vehicles.get_mut(&id).ok_or_else(|| vehicle_not_found(id))?;

        if row.fields.description != fields.description {
            row.description_processed_at = None;
            self.leases.write().await.remove(&id);
        }
        row.fields = fields.clone();
        row.fields.image_urls.clear();
        row.confidence = confidence;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn find_external_listing(
        &self,
        platform: Platform,
        keys: &[String],
    ) -> StoreResult<Option<ExternalListing>> {
        let listings = self.listings.read().await;
        Ok(keys
            .iter()
            .find_map(|k| listings.get(&(platform, k.clone())))
            .cloned())
    }

    async fn upsert_external_listing(
        &self,
        listing: &NewExternalListing,
    ) -> StoreResult<ExternalListing> {
        if !self.vehicles.read().await.contains_key(&listing.vehicle_id) {
            return Err(vehicle_not_found(listing.vehicle_id));
        }

        let mut listings = self.listings.write().await;
        let key = (listing.platform, listing.listing_url_key.clone());
        let existing = listings.get(&key);
        // Missing values keep what an earlier run stored.
        let row = ExternalListing {
            id: existing.map(|l| l.id).unwrap_or_else(Uuid::new_v4),
            vehicle_id: listing.vehicle_id,
            platform: listing.platform,
            listing_url: listing.listing_url.clone(),
            listing_url_key: listing.listing_url_key.clone(),
            lot_number: listing
                .lot_number
                .clone()
                .or_else(|| existing.and_then(|l| l.lot_number.clone())),
            sale_status: listing.sale_status.or(existing.and_then(|l| l.sale_status)),
            price: listing.price.or(existing.and_then(|l| l.price)),
            updated_at: Utc::now(),
        };
        listings.insert(key, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl MediaRepository for MemoryStore {
    async fn image_urls(&self, vehicle_id: EntityId) -> StoreResult<HashSet<String>> {
        Ok(self
            .images
            .read()
            .await
            .iter()
            .filter(|i| i.vehicle_id == vehicle_id)
            .map(|i| i.url.clone())
            .collect())
    }

    async fn insert_image(
        &self,
        vehicle_id: EntityId,
        url: &str,
        position: i32,
    ) -> StoreResult<()> {
        if self.fail_image_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("image storage unavailable".into()));
        }

        let mut images = self.images.write().await;
        if images.iter().any(|i| i.vehicle_id == vehicle_id && i.url == url) {
            return Err(StoreError::Conflict {
                constraint: "vehicle_images_vehicle_url_unique".to_string(),
            });
        }
        images.push(VehicleImage {
            id: Uuid::new_v4(),
            vehicle_id,
            url: url.to_string(),
            position,
            created_at: Utc::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl ClaimRepository for MemoryStore {
    async fn claim_exists(&self, key: &DedupeKey) -> StoreResult<bool> {
        Ok(self.claims.read().await.contains_key(key))
    }

    async fn insert_claim(
        &self,
        vehicle_id: EntityId,
        _source_url: &str,
        claim: &RepairClaim,
    ) -> StoreResult<()> {
        let mut claims = self.claims.write().await;
        if claims.contains_key(&claim.dedupe_key) {
            return Err(StoreError::Conflict {
                constraint: "repair_claims_dedupe_key_unique".to_string(),
            });
        }
        claims.insert(
            claim.dedupe_key.clone(),
            StoredClaim {
                vehicle_id,
                claim: claim.clone(),
            },
        );
        Ok(())
    }

    async fn claims_for(&self, vehicle_id: EntityId) -> StoreResult<Vec<RepairClaim>> {
        let mut claims: Vec<RepairClaim> = self
            .claims
            .read()
            .await
            .values()
            .filter(|c| c.vehicle_id == vehicle_id)
            .map(|c| c.claim.clone())
            .collect();
        claims.sort_by(|a, b| a.item.cmp(&b.item));
        Ok(claims)
    }

    async fn claim_description_batch(&self, limit: usize) -> StoreResult<Vec<PendingDescription>> {
        let now = Utc::now();
        let vehicles = self.vehicles.read().await;
        let mut leases = self.leases.write().await;

        let mut pending: Vec<&VehicleRow> = vehicles
            .values()
            .filter(|v| v.description_processed_at.is_none())
            .filter(|v| v.fields.description.as_deref().is_some_and(|d| !d.trim().is_empty()))
            .filter(|v| {
                leases
                    .get(&v.id)
                    .map_or(true, |leased_at| *leased_at + description_lease() <= now)
            })
            .collect();
        pending.sort_by_key(|v| v.updated_at);
        pending.truncate(limit);

        Ok(pending
            .into_iter()
            .map(|v| {
                leases.insert(v.id, now);
                PendingDescription {
                    vehicle_id: v.id,
                    description: v.fields.description.clone().unwrap_or_default(),
                    source_url: v
                        .listing_url_key
                        .clone()
                        .or_else(|| v.listing_url.clone())
                        .unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn mark_description_processed(&self, vehicle_id: EntityId) -> StoreResult<()> {
        let mut vehicles = self.vehicles.write().await;
        let row = vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| vehicle_not_found(vehicle_id))?;
        row.description_processed_at = Some(Utc::now());
        self.leases.write().await.remove(&vehicle_id);
        Ok(())
    }
}
