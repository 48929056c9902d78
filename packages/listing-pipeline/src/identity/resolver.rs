use std::sync::Arc;
use tracing::{debug, warn};

use super::CanonicalUrl;
use crate::error::StoreResult;
use crate::store::VehicleStore;
use crate::types::{CandidateRecord, EntityId, EntityIdentity, MatchKind, Platform};

/// Maps a candidate record to an existing vehicle or decides a new one is needed.
///
/// Resolution order:
/// 1. VIN exact match (authoritative, short-circuits everything else)
/// 2. Caller-supplied entity id, when it exists
/// 3. External listing for the same platform and canonical URL
/// 4. The vehicle's own listing or discovery URL
/// 5. New entity
///
/// Without a VIN, a relisted vehicle on a new URL resolves as new.
pub struct IdentityResolver<S: VehicleStore> {
    store: Arc<S>,
}

impl<S: VehicleStore> Clone for IdentityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: VehicleStore> IdentityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn resolve(
        &self,
        record: &CandidateRecord,
        url: &str,
        explicit: Option<EntityId>,
    ) -> StoreResult<EntityIdentity> {
        if let Some(vin) = record.vin() {
            if let Some(row) = self.store.find_by_vin(vin).await? {
                debug!(id = %row.id, vin = %vin, "Resolved by VIN");
                return Ok(existing(row.id, MatchKind::Vin));
            }
        }

        if let Some(id) = explicit {
            match self.store.find_vehicle(id).await? {
                Some(row) => return Ok(existing(row.id, MatchKind::Explicit)),
                None => warn!(id = %id, "Supplied entity id not found, resolving by URL"),
            }
        }

        let canonical = CanonicalUrl::parse(url);
        let keys = canonical.candidate_keys();
        let platform = Platform::from_url(url);

        if let Some(listing) = self.store.find_external_listing(platform, &keys).await? {
            debug!(id = %listing.vehicle_id, url = %canonical.key(), "Resolved by external listing");
            return Ok(existing(listing.vehicle_id, MatchKind::ExternalListing));
        }

        if let Some(row) = self.store.find_by_listing_url(&keys).await? {
            debug!(id = %row.id, url = %canonical.key(), "Resolved by listing URL");
            return Ok(existing(row.id, MatchKind::ListingUrl));
        }

        Ok(EntityIdentity::New)
    }
}

fn existing(id: EntityId, matched_by: MatchKind) -> EntityIdentity {
    EntityIdentity::Existing { id, matched_by }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ConfidenceScorer;
    use crate::store::{
        MemoryStore, NewExternalListing, NewVehicle, VehicleRepository,
    };
    use crate::types::{ExtractionTier, VehicleFields};

    const URL: &str = "https://bringatrailer.com/listing/1967-ford-mustang/";

    fn record(vin: Option<&str>) -> CandidateRecord {
        let fields = VehicleFields {
            vin: vin.map(str::to_string),
            year: Some(1967),
            make: Some("Ford".into()),
            ..Default::default()
        };
        CandidateRecord::new(fields, ExtractionTier::PatternFallback, &ConfidenceScorer::default())
    }

    async fn seed(store: &MemoryStore, vin: Option<&str>, url: &str) -> EntityId {
        let canonical = CanonicalUrl::parse(url);
        store
            .insert_vehicle(&NewVehicle {
                id: EntityId::new(),
                fields: VehicleFields {
                    vin: vin.map(str::to_string),
                    ..Default::default()
                },
                confidence: 0.5,
                platform: Platform::from_url(url),
                listing_url: url.to_string(),
                listing_url_key: canonical.key().to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_vin_beats_url_match() {
        let store = Arc::new(MemoryStore::new());
        let by_url = seed(&store, None, URL).await;
        let by_vin = seed(&store, Some("1FAFP404X1F123456"), "https://carsandbids.com/auctions/x").await;
        assert_ne!(by_url, by_vin);

        let resolver = IdentityResolver::new(store);
        let identity = resolver.resolve(&record(Some("1FAFP404X1F123456")), URL, None).await.unwrap();

        assert_eq!(
            identity,
            EntityIdentity::Existing { id: by_vin, matched_by: MatchKind::Vin }
        );
    }

    #[tokio::test]
    async fn test_external_listing_probes_both_slash_forms() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, None, "https://carsandbids.com/auctions/x").await;
        store
            .upsert_external_listing(&NewExternalListing {
                vehicle_id: id,
                platform: Platform::BringATrailer,
                listing_url: URL.to_string(),
                listing_url_key: URL.to_string(),
                lot_number: None,
                sale_status: None,
                price: None,
            })
            .await
            .unwrap();

        let resolver = IdentityResolver::new(store);
        let identity = resolver
            .resolve(&record(None), "https://bringatrailer.com/listing/1967-ford-mustang?ref=x", None)
            .await
            .unwrap();

        assert_eq!(
            identity,
            EntityIdentity::Existing { id, matched_by: MatchKind::ExternalListing }
        );
    }

    #[tokio::test]
    async fn test_listing_url_match_and_new() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, None, URL).await;
        let resolver = IdentityResolver::new(store);

        let found = resolver
            .resolve(&record(None), "https://bringatrailer.com/listing/1967-ford-mustang", None)
            .await
            .unwrap();
        assert_eq!(found.id(), Some(id));

        let fresh = resolver
            .resolve(&record(None), "https://bringatrailer.com/listing/1970-plymouth-cuda/", None)
            .await
            .unwrap();
        assert_eq!(fresh, EntityIdentity::New);
    }

    #[tokio::test]
    async fn test_discovery_url_match() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, None, "https://carsandbids.com/auctions/x").await;
        store.set_discovery_url(id, URL).await.unwrap();
        let resolver = IdentityResolver::new(store);

        let identity = resolver.resolve(&record(None), URL, None).await.unwrap();
        assert_eq!(identity, EntityIdentity::Existing { id, matched_by: MatchKind::ListingUrl });
    }

    #[tokio::test]
    async fn test_explicit_id_used_when_it_exists() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, None, "https://carsandbids.com/auctions/x").await;
        let resolver = IdentityResolver::new(store);

        let identity = resolver.resolve(&record(None), URL, Some(id)).await.unwrap();
        assert_eq!(identity, EntityIdentity::Existing { id, matched_by: MatchKind::Explicit });

        let unknown = resolver.resolve(&record(None), URL, Some(EntityId::new())).await.unwrap();
        assert_eq!(unknown, EntityIdentity::New);
    }
}
