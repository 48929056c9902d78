//! Idempotent persistence of candidate records.
//!
//! The primary entity write is the unit of success. Secondary writes
//! (external listing link, images) are attempted independently afterwards and
//! every failure among them is enumerated in the report instead of failing
//! the invocation.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{PipelineError, StoreError};
use crate::identity::CanonicalUrl;
use crate::scoring::ConfidenceScorer;
use crate::store::{NewExternalListing, NewVehicle, VehicleRow, VehicleStore};
use crate::types::{CandidateRecord, EntityId, EntityIdentity, Platform, PersistenceReport, VehicleFields};

/// Create-or-update against the vehicle store.
pub struct PersistenceGateway<S: VehicleStore> {
    store: Arc<S>,
    config: PersistenceConfig,
}

impl<S: VehicleStore> Clone for PersistenceGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: VehicleStore> PersistenceGateway<S> {
    pub fn new(store: Arc<S>, config: PersistenceConfig) -> Self {
        Self { store, config }
    }

    /// Persist a record against a resolved identity.
    ///
    /// A `New` identity is inserted; a VIN unique violation here means a
    /// concurrent invocation won the race, and surfaces as the retryable
    /// `PersistenceConflict`.
    pub async fn upsert(
        &self,
        identity: EntityIdentity,
        record: &CandidateRecord,
        url: &str,
    ) -> Result<PersistenceReport, PipelineError> {
        let canonical = CanonicalUrl::parse(url);
        let platform = Platform::from_url(url);

        let (row, created) = match identity {
            EntityIdentity::New => (self.insert(record, &canonical, platform).await?, true),
            EntityIdentity::Existing { id, .. } => (self.merge(id, record).await?, false),
        };

        let mut report = PersistenceReport {
            entity_id: Some(row.id),
            created,
            media_saved: 0,
            low_confidence: record.is_low_confidence(),
            errors: Vec::new(),
        };

        let listing = NewExternalListing {
            vehicle_id: row.id,
            platform,
            listing_url: canonical.raw().to_string(),
            listing_url_key: canonical.key().to_string(),
            lot_number: record.fields().lot_number.clone(),
            sale_status: record.fields().sale_status,
            price: record.fields().price,
        };
        if let Err(e) = self.store.upsert_external_listing(&listing).await {
            warn!(id = %row.id, error = %e, "External listing write failed");
            report.errors.push(format!("external listing: {}", e));
        }

        self.save_media(row.id, record.image_urls(), &mut report).await;

        info!(
            id = %row.id,
            created = report.created,
            media_saved = report.media_saved,
            errors = report.errors.len(),
            "Persisted vehicle"
        );
        Ok(report)
    }

    async fn insert(
        &self,
        record: &CandidateRecord,
        canonical: &CanonicalUrl,
        platform: Platform,
    ) -> Result<VehicleRow, PipelineError> {
        let vehicle = NewVehicle {
            id: EntityId::new(),
            fields: record.fields().clone(),
            confidence: record.confidence(),
            platform,
            listing_url: canonical.raw().to_string(),
            listing_url_key: canonical.key().to_string(),
        };

        self.store.insert_vehicle(&vehicle).await.map_err(|e| {
            if let StoreError::Conflict { constraint } = &e {
                warn!(constraint = %constraint, "Insert lost a uniqueness race");
            }
            PipelineError::from(e)
        })
    }

    async fn merge(&self, id: EntityId, record: &CandidateRecord) -> Result<VehicleRow, PipelineError> {
        let stored = self
            .store
            .find_vehicle(id)
            .await?
            .ok_or_else(|| PipelineError::Storage(crate::store::vehicle_not_found(id)))?;

        let overwrite = ConfidenceScorer::may_overwrite(Some(stored.confidence), record.confidence());
        let fields = merge_fields(&stored.fields, record.fields(), overwrite);
        let confidence = stored.confidence.max(record.confidence());

        debug!(
            id = %id,
            stored_confidence = stored.confidence,
            incoming_confidence = record.confidence(),
            overwrite,
            "Merging into existing vehicle"
        );

        if fields == stored.fields && confidence == stored.confidence {
            return Ok(stored);
        }
        Ok(self.store.update_vehicle(id, &fields, confidence).await?)
    }

    async fn save_media(&self, id: EntityId, urls: &[String], report: &mut PersistenceReport) {
        if urls.is_empty() {
            return;
        }

        let existing = match self.store.image_urls(id).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(id = %id, error = %e, "Could not list stored images");
                report.errors.push(format!("images: {}", e));
                return;
            }
        };

        let fresh = urls
            .iter()
            .filter(|url| !existing.contains(*url))
            .take(self.config.max_images_per_run);

        let mut position = existing.len() as i32;
        for url in fresh {
            match self.store.insert_image(id, url, position).await {
                Ok(()) => {
                    report.media_saved += 1;
                    position += 1;
                }
                // Inserted concurrently.
                Err(StoreError::Conflict { .. }) => {}
                Err(e) => {
                    warn!(id = %id, url = %url, error = %e, "Image write failed");
                    report.errors.push(format!("image {}: {}", url, e));
                }
            }
        }
    }
}

/// Combine stored and incoming values.
///
/// Empty stored fields are always filled. Populated ones are replaced only
/// when `overwrite` is set and the incoming record has a value.
pub fn merge_fields(stored: &VehicleFields, incoming: &VehicleFields, overwrite: bool) -> VehicleFields {
    let (mut merged, rest) = if overwrite {
        (incoming.clone(), stored.clone())
    } else {
        (stored.clone(), incoming.clone())
    };
    merged.fill_from(rest);
    merged.image_urls.clear();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MediaRepository, MemoryStore, VehicleRepository};
    use crate::types::ExtractionTier;

    const URL: &str = "https://bringatrailer.com/listing/1967-ford-mustang/";

    fn record(fields: VehicleFields, tier: ExtractionTier) -> CandidateRecord {
        CandidateRecord::new(fields, tier, &ConfidenceScorer::default())
    }

    fn images(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://cdn.example.com/{i}.jpg")).collect()
    }

    fn gateway(store: &Arc<MemoryStore>, max_images: usize) -> PersistenceGateway<MemoryStore> {
        let config = PersistenceConfig {
            max_images_per_run: max_images,
            ..Default::default()
        };
        PersistenceGateway::new(Arc::clone(store), config)
    }

    #[tokio::test]
    async fn test_rerun_skips_known_images() {
        let store = Arc::new(MemoryStore::new());
        let gateway = gateway(&store, 50);
        let candidate = record(
            VehicleFields {
                year: Some(1967),
                image_urls: images(3),
                ..Default::default()
            },
            ExtractionTier::PatternFallback,
        );

        let first = gateway.upsert(EntityIdentity::New, &candidate, URL).await.unwrap();
        let id = first.entity_id.unwrap();
        assert!(first.created);
        assert_eq!(first.media_saved, 3);

        let identity = EntityIdentity::Existing { id, matched_by: crate::types::MatchKind::ListingUrl };
        let second = gateway.upsert(identity, &candidate, URL).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.media_saved, 0);
        assert_eq!(store.image_count(id).await, 3);
    }

    #[tokio::test]
    async fn test_image_cap_per_run() {
        let store = Arc::new(MemoryStore::new());
        let candidate = record(
            VehicleFields {
                image_urls: images(5),
                ..Default::default()
            },
            ExtractionTier::PatternFallback,
        );

        let report = gateway(&store, 2).upsert(EntityIdentity::New, &candidate, URL).await.unwrap();
        assert_eq!(report.media_saved, 2);

        let stored = store.image_urls(report.entity_id.unwrap()).await.unwrap();
        assert!(stored.contains("https://cdn.example.com/0.jpg"));
        assert!(stored.contains("https://cdn.example.com/1.jpg"));
    }

    #[tokio::test]
    async fn test_image_failures_reported_not_raised() {
        let store = Arc::new(MemoryStore::new());
        store.fail_image_inserts(true);
        let candidate = record(
            VehicleFields {
                vin: Some("1FAFP404X1F123456".into()),
                image_urls: images(2),
                ..Default::default()
            },
            ExtractionTier::PatternFallback,
        );

        let report = gateway(&store, 50).upsert(EntityIdentity::New, &candidate, URL).await.unwrap();
        assert!(report.entity_id.is_some());
        assert_eq!(report.media_saved, 0);
        assert_eq!(report.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_vin_race_is_persistence_conflict() {
        let store = Arc::new(MemoryStore::new());
        let candidate = record(
            VehicleFields {
                vin: Some("1FAFP404X1F123456".into()),
                ..Default::default()
            },
            ExtractionTier::PatternFallback,
        );
        let gateway = gateway(&store, 50);
        gateway.upsert(EntityIdentity::New, &candidate, URL).await.unwrap();

        let err = gateway
            .upsert(EntityIdentity::New, &candidate, "https://carsandbids.com/auctions/x")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::PersistenceConflict { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_low_confidence_never_downgrades() {
        let store = Arc::new(MemoryStore::new());
        let gateway = gateway(&store, 50);
        let trusted = record(
            VehicleFields {
                vin: Some("1FAFP404X1F123456".into()),
                year: Some(1967),
                make: Some("Ford".into()),
                model: Some("Mustang".into()),
                price: Some(42_500),
                ..Default::default()
            },
            ExtractionTier::Structured,
        );
        let report = gateway.upsert(EntityIdentity::New, &trusted, URL).await.unwrap();
        let id = report.entity_id.unwrap();

        let weaker = record(
            VehicleFields {
                price: Some(4_250),
                mileage: Some(45_000),
                ..Default::default()
            },
            ExtractionTier::PatternFallback,
        );
        assert!(weaker.confidence() < trusted.confidence());

        let identity = EntityIdentity::Existing { id, matched_by: crate::types::MatchKind::Vin };
        gateway.upsert(identity, &weaker, URL).await.unwrap();

        let stored = store.find_vehicle(id).await.unwrap().unwrap();
        assert_eq!(stored.fields.price, Some(42_500));
        assert_eq!(stored.fields.mileage, Some(45_000));
        assert_eq!(stored.confidence, trusted.confidence());
    }

    #[test]
    fn test_merge_overwrites_when_trusted() {
        let stored = VehicleFields {
            price: Some(10_000),
            make: Some("Ford".into()),
            ..Default::default()
        };
        let incoming = VehicleFields {
            price: Some(12_000),
            ..Default::default()
        };

        let merged = merge_fields(&stored, &incoming, true);
        assert_eq!(merged.price, Some(12_000));
        assert_eq!(merged.make.as_deref(), Some("Ford"));

        let kept = merge_fields(&stored, &incoming, false);
        assert_eq!(kept.price, Some(10_000));
    }
}
