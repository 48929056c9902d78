use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::RepairClaimExtractor;
use crate::error::{StoreError, StoreResult};
use crate::identity::CanonicalUrl;
use crate::store::VehicleStore;
use crate::types::EntityId;

/// Counts from one claim extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClaimReport {
    /// Descriptions fully processed
    pub descriptions: usize,
    pub inserted: usize,
    /// Claims whose dedupe key already existed
    pub skipped: usize,
    pub errors: Vec<String>,
}

impl ClaimReport {
    fn absorb(&mut self, other: ClaimReport) {
        self.descriptions += other.descriptions;
        self.inserted += other.inserted;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }
}

/// Writes repair claims for stored descriptions.
pub struct ClaimRunner<S: VehicleStore> {
    store: Arc<S>,
    extractor: RepairClaimExtractor,
}

impl<S: VehicleStore> ClaimRunner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            extractor: RepairClaimExtractor::new(),
        }
    }

    /// Extract and store claims from one description.
    ///
    /// Claims whose key already exists are skipped, so an unchanged
    /// description is a no-op.
    pub async fn extract_for(
        &self,
        entity_id: EntityId,
        source_url: &str,
        description: &str,
    ) -> StoreResult<ClaimReport> {
        let canonical = CanonicalUrl::parse(source_url);
        let mut report = ClaimReport::default();

        for claim in self.extractor.claims_for(entity_id, canonical.key(), description) {
            if self.store.claim_exists(&claim.dedupe_key).await? {
                report.skipped += 1;
                continue;
            }
            match self.store.insert_claim(entity_id, canonical.key(), &claim).await {
                Ok(()) => report.inserted += 1,
                Err(StoreError::Conflict { .. }) => report.skipped += 1,
                Err(e) => return Err(e),
            }
        }

        report.descriptions = 1;
        debug!(
            id = %entity_id,
            inserted = report.inserted,
            skipped = report.skipped,
            "Extracted repair claims"
        );
        Ok(report)
    }

    /// Lease up to `limit` unprocessed descriptions and mine each one.
    ///
    /// A description that fails stays unprocessed and is retried once its
    /// lease expires.
    pub async fn run_pending(&self, limit: usize) -> StoreResult<ClaimReport> {
        let pending = self.store.claim_description_batch(limit).await?;
        let mut report = ClaimReport::default();

        for item in pending {
            let result = match self
                .extract_for(item.vehicle_id, &item.source_url, &item.description)
                .await
            {
                Ok(done) => self
                    .store
                    .mark_description_processed(item.vehicle_id)
                    .await
                    .map(|_| done),
                Err(e) => Err(e),
            };

            match result {
                Ok(done) => report.absorb(done),
                Err(e) => {
                    warn!(id = %item.vehicle_id, error = %e, "Claim extraction failed");
                    report.errors.push(format!("{}: {}", item.vehicle_id, e));
                }
            }
        }

        info!(
            descriptions = report.descriptions,
            inserted = report.inserted,
            skipped = report.skipped,
            errors = report.errors.len(),
            "Claim extraction pass complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ClaimRepository, MemoryStore, NewVehicle, VehicleRepository};
    use crate::types::{Platform, VehicleFields};

    const URL: &str = "https://bringatrailer.com/listing/1967-ford-mustang/";
    const DESCRIPTION: &str =
        "Work under current ownership included rear brake calipers, rotors, and pads.";

    async fn seed(store: &MemoryStore, description: &str) -> EntityId {
        store
            .insert_vehicle(&NewVehicle {
                id: EntityId::new(),
                fields: VehicleFields {
                    description: Some(description.to_string()),
                    ..Default::default()
                },
                confidence: 0.5,
                platform: Platform::BringATrailer,
                listing_url: URL.to_string(),
                listing_url_key: CanonicalUrl::parse(URL).key().to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, DESCRIPTION).await;
        let runner = ClaimRunner::new(Arc::clone(&store));

        let first = runner.extract_for(id, URL, DESCRIPTION).await.unwrap();
        let second = runner.extract_for(id, URL, DESCRIPTION).await.unwrap();

        assert_eq!(first.inserted, 3);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(store.claim_count().await, 3);
    }

    #[tokio::test]
    async fn test_slash_forms_share_keys() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, DESCRIPTION).await;
        let runner = ClaimRunner::new(Arc::clone(&store));

        runner.extract_for(id, URL, DESCRIPTION).await.unwrap();
        let again = runner
            .extract_for(id, URL.trim_end_matches('/'), DESCRIPTION)
            .await
            .unwrap();
        assert_eq!(again.inserted, 0);
    }

    #[tokio::test]
    async fn test_run_pending_marks_processed() {
        let store = Arc::new(MemoryStore::new());
        let id = seed(&store, DESCRIPTION).await;
        seed(&store, "A tidy example with no service history listed.").await;
        let runner = ClaimRunner::new(Arc::clone(&store));

        let report = runner.run_pending(10).await.unwrap();
        assert_eq!(report.descriptions, 2);
        assert_eq!(report.inserted, 3);
        assert!(report.errors.is_empty());

        let claims = store.claims_for(id).await.unwrap();
        assert_eq!(claims.len(), 3);
        assert!(claims.iter().any(|c| c.item == "rear brake rotors"));

        assert_eq!(runner.run_pending(10).await.unwrap(), ClaimReport::default());
    }
}
