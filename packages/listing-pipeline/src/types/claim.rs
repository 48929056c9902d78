//! Repair claims derived from listing descriptions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::identity::EntityId;

/// Content-addressed key of a repair claim.
///
/// SHA-256 over (entity id, canonical source URL, lowercased item).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupeKey(pub String);

impl DedupeKey {
    pub fn compute(entity_id: EntityId, canonical_url: &str, item: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(entity_id.0.as_bytes());
        hasher.update([0u8]);
        hasher.update(canonical_url.as_bytes());
        hasher.update([0u8]);
        hasher.update(item.trim().to_lowercase().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discrete work item claimed by a listing description.
///
/// Created once and never mutated; a correction is a new claim with
/// different evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairClaim {
    pub item: String,
    pub evidence: String,
    pub dedupe_key: DedupeKey,
}

impl RepairClaim {
    pub fn new(
        entity_id: EntityId,
        canonical_url: &str,
        item: impl Into<String>,
        evidence: impl Into<String>,
    ) -> Self {
        let item = item.into();
        let dedupe_key = DedupeKey::compute(entity_id, canonical_url, &item);
        Self {
            item,
            evidence: evidence.into(),
            dedupe_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_item_case() {
        let id = EntityId::new();
        let a = DedupeKey::compute(id, "https://bringatrailer.com/listing/x", "Rear Brake Pads");
        let b = DedupeKey::compute(id, "https://bringatrailer.com/listing/x", "rear brake pads");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_key_scoped_to_entity() {
        let url = "https://bringatrailer.com/listing/x";
        let a = DedupeKey::compute(EntityId::new(), url, "new clutch");
        let b = DedupeKey::compute(EntityId::new(), url, "new clutch");
        assert_ne!(a, b);
    }
}
