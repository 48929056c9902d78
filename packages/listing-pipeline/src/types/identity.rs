//! Entity identity types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable id of a vehicle entity in the datastore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Time-ordered id for a freshly created entity.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How an existing entity was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// VIN exact match (authoritative)
    Vin,
    /// Caller supplied a known entity id
    Explicit,
    /// External listing record for the same platform and canonical URL
    ExternalListing,
    /// The entity's own stored listing/discovery URL
    ListingUrl,
}

/// Resolved target of a persistence operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityIdentity {
    Existing { id: EntityId, matched_by: MatchKind },
    New,
}

impl EntityIdentity {
    pub fn is_existing(&self) -> bool {
        matches!(self, EntityIdentity::Existing { .. })
    }

    pub fn id(&self) -> Option<EntityId> {
        match self {
            EntityIdentity::Existing { id, .. } => Some(*id),
            EntityIdentity::New => None,
        }
    }
}
