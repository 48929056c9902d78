//! Fetch strategies and per-attempt diagnostics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A way of obtaining page content, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Unauthenticated GET with a browser-like signature
    Direct,
    /// Remote rendering service (JavaScript-driven pages)
    Rendered,
    /// Plain markup fetch, last resort source of raw text
    Markup,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::Direct => "direct",
            FetchStrategy::Rendered => "rendered",
            FetchStrategy::Markup => "markup",
        }
    }
}

/// What happened to one strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted,
    /// Content arrived but was judged insufficient
    Insufficient { reason: String },
    Failed { reason: String },
    TimedOut,
}

/// Diagnostics for one fetch attempt. Not used for correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    pub ordinal: u32,
    pub strategy: FetchStrategy,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

impl ExtractionAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Accepted
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
