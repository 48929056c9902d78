//! Confidence scoring for candidate records.
//!
//! The score is additive and explainable: a tier-specific base plus a fixed
//! increment per extracted field, clamped to the tier's ceiling. Adding a
//! field can never lower the score, which is what lets the persistence layer
//! compare scores to decide whether to overwrite stored values.

use std::collections::{BTreeSet, HashMap};

use crate::types::{ExtractionTier, Field};

/// Ceiling for pattern-matched records. Free-text extraction is never fully trusted.
pub const FALLBACK_CEILING: f64 = 0.85;

/// Ceiling for records built from embedded structured data.
pub const STRUCTURED_CEILING: f64 = 1.0;

/// Default threshold below which a record is flagged as low confidence.
pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Per-field weights, tier bases and ceilings.
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    weights: HashMap<Field, f64>,
    structured_base: f64,
    fallback_base: f64,
    low_threshold: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        let weights = HashMap::from([
            (Field::Vin, 0.25),
            (Field::Year, 0.10),
            (Field::Make, 0.10),
            (Field::Model, 0.08),
            (Field::Price, 0.07),
            (Field::Mileage, 0.06),
            (Field::Description, 0.04),
            (Field::Images, 0.04),
            (Field::Title, 0.02),
            (Field::Transmission, 0.03),
            (Field::Drivetrain, 0.02),
            (Field::BodyStyle, 0.02),
            (Field::ExteriorColor, 0.02),
            (Field::LotNumber, 0.01),
            (Field::SaleStatus, 0.01),
            (Field::InteriorColor, 0.01),
        ]);

        Self {
            weights,
            structured_base: 0.35,
            fallback_base: 0.15,
            low_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the low-confidence flag threshold.
    pub fn with_low_threshold(mut self, threshold: f64) -> Self {
        self.low_threshold = threshold;
        self
    }

    /// Increment contributed by one field. Weights are never negative.
    pub fn weight(&self, field: Field) -> f64 {
        self.weights.get(&field).copied().unwrap_or(0.0).max(0.0)
    }

    pub fn ceiling(tier: ExtractionTier) -> f64 {
        match tier {
            ExtractionTier::Structured => STRUCTURED_CEILING,
            ExtractionTier::PatternFallback => FALLBACK_CEILING,
        }
    }

    /// Score a set of extracted fields on the given tier.
    pub fn score(&self, extracted: &BTreeSet<Field>, tier: ExtractionTier) -> f64 {
        let base = match tier {
            ExtractionTier::Structured => self.structured_base,
            ExtractionTier::PatternFallback => self.fallback_base,
        };
        let total: f64 = base + extracted.iter().map(|f| self.weight(*f)).sum::<f64>();
        total.clamp(0.0, Self::ceiling(tier))
    }

    pub fn is_low(&self, score: f64) -> bool {
        score < self.low_threshold
    }

    /// Whether a new value at `incoming` confidence may replace a stored value
    /// written at `stored` confidence. Never downgrade.
    pub fn may_overwrite(stored: Option<f64>, incoming: f64) -> bool {
        match stored {
            Some(stored) => incoming >= stored,
            None => true,
        }
    }
}
