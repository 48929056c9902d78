//! Candidate records produced by one extraction attempt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::scoring::ConfidenceScorer;

/// A field the extractor knows how to recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Vin,
    Year,
    Make,
    Model,
    Price,
    Mileage,
    ExteriorColor,
    InteriorColor,
    Transmission,
    Drivetrain,
    BodyStyle,
    Description,
    Images,
    Title,
    LotNumber,
    SaleStatus,
}

impl Field {
    /// Every field, in reporting order.
    pub const ALL: [Field; 16] = [
        Field::Vin,
        Field::Year,
        Field::Make,
        Field::Model,
        Field::Price,
        Field::Mileage,
        Field::ExteriorColor,
        Field::InteriorColor,
        Field::Transmission,
        Field::Drivetrain,
        Field::BodyStyle,
        Field::Description,
        Field::Images,
        Field::Title,
        Field::LotNumber,
        Field::SaleStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Vin => "vin",
            Field::Year => "year",
            Field::Make => "make",
            Field::Model => "model",
            Field::Price => "price",
            Field::Mileage => "mileage",
            Field::ExteriorColor => "exterior_color",
            Field::InteriorColor => "interior_color",
            Field::Transmission => "transmission",
            Field::Drivetrain => "drivetrain",
            Field::BodyStyle => "body_style",
            Field::Description => "description",
            Field::Images => "images",
            Field::Title => "title",
            Field::LotNumber => "lot_number",
            Field::SaleStatus => "sale_status",
        }
    }
}

/// Auction outcome as stated on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Sold,
    NotSold,
    BidTo,
    Live,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Sold => "sold",
            SaleStatus::NotSold => "not_sold",
            SaleStatus::BidTo => "bid_to",
            SaleStatus::Live => "live",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sold" => Some(SaleStatus::Sold),
            "not_sold" => Some(SaleStatus::NotSold),
            "bid_to" => Some(SaleStatus::BidTo),
            "live" => Some(SaleStatus::Live),
            _ => None,
        }
    }
}

/// Which extraction tier produced the identifying fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    /// Embedded structured data (JSON-LD, hydration blobs)
    Structured,
    /// Free-text pattern matching
    PatternFallback,
}

/// The typed field values of a vehicle listing, all optional.
///
/// Price is a whole-currency-unit integer (dollars for US listings).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleFields {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub vin: Option<String>,
    pub mileage: Option<i64>,
    pub price: Option<i64>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub body_style: Option<String>,
    pub description: Option<String>,
    pub lot_number: Option<String>,
    pub sale_status: Option<SaleStatus>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

impl VehicleFields {
    /// Whether a given field carries a value.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Vin => self.vin.is_some(),
            Field::Year => self.year.is_some(),
            Field::Make => self.make.is_some(),
            Field::Model => self.model.is_some(),
            Field::Price => self.price.is_some(),
            Field::Mileage => self.mileage.is_some(),
            Field::ExteriorColor => self.exterior_color.is_some(),
            Field::InteriorColor => self.interior_color.is_some(),
            Field::Transmission => self.transmission.is_some(),
            Field::Drivetrain => self.drivetrain.is_some(),
            Field::BodyStyle => self.body_style.is_some(),
            Field::Description => self.description.is_some(),
            Field::Images => !self.image_urls.is_empty(),
            Field::Title => self.title.is_some(),
            Field::LotNumber => self.lot_number.is_some(),
            Field::SaleStatus => self.sale_status.is_some(),
        }
    }

    /// Fill every empty field of `self` from `other`.
    pub fn fill_from(&mut self, other: VehicleFields) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }

        fill(&mut self.title, other.title);
        fill(&mut self.year, other.year);
        fill(&mut self.make, other.make);
        fill(&mut self.model, other.model);
        fill(&mut self.vin, other.vin);
        fill(&mut self.mileage, other.mileage);
        fill(&mut self.price, other.price);
        fill(&mut self.exterior_color, other.exterior_color);
        fill(&mut self.interior_color, other.interior_color);
        fill(&mut self.transmission, other.transmission);
        fill(&mut self.drivetrain, other.drivetrain);
        fill(&mut self.body_style, other.body_style);
        fill(&mut self.description, other.description);
        fill(&mut self.lot_number, other.lot_number);
        fill(&mut self.sale_status, other.sale_status);
        if self.image_urls.is_empty() {
            self.image_urls = other.image_urls;
        }
    }
}

/// The output of one extraction attempt.
///
/// Coverage sets and the confidence score are derived from the field values
/// at construction and cannot drift from them. Only the low-confidence flag
/// can be raised afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(flatten)]
    fields: VehicleFields,
    fields_extracted: BTreeSet<Field>,
    fields_missing: BTreeSet<Field>,
    tier: ExtractionTier,
    confidence: f64,
    low_confidence: bool,
}

impl CandidateRecord {
    /// Build a record, deriving coverage and scoring it.
    pub fn new(fields: VehicleFields, tier: ExtractionTier, scorer: &ConfidenceScorer) -> Self {
        let (fields_extracted, fields_missing): (BTreeSet<Field>, BTreeSet<Field>) =
            Field::ALL.iter().partition(|f| fields.has(**f));

        let confidence = scorer.score(&fields_extracted, tier);
        let low_confidence = scorer.is_low(confidence);

        Self {
            fields,
            fields_extracted,
            fields_missing,
            tier,
            confidence,
            low_confidence,
        }
    }

    pub fn fields(&self) -> &VehicleFields {
        &self.fields
    }

    pub fn vin(&self) -> Option<&str> {
        self.fields.vin.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.fields.description.as_deref()
    }

    pub fn image_urls(&self) -> &[String] {
        &self.fields.image_urls
    }

    pub fn fields_extracted(&self) -> &BTreeSet<Field> {
        &self.fields_extracted
    }

    pub fn fields_missing(&self) -> &BTreeSet<Field> {
        &self.fields_missing
    }

    pub fn tier(&self) -> ExtractionTier {
        self.tier
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Valid result, but below the trust threshold; persisted and flagged.
    pub fn is_low_confidence(&self) -> bool {
        self.low_confidence
    }

    /// Flag the record regardless of score, e.g. when the page could not be
    /// identified as a listing.
    pub fn flag_low_confidence(&mut self) {
        self.low_confidence = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_partitions_all_fields() {
        let fields = VehicleFields {
            year: Some(1967),
            make: Some("Ford".into()),
            ..Default::default()
        };
        let record = CandidateRecord::new(
            fields,
            ExtractionTier::PatternFallback,
            &ConfidenceScorer::default(),
        );

        assert!(record.fields_extracted().contains(&Field::Year));
        assert!(record.fields_extracted().contains(&Field::Make));
        assert!(record.fields_missing().contains(&Field::Vin));
        assert_eq!(
            record.fields_extracted().len() + record.fields_missing().len(),
            Field::ALL.len()
        );
    }

    #[test]
    fn test_fill_from_keeps_existing_values() {
        let mut primary = VehicleFields {
            make: Some("Porsche".into()),
            ..Default::default()
        };
        let fallback = VehicleFields {
            make: Some("Ford".into()),
            year: Some(1973),
            image_urls: vec!["https://cdn.example.com/1.jpg".into()],
            ..Default::default()
        };

        primary.fill_from(fallback);

        assert_eq!(primary.make.as_deref(), Some("Porsche"));
        assert_eq!(primary.year, Some(1973));
        assert_eq!(primary.image_urls.len(), 1);
    }

    #[test]
    fn test_sale_status_round_trips_through_str() {
        for status in [
            SaleStatus::Sold,
            SaleStatus::NotSold,
            SaleStatus::BidTo,
            SaleStatus::Live,
        ] {
            assert_eq!(SaleStatus::parse(status.as_str()), Some(status));
        }
    }
}
