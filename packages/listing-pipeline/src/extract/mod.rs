//! Field extraction.
//!
//! Embedded structured data is read first; the pattern library then fills
//! every field it left empty. The record is scored on the structured tier
//! only when its identity (VIN, or year and make) came from embedded data.

pub mod classify;
pub mod structured;

pub use classify::classify;
pub use structured::{extract_structured, StructuredData};

use chrono::{Datelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::patterns::{self, text};
use crate::scoring::ConfidenceScorer;
use crate::types::{CandidateRecord, ExtractionTier, FetchedContent, VehicleFields};

/// Shortest paragraph accepted as a description from plain text.
const MIN_DESCRIPTION_LEN: usize = 200;

lazy_static! {
    static ref MARKDOWN_IMAGE: Regex = Regex::new(r"!\[[^\]]*\]\((https?://[^)\s]+)").unwrap();
}

/// Turns fetched content into a scored candidate record.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    current_year: i32,
    scorer: ConfidenceScorer,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(ConfidenceScorer::default())
    }
}

impl FieldExtractor {
    pub fn new(scorer: ConfidenceScorer) -> Self {
        Self {
            current_year: Utc::now().year(),
            scorer,
        }
    }

    /// Pin the reference year used for the model-year upper bound.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// Extract a candidate record from fetched content.
    pub fn extract(&self, content: &FetchedContent) -> CandidateRecord {
        let document = content.html.as_deref().map(Html::parse_document);
        let base = Url::parse(content.effective_url()).ok();

        let structured = document
            .as_ref()
            .map(|doc| extract_structured(doc, self.current_year))
            .unwrap_or_default();
        let tier = if structured.is_identifying() {
            ExtractionTier::Structured
        } else {
            ExtractionTier::PatternFallback
        };

        let mut fields = structured.fields;
        let title = fields
            .title
            .clone()
            .or_else(|| document.as_ref().and_then(text::page_title))
            .or_else(|| content.title.clone())
            .or_else(|| text::text_title(&content.text));

        fields.fill_from(self.pattern_fields(
            content,
            document.as_ref(),
            base.as_ref(),
            title.as_deref(),
        ));

        if fields.model.is_none() {
            if let (Some(title), Some(year), Some(make)) =
                (title.as_deref(), fields.year, fields.make.as_deref())
            {
                fields.model = patterns::model_from_title(title, year, make);
            }
        }
        fields.image_urls = dedupe(std::mem::take(&mut fields.image_urls));

        let record = CandidateRecord::new(fields, tier, &self.scorer);
        debug!(
            url = %content.url,
            tier = ?record.tier(),
            confidence = record.confidence(),
            extracted = record.fields_extracted().len(),
            "Extracted candidate record"
        );
        record
    }

    fn pattern_fields(
        &self,
        content: &FetchedContent,
        document: Option<&Html>,
        base: Option<&Url>,
        title: Option<&str>,
    ) -> VehicleFields {
        let body = content.text.as_str();
        let (exterior_color, interior_color) = patterns::find_colors(body);

        let year = title
            .and_then(|t| patterns::year_from_title(t, self.current_year))
            .or_else(|| patterns::find_year(body, self.current_year));
        let make = title
            .and_then(patterns::find_make)
            .or_else(|| patterns::find_make(body));

        let description = match document {
            Some(doc) => text::description(doc),
            None => longest_paragraph(body),
        };

        let mut image_urls = match (document, base) {
            (Some(doc), Some(base)) => text::image_urls(doc, base),
            _ => Vec::new(),
        };
        image_urls.extend(
            MARKDOWN_IMAGE
                .captures_iter(body)
                .map(|c| c[1].to_string()),
        );

        VehicleFields {
            title: title.map(str::to_string),
            year,
            make,
            model: None,
            vin: patterns::find_vin(body),
            mileage: patterns::find_mileage(body),
            price: patterns::find_price(body),
            exterior_color,
            interior_color,
            transmission: patterns::find_transmission(body),
            drivetrain: patterns::find_drivetrain(body),
            body_style: patterns::find_body_style(title, body),
            description,
            lot_number: patterns::find_lot_number(body),
            sale_status: patterns::find_sale_status(body),
            image_urls,
        }
    }
}

fn longest_paragraph(text: &str) -> Option<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.starts_with('#') && !p.starts_with("!["))
        .max_by_key(|p| p.len())
        .filter(|p| p.len() >= MIN_DESCRIPTION_LEN)
        .map(str::to_string)
}

fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, FetchStrategy};

    const BAT_PAGE: &str = r#"
        <html><head>
          <meta property="og:title" content="1967 Ford Mustang Fastback 4-Speed for sale on BaT Auctions">
          <meta property="og:image" content="https://bringatrailer.com/wp-content/photos/1.jpg">
        </head><body>
          <div class="listing-essentials">
            <p>Chassis: 7R02C123456</p>
            <p>VIN: 1FAFP404X1F123456</p>
            <p>45k Miles Shown</p>
          </div>
          <div class="post-excerpt"><p>This 1967 Ford Mustang Fastback is finished in Candyapple Red over black vinyl upholstery
          and is powered by a 289ci V8 paired with a four-speed manual transmission. Work under current
          ownership included rear brake calipers, rotors, and pads.</p></div>
          <p>Sold for $42,500 on 3/4/25</p>
        </body></html>"#;

    fn extractor() -> FieldExtractor {
        FieldExtractor::default().with_current_year(2026)
    }

    fn direct(url: &str, html: &str) -> FetchedContent {
        let text = text::visible_text(&Html::parse_document(html));
        FetchedContent::new(url, text, FetchStrategy::Direct).with_html(html)
    }

    #[test]
    fn test_extract_pattern_page() {
        let content = direct("https://bringatrailer.com/listing/1967-ford-mustang-42/", BAT_PAGE);
        let record = extractor().extract(&content);
        let fields = record.fields();

        assert_eq!(fields.year, Some(1967));
        assert_eq!(fields.make.as_deref(), Some("Ford"));
        assert_eq!(fields.model.as_deref(), Some("Mustang Fastback 4-Speed"));
        assert_eq!(fields.vin.as_deref(), Some("1FAFP404X1F123456"));
        assert_eq!(fields.mileage, Some(45_000));
        assert_eq!(fields.price, Some(42_500));
        assert_eq!(fields.transmission.as_deref(), Some("4-Speed Manual"));
        assert_eq!(fields.exterior_color.as_deref(), Some("Candyapple Red"));
        assert_eq!(fields.interior_color.as_deref(), Some("Black"));
        assert_eq!(fields.sale_status, Some(crate::types::SaleStatus::Sold));
        assert_eq!(fields.image_urls.len(), 1);

        assert_eq!(record.tier(), ExtractionTier::PatternFallback);
        assert!(record.confidence() <= crate::scoring::FALLBACK_CEILING);
        assert!(record.fields_missing().contains(&Field::LotNumber));
    }

    #[test]
    fn test_structured_tier_outscores_patterns() {
        let structured_page = r#"<html><head><script type="application/ld+json">
            {"@type":"Car","name":"1967 Ford Mustang Fastback","brand":"Ford","vehicleModelDate":1967,
             "vehicleIdentificationNumber":"1FAFP404X1F123456"}</script></head>
            <body><p>Clean example.</p></body></html>"#;
        let plain_page = r#"<html><head><title>1967 Ford Mustang Fastback</title></head>
            <body><p>VIN: 1FAFP404X1F123456. Clean example.</p></body></html>"#;

        let structured = extractor().extract(&direct("https://dealer.example.com/a", structured_page));
        let plain = extractor().extract(&direct("https://dealer.example.com/b", plain_page));

        assert_eq!(structured.tier(), ExtractionTier::Structured);
        assert_eq!(plain.tier(), ExtractionTier::PatternFallback);
        assert_eq!(structured.fields_extracted(), plain.fields_extracted());
        assert!(structured.confidence() > plain.confidence());
    }

    #[test]
    fn test_markdown_content() {
        let markdown = "# 1972 VW Beetle\n\n![front](https://cdn.example.com/beetle.jpg)\n\n\
                        Odometer: 88,000. Asking $9,500.";
        let content = FetchedContent::new("https://example.com/beetle", markdown, FetchStrategy::Rendered)
            .with_kind(crate::types::ContentKind::Markdown);

        let record = extractor().extract(&content);
        assert_eq!(record.fields().make.as_deref(), Some("Volkswagen"));
        assert_eq!(record.fields().model.as_deref(), Some("Beetle"));
        assert_eq!(record.fields().mileage, Some(88_000));
        assert_eq!(record.fields().price, Some(9_500));
        assert_eq!(record.image_urls(), ["https://cdn.example.com/beetle.jpg".to_string()]);
    }

    #[test]
    fn test_empty_content_is_low_confidence() {
        let content = FetchedContent::new("https://example.com", "", FetchStrategy::Markup);
        let record = extractor().extract(&content);
        assert!(record.fields_extracted().is_empty());
        assert!(record.is_low_confidence());
    }
}
