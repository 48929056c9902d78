//! Embedded structured data: JSON-LD blocks and `__NEXT_DATA__` blobs.
//!
//! Both sources are loosely shaped and change without notice. Every field is
//! modelled as an optional [`Scalar`] that accepts any JSON value, so a
//! surprising shape loses that one field instead of the whole record.

use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::patterns::{
    is_plausible_mileage, is_plausible_price, is_plausible_year, is_valid_vin, normalize_make,
};
use crate::types::{SaleStatus, VehicleFields};

const VEHICLE_TYPES: &[&str] = &["Car", "Vehicle", "Motorcycle", "Product", "IndividualProduct"];

/// Keys that mark an object inside a hydration blob as the listing itself.
const LISTING_KEYS: &[&str] = &[
    "vin", "year", "modelYear", "make", "model", "mileage", "odometer", "currentBid", "lotNumber",
];

const MAX_DEPTH: usize = 16;

/// Any JSON value, read through typed accessors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Scalar {
    /// Text form. Objects are read through `name`, `url`, `contentUrl` or `value`.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Scalar::Number(n) => n.to_string(),
            Scalar::Other(Value::Object(map)) => ["name", "url", "contentUrl", "value"]
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))?
                .trim()
                .to_string(),
            Scalar::Other(_) => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    /// Integer form. Strings are stripped of currency and separators;
    /// objects are read through `value`, `price` or `amount`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(n.round() as i64),
            Scalar::Number(_) => None,
            Scalar::Text(s) => {
                let digits: String = s
                    .chars()
                    .take_while(|c| *c != '.')
                    .filter(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            }
            Scalar::Other(Value::Object(map)) => ["value", "price", "amount"]
                .iter()
                .find_map(|k| map.get(*k))
                .and_then(|v| serde_json::from_value::<Scalar>(v.clone()).ok())
                .and_then(|s| s.as_i64()),
            Scalar::Other(_) => None,
        }
    }
}

/// A JSON value that may be a single item or an array of items.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::Many(items) => items.iter(),
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
        }
    }
}

/// schema.org Car / Vehicle / Product.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LdVehicle {
    #[serde(rename = "@type")]
    pub kind: Option<OneOrMany<Scalar>>,
    pub name: Option<Scalar>,
    pub description: Option<Scalar>,
    pub brand: Option<Scalar>,
    pub manufacturer: Option<Scalar>,
    pub model: Option<Scalar>,
    pub vehicle_identification_number: Option<Scalar>,
    pub vehicle_model_date: Option<Scalar>,
    pub model_date: Option<Scalar>,
    pub production_date: Option<Scalar>,
    pub mileage_from_odometer: Option<Scalar>,
    pub color: Option<Scalar>,
    pub vehicle_interior_color: Option<Scalar>,
    pub vehicle_transmission: Option<Scalar>,
    pub drive_wheel_configuration: Option<Scalar>,
    pub body_type: Option<Scalar>,
    pub offers: Option<OneOrMany<Scalar>>,
    pub image: Option<OneOrMany<Scalar>>,
}

/// The listing object inside a Next.js hydration blob.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextListing {
    pub title: Option<Scalar>,
    pub description: Option<Scalar>,
    pub year: Option<Scalar>,
    pub model_year: Option<Scalar>,
    pub make: Option<Scalar>,
    pub model: Option<Scalar>,
    pub vin: Option<Scalar>,
    pub mileage: Option<Scalar>,
    pub odometer: Option<Scalar>,
    pub exterior_color: Option<Scalar>,
    pub interior_color: Option<Scalar>,
    pub transmission: Option<Scalar>,
    pub drivetrain: Option<Scalar>,
    pub body_style: Option<Scalar>,
    pub sold_price: Option<Scalar>,
    pub current_bid: Option<Scalar>,
    pub price: Option<Scalar>,
    pub lot_number: Option<Scalar>,
    pub status: Option<Scalar>,
    pub photos: Option<OneOrMany<Scalar>>,
}

/// Fields recovered from embedded data.
#[derive(Debug, Default)]
pub struct StructuredData {
    pub fields: VehicleFields,
}

impl StructuredData {
    /// Whether the record's identity came from embedded data.
    pub fn is_identifying(&self) -> bool {
        self.fields.vin.is_some() || (self.fields.year.is_some() && self.fields.make.is_some())
    }
}

fn text(value: &Option<Scalar>) -> Option<String> {
    value.as_ref().and_then(Scalar::as_text)
}

fn first_year(values: &[&Option<Scalar>], current_year: i32) -> Option<i32> {
    values
        .iter()
        .copied()
        .filter_map(Option::as_ref)
        .filter_map(|s| {
            // "1967", 1967, "1967-01-01"
            s.as_text()
                .and_then(|t| t.get(..4).and_then(|y| y.parse::<i32>().ok()))
        })
        .find(|y| is_plausible_year(*y, current_year))
}

fn make_name(raw: Option<String>) -> Option<String> {
    raw.map(|m| normalize_make(&m).map(str::to_string).unwrap_or(m))
}

fn vin(value: &Option<Scalar>) -> Option<String> {
    text(value)
        .map(|v| v.to_uppercase())
        .filter(|v| is_valid_vin(v))
}

fn sale_status(value: Option<String>) -> Option<SaleStatus> {
    let lower = value?.to_lowercase().replace([' ', '-'], "_");
    match lower.as_str() {
        "sold" => Some(SaleStatus::Sold),
        "not_sold" | "reserve_not_met" | "unsold" => Some(SaleStatus::NotSold),
        "bid_to" => Some(SaleStatus::BidTo),
        "live" | "active" | "open" => Some(SaleStatus::Live),
        _ => None,
    }
}

fn images(values: &Option<OneOrMany<Scalar>>) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.iter())
        .filter_map(Scalar::as_text)
        .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
        .collect()
}

impl LdVehicle {
    fn is_vehicle(&self) -> bool {
        self.kind.as_ref().is_some_and(|kinds| {
            kinds
                .iter()
                .filter_map(Scalar::as_text)
                .any(|k| VEHICLE_TYPES.contains(&k.as_str()))
        })
    }

    fn into_fields(self, current_year: i32) -> VehicleFields {
        let price = self
            .offers
            .iter()
            .flat_map(|o| o.iter())
            .filter_map(Scalar::as_i64)
            .find(|p| is_plausible_price(*p));

        VehicleFields {
            title: text(&self.name),
            year: first_year(
                &[&self.vehicle_model_date, &self.model_date, &self.production_date],
                current_year,
            ),
            make: make_name(text(&self.brand).or_else(|| text(&self.manufacturer))),
            model: text(&self.model),
            vin: vin(&self.vehicle_identification_number),
            mileage: self
                .mileage_from_odometer
                .as_ref()
                .and_then(Scalar::as_i64)
                .filter(|m| is_plausible_mileage(*m)),
            price,
            exterior_color: text(&self.color),
            interior_color: text(&self.vehicle_interior_color),
            transmission: text(&self.vehicle_transmission),
            drivetrain: text(&self.drive_wheel_configuration),
            body_style: text(&self.body_type),
            description: text(&self.description),
            image_urls: images(&self.image),
            ..Default::default()
        }
    }
}

impl NextListing {
    fn into_fields(self, current_year: i32) -> VehicleFields {
        let price = [&self.sold_price, &self.current_bid, &self.price]
            .into_iter()
            .filter_map(|v| v.as_ref().and_then(Scalar::as_i64))
            .find(|p| is_plausible_price(*p));
        let mileage = [&self.mileage, &self.odometer]
            .into_iter()
            .filter_map(|v| v.as_ref().and_then(Scalar::as_i64))
            .find(|m| is_plausible_mileage(*m));

        VehicleFields {
            title: text(&self.title),
            year: first_year(&[&self.year, &self.model_year], current_year),
            make: make_name(text(&self.make)),
            model: text(&self.model),
            vin: vin(&self.vin),
            mileage,
            price,
            exterior_color: text(&self.exterior_color),
            interior_color: text(&self.interior_color),
            transmission: text(&self.transmission),
            drivetrain: text(&self.drivetrain),
            body_style: text(&self.body_style),
            description: text(&self.description),
            lot_number: text(&self.lot_number),
            sale_status: sale_status(text(&self.status)),
            image_urls: images(&self.photos),
        }
    }
}

fn script_bodies(document: &Html, selector: &str) -> Vec<String> {
    match Selector::parse(selector) {
        Ok(selector) => document
            .select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn collect_ld_nodes(value: Value, out: &mut Vec<Value>, depth: usize) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Array(items) => {
            for item in items {
                collect_ld_nodes(item, out, depth + 1);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                collect_ld_nodes(graph, out, depth + 1);
            }
            out.push(Value::Object(map));
        }
        _ => {}
    }
}

/// The object in a hydration blob carrying the most listing keys.
fn find_listing_object(value: &Value, depth: usize) -> Option<(usize, &Value)> {
    if depth > MAX_DEPTH {
        return None;
    }
    let own = match value {
        Value::Object(map) => {
            let hits = LISTING_KEYS.iter().filter(|k| map.contains_key(**k)).count();
            (hits >= 2).then_some((hits, value))
        }
        _ => None,
    };
    let children: Vec<&Value> = match value {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        _ => Vec::new(),
    };

    children
        .into_iter()
        .filter_map(|child| find_listing_object(child, depth + 1))
        .chain(own)
        .max_by_key(|(hits, _)| *hits)
}

/// Parse all embedded data in a document into one set of fields.
///
/// JSON-LD is read first; the hydration blob fills what it left empty.
pub fn extract_structured(document: &Html, current_year: i32) -> StructuredData {
    let mut fields = VehicleFields::default();

    let mut nodes = Vec::new();
    for body in script_bodies(document, "script[type='application/ld+json']") {
        match serde_json::from_str::<Value>(body.trim()) {
            Ok(value) => collect_ld_nodes(value, &mut nodes, 0),
            Err(e) => tracing::debug!(error = %e, "Skipping unparseable JSON-LD block"),
        }
    }
    for node in nodes {
        if let Ok(vehicle) = serde_json::from_value::<LdVehicle>(node) {
            if vehicle.is_vehicle() {
                fields.fill_from(vehicle.into_fields(current_year));
            }
        }
    }

    for body in script_bodies(document, "script#__NEXT_DATA__") {
        let Ok(value) = serde_json::from_str::<Value>(body.trim()) else {
            tracing::debug!("Skipping unparseable __NEXT_DATA__ blob");
            continue;
        };
        if let Some((_, listing)) = find_listing_object(&value, 0) {
            if let Ok(listing) = serde_json::from_value::<NextListing>(listing.clone()) {
                fields.fill_from(listing.into_fields(current_year));
            }
        }
    }

    StructuredData { fields }
}
