//! Listing platforms recognised from the URL host.

use serde::{Deserialize, Serialize};
use url::Url;

/// What a direct fetch must contain before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralRequirement {
    /// Server-rendered state blob or element the page always carries
    Marker(&'static str),
    /// Minimum characters of visible text
    MinimumText(usize),
}

/// Minimum visible text for sites with no known marker.
pub const GENERIC_MIN_TEXT: usize = 500;

/// A listing platform. External listing records are keyed per platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    BringATrailer,
    CarsAndBids,
    PcarMarket,
    Hagerty,
    BarrettJackson,
    Mecum,
    Craigslist,
    Ebay,
    Generic,
}

impl Platform {
    /// Identify the platform from a URL. Unparseable URLs are `Generic`.
    pub fn from_url(url: &str) -> Self {
        let host = match Url::parse(url) {
            Ok(parsed) => parsed.host_str().unwrap_or_default().to_lowercase(),
            Err(_) => return Platform::Generic,
        };
        let host = host.trim_start_matches("www.");

        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if matches("bringatrailer.com") {
            Platform::BringATrailer
        } else if matches("carsandbids.com") {
            Platform::CarsAndBids
        } else if matches("pcarmarket.com") {
            Platform::PcarMarket
        } else if matches("hagerty.com") {
            Platform::Hagerty
        } else if matches("barrett-jackson.com") {
            Platform::BarrettJackson
        } else if matches("mecum.com") {
            Platform::Mecum
        } else if matches("craigslist.org") {
            Platform::Craigslist
        } else if matches("ebay.com") {
            Platform::Ebay
        } else {
            Platform::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::BringATrailer => "bat",
            Platform::CarsAndBids => "carsandbids",
            Platform::PcarMarket => "pcarmarket",
            Platform::Hagerty => "hagerty",
            Platform::BarrettJackson => "barrett_jackson",
            Platform::Mecum => "mecum",
            Platform::Craigslist => "craigslist",
            Platform::Ebay => "ebay",
            Platform::Generic => "generic",
        }
    }

    /// Inverse of [`Platform::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bat" => Some(Platform::BringATrailer),
            "carsandbids" => Some(Platform::CarsAndBids),
            "pcarmarket" => Some(Platform::PcarMarket),
            "hagerty" => Some(Platform::Hagerty),
            "barrett_jackson" => Some(Platform::BarrettJackson),
            "mecum" => Some(Platform::Mecum),
            "craigslist" => Some(Platform::Craigslist),
            "ebay" => Some(Platform::Ebay),
            "generic" => Some(Platform::Generic),
            _ => None,
        }
    }

    /// Structure a direct (unrendered) response must show to be accepted.
    pub fn direct_requirement(&self) -> StructuralRequirement {
        match self {
            Platform::BringATrailer => StructuralRequirement::Marker("listing-essentials"),
            Platform::CarsAndBids => StructuralRequirement::Marker("__NEXT_DATA__"),
            Platform::PcarMarket => StructuralRequirement::Marker("__NEXT_DATA__"),
            Platform::Hagerty => StructuralRequirement::Marker("__NEXT_DATA__"),
            Platform::Mecum => StructuralRequirement::Marker("__NEXT_DATA__"),
            Platform::BarrettJackson => StructuralRequirement::Marker("application/ld+json"),
            Platform::Craigslist => StructuralRequirement::Marker("postingbody"),
            Platform::Ebay => StructuralRequirement::Marker("x-item-title"),
            Platform::Generic => StructuralRequirement::MinimumText(GENERIC_MIN_TEXT),
        }
    }
}
