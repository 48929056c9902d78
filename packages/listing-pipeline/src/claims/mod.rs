//! Repair claims mined from listing descriptions.
//!
//! Descriptions often carry a sentence like "Work under current ownership
//! included a new clutch, rear brake calipers, rotors, and pads." Each item in
//! that list becomes one [`RepairClaim`], keyed by a content hash so that
//! re-mining an unchanged description writes nothing.

mod extractor;
mod runner;

pub use extractor::{ClaimText, RepairClaimExtractor};
pub use runner::{ClaimReport, ClaimRunner};
