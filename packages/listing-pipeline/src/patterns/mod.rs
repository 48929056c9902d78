//! Pattern library.
//!
//! Stateless recognizers for vehicle and auction fields in free text. Each
//! recognizer tries its patterns in order and returns the first value that
//! passes the field's plausibility bounds; implausible matches are discarded
//! rather than clamped.

pub mod listing;
pub mod mileage;
pub mod price;
pub mod specs;
pub mod text;
pub mod vehicle;
pub mod vin;
pub mod year;

pub use listing::{find_lot_number, find_sale_status};
pub use mileage::{find_mileage, is_plausible_mileage};
pub use price::{find_price, is_plausible_price};
pub use specs::{find_body_style, find_colors, find_drivetrain, find_transmission};
pub use vehicle::{find_make, model_from_title, normalize_make};
pub use vin::{find_vin, is_valid_vin};
pub use year::{find_year, is_plausible_year, year_from_title};
