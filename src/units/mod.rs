//! Unit conversions
//!
//! The engine works in metric throughout (mm, m/min, mm/min, cm³/min, kW).
//! These helpers translate to and from the imperial values shops still quote.

use serde::{Deserialize, Serialize};
use uom::si::f64::{Length, Power, Volume};
use uom::si::length::{foot, inch, meter, millimeter};
use uom::si::power::{horsepower, kilowatt};
use uom::si::volume::{cubic_centimeter, cubic_inch};

pub mod fractions;

pub use fractions::*;

/// Unit system for formulas that accept either metric or imperial inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    /// m/min and mm
    #[default]
    Metric,
    /// ft/min and inches
    Imperial,
}

pub fn mm_to_inches(mm: f64) -> f64 {
    Length::new::<millimeter>(mm).get::<inch>()
}

pub fn inches_to_mm(inches: f64) -> f64 {
    Length::new::<inch>(inches).get::<millimeter>()
}

/// Thousandths of an inch to millimeters
pub fn thou_to_mm(thou: f64) -> f64 {
    inches_to_mm(thou / 1000.0)
}

pub fn mm_to_thou(mm: f64) -> f64 {
    mm_to_inches(mm) * 1000.0
}

/// Surface meters per minute to surface feet per minute
pub fn smm_to_sfm(smm: f64) -> f64 {
    // Both are "per minute", so only the length part converts.
    Length::new::<meter>(smm).get::<foot>()
}

/// Surface feet per minute to surface meters per minute
pub fn sfm_to_smm(sfm: f64) -> f64 {
    Length::new::<foot>(sfm).get::<meter>()
}

/// Feed rate mm/min to inches per minute
pub fn mm_per_min_to_ipm(feed: f64) -> f64 {
    mm_to_inches(feed)
}

pub fn ipm_to_mm_per_min(feed: f64) -> f64 {
    inches_to_mm(feed)
}

/// Material removal rate cm³/min to in³/min
pub fn cm3_to_in3(mrr: f64) -> f64 {
    Volume::new::<cubic_centimeter>(mrr).get::<cubic_inch>()
}

pub fn in3_to_cm3(mrr: f64) -> f64 {
    Volume::new::<cubic_inch>(mrr).get::<cubic_centimeter>()
}

pub fn kw_to_hp(kw: f64) -> f64 {
    Power::new::<kilowatt>(kw).get::<horsepower>()
}

pub fn hp_to_kw(hp: f64) -> f64 {
    Power::new::<horsepower>(hp).get::<kilowatt>()
}
