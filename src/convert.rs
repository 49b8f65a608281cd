//! Unit conversions used when expanding a METAR reading into every unit
//! carried by an [`Observation`](crate::observation::Observation).
//!
//! Each function is a single formula; none of them validate their input.

/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Meters in one foot.
pub const METERS_PER_FOOT: f64 = 0.3048;

/// Inches of mercury in one kilopascal.
pub const INHG_PER_KPA: f64 = 0.29529988;

/// Knots in one meter per second.
pub const KNOTS_PER_MPS: f64 = 1.9438445;

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

pub fn feet_to_meters(feet: f64) -> f64 {
    feet * METERS_PER_FOOT
}

pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

pub fn inhg_to_kpa(inhg: f64) -> f64 {
    inhg / INHG_PER_KPA
}

pub fn kpa_to_inhg(kpa: f64) -> f64 {
    kpa * INHG_PER_KPA
}

/// Kilometers per hour to meters per second.
pub fn kph_to_mps(kph: f64) -> f64 {
    kph / 3600.0 * 1000.0
}

pub fn mps_to_kts(mps: f64) -> f64 {
    mps * KNOTS_PER_MPS
}

pub fn kts_to_mps(kts: f64) -> f64 {
    kts / KNOTS_PER_MPS
}
