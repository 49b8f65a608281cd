//! Values computed from the classified fields of a report: ceiling,
//! relative humidity and the flight categories.
//!
//! These run once the classifier has walked every field, except humidity,
//! which is computed as soon as the temperature group is read.

use crate::observation::{
    CloudLayer, FlightCategory, IcaoFlightCategory, Observation, ObservationDraft,
};

/// Round `value` to the nearest multiple of `step`, halves rounding up.
pub fn round_to(value: f64, step: f64) -> f64 {
    (value / step + 0.5).floor() * step
}

/// Relative humidity in percent from temperature and dewpoint in Celsius.
///
/// Uses the Magnus approximation with the Alduchov and Eskridge constants.
pub fn humidity_percent(temperature: f64, dewpoint: f64) -> f64 {
    let saturation = |t: f64| (17.625 * t / (243.04 + t)).exp();
    saturation(dewpoint) / saturation(temperature) * 100.0
}

/// The first broken or overcast layer in report order.
///
/// Reports list layers bottom to top, so this is the lowest ceiling layer.
pub fn find_ceiling(clouds: &[CloudLayer]) -> Option<CloudLayer> {
    clouds.iter().find(|layer| layer.code.is_ceiling()).copied()
}

impl FlightCategory {
    /// Classify from visibility in statute miles and ceiling in feet.
    pub fn classify(visibility_miles: f64, ceiling_feet: Option<u32>) -> Self {
        let ceiling_above = |limit: u32| ceiling_feet.is_none_or(|feet| feet > limit);
        let ceiling_at_least = |limit: u32| ceiling_feet.is_none_or(|feet| feet >= limit);

        if visibility_miles > 5.0 && ceiling_above(3000) {
            FlightCategory::Vfr
        } else if visibility_miles >= 3.0 && ceiling_at_least(1000) {
            FlightCategory::Mvfr
        } else if visibility_miles >= 1.0 && ceiling_at_least(500) {
            FlightCategory::Ifr
        } else {
            FlightCategory::Lifr
        }
    }
}

impl IcaoFlightCategory {
    /// Classify from visibility in meters and ceiling in feet.
    pub fn classify(visibility_meters: f64, ceiling_feet: Option<u32>) -> Self {
        if visibility_meters >= 5000.0 && ceiling_feet.is_none_or(|feet| feet >= 1500) {
            IcaoFlightCategory::Vfr
        } else {
            IcaoFlightCategory::Ifr
        }
    }
}

impl ObservationDraft {
    /// Compute the ceiling, then both flight categories, and seal the record.
    pub fn finalize(self) -> Observation {
        let ceiling = find_ceiling(&self.clouds);
        let ceiling_feet = ceiling.map(|layer| layer.feet);

        let flight_category = FlightCategory::classify(self.visibility.miles_float, ceiling_feet);
        let icao_flight_category =
            IcaoFlightCategory::classify(self.visibility.meters_float, ceiling_feet);

        Observation {
            raw_text: self.raw_text,
            raw_parts: self.raw_parts,
            icao: self.icao,
            observed: self.observed,
            wind: self.wind,
            visibility: self.visibility,
            conditions: self.conditions,
            clouds: self.clouds,
            ceiling,
            temperature: self.temperature,
            dewpoint: self.dewpoint,
            humidity_percent: self.humidity_percent,
            barometer: self.barometer,
            flight_category,
            icao_flight_category,
        }
    }
}
