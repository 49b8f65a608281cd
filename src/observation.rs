//! Data structures representing a decoded METAR report.
//!
//! Every measurement is carried in all of its common units. The paired
//! values are always derived from one authoritative reading through the
//! constructors below, so they stay consistent with each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::convert;
use crate::derived::round_to;

/// Visibility reported when a METAR carries no visibility group, or says
/// `CAVOK`/`CLR`.
pub const DEFAULT_VISIBILITY_MILES: f64 = 10.0;

/// A wind speed in knots and meters per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Speed {
    pub kts: f64,
    pub mps: f64,
}

impl Speed {
    pub fn from_knots(kts: f64) -> Self {
        Self {
            kts,
            mps: convert::kts_to_mps(kts),
        }
    }

    pub fn from_mps(mps: f64) -> Self {
        Self {
            kts: convert::mps_to_kts(mps),
            mps,
        }
    }

    /// Kilometers per hour are not kept; the reading is stored as m/s.
    pub fn from_kph(kph: f64) -> Self {
        Self::from_mps(convert::kph_to_mps(kph))
    }
}

/// Surface wind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wind {
    /// Direction the wind blows from. `None` means variable or unknown.
    pub degrees: Option<u16>,

    /// Sustained speed.
    pub speed: Speed,

    /// Gust speed, if gusts were reported.
    pub gust: Option<Speed>,

    /// Start of the variable direction arc.
    pub degrees_from: Option<u16>,

    /// End of the variable direction arc.
    pub degrees_to: Option<u16>,
}

/// Prevailing visibility.
///
/// The `*_float` fields hold the exact value; `miles` and `meters` are
/// rounded for display (to 0.5 mi and 500 m respectively).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub miles: String,
    pub miles_float: f64,
    pub meters: String,
    pub meters_float: f64,
}

impl Visibility {
    pub fn from_miles(miles: f64) -> Self {
        Self::new(miles, convert::miles_to_meters(miles))
    }

    pub fn from_meters(meters: f64) -> Self {
        Self::new(convert::meters_to_miles(meters), meters)
    }

    fn new(miles: f64, meters: f64) -> Self {
        Self {
            miles: round_to(miles, 0.5).to_string(),
            miles_float: miles,
            meters: round_to(meters, 500.0).to_string(),
            meters_float: meters,
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::from_miles(DEFAULT_VISIBILITY_MILES)
    }
}

/// A single weather phenomenon code such as `+`, `VC`, `RA` or `FG`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    pub code: String,
}

impl Condition {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Cloud coverage, ordered from least to most coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudCode {
    /// Few, 1-2 octas
    Few,
    /// Scattered, 3-4 octas
    Sct,
    /// Broken, 5-7 octas
    Bkn,
    /// Overcast, 8 octas
    Ovc,
}

impl CloudCode {
    /// Broken and overcast layers constitute a ceiling.
    pub fn is_ceiling(self) -> bool {
        matches!(self, CloudCode::Bkn | CloudCode::Ovc)
    }
}

impl fmt::Display for CloudCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudCode::Few => write!(f, "FEW"),
            CloudCode::Sct => write!(f, "SCT"),
            CloudCode::Bkn => write!(f, "BKN"),
            CloudCode::Ovc => write!(f, "OVC"),
        }
    }
}

/// One cloud layer, with its base above ground level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CloudLayer {
    pub code: CloudCode,
    pub feet: u32,
    pub meters: f64,
}

impl CloudLayer {
    pub fn new(code: CloudCode, feet: u32) -> Self {
        Self {
            code,
            feet,
            meters: convert::feet_to_meters(f64::from(feet)),
        }
    }
}

/// A temperature in both scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub celsius: f64,
    pub fahrenheit: f64,
}

impl Temperature {
    pub fn from_celsius(celsius: f64) -> Self {
        Self {
            celsius,
            fahrenheit: convert::celsius_to_fahrenheit(celsius),
        }
    }
}

/// Altimeter setting in inches of mercury, kilopascals and millibars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Barometer {
    pub hg: f64,
    pub kpa: f64,
    pub mb: f64,
}

impl Barometer {
    /// From a `Q` group, e.g. `Q1012` is 1012 hPa.
    pub fn from_hectopascals(hpa: f64) -> Self {
        let kpa = hpa / 10.0;
        Self {
            hg: convert::kpa_to_inhg(kpa),
            kpa,
            mb: hpa,
        }
    }

    /// From an `A` group, e.g. `A3000` is 30.00 inHg.
    pub fn from_inches_hg_hundredths(hundredths: f64) -> Self {
        let hg = hundredths / 100.0;
        let kpa = convert::inhg_to_kpa(hg);
        Self {
            hg,
            kpa,
            mb: kpa * 10.0,
        }
    }
}

/// FAA flight category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightCategory {
    /// Visual flight rules
    Vfr,
    /// Marginal visual flight rules
    Mvfr,
    /// Instrument flight rules
    Ifr,
    /// Low instrument flight rules
    Lifr,
}

impl fmt::Display for FlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightCategory::Vfr => write!(f, "VFR"),
            FlightCategory::Mvfr => write!(f, "MVFR"),
            FlightCategory::Ifr => write!(f, "IFR"),
            FlightCategory::Lifr => write!(f, "LIFR"),
        }
    }
}

/// Simplified ICAO flight category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IcaoFlightCategory {
    Vfr,
    Ifr,
}

impl fmt::Display for IcaoFlightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IcaoFlightCategory::Vfr => write!(f, "VFR"),
            IcaoFlightCategory::Ifr => write!(f, "IFR"),
        }
    }
}

/// A decoded METAR report.
///
/// # Example
///
/// A raw report like:
/// ```text
/// EDDS 081620Z 29010KT 9999 FEW040TCU 09/M03 Q1012 NOSIG
/// ```
///
/// Would be decoded into an `Observation` with:
/// - `icao`: "EDDS"
/// - `wind.degrees`: Some(290), `wind.speed.kts`: 10.0
/// - `visibility.meters_float`: 9999.0
/// - `clouds`: one FEW layer at 4000 ft
/// - `temperature.celsius`: 9.0, `dewpoint.celsius`: -3.0
/// - `barometer.kpa`: 101.2
/// - `flight_category`: VFR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// The report exactly as it was handed to the parser.
    pub raw_text: String,

    /// The fields the classifier walked, after preprocessing.
    pub raw_parts: Vec<String>,

    /// Station identifier.
    pub icao: String,

    /// Observation time. Only day, hour and minute come from the report;
    /// year and month come from the reference time used for parsing.
    pub observed: DateTime<Utc>,

    pub wind: Wind,

    pub visibility: Visibility,

    /// Weather phenomena in report order.
    pub conditions: Vec<Condition>,

    /// Cloud layers in report order.
    pub clouds: Vec<CloudLayer>,

    /// Lowest broken or overcast layer.
    pub ceiling: Option<CloudLayer>,

    pub temperature: Option<Temperature>,

    pub dewpoint: Option<Temperature>,

    /// Relative humidity in percent, known only with both temperature and dewpoint.
    pub humidity_percent: Option<f64>,

    pub barometer: Option<Barometer>,

    pub flight_category: FlightCategory,

    pub icao_flight_category: IcaoFlightCategory,
}

/// The record while the classifier is still filling it in.
///
/// Holds everything except the fields computed at the end; see
/// [`ObservationDraft::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ObservationDraft {
    pub raw_text: String,
    pub raw_parts: Vec<String>,
    pub icao: String,
    pub observed: DateTime<Utc>,
    pub wind: Wind,
    pub visibility: Visibility,
    pub conditions: Vec<Condition>,
    pub clouds: Vec<CloudLayer>,
    pub temperature: Option<Temperature>,
    pub dewpoint: Option<Temperature>,
    pub humidity_percent: Option<f64>,
    pub barometer: Option<Barometer>,
}

impl ObservationDraft {
    pub fn new(raw_text: &str, raw_parts: Vec<String>, reference: DateTime<Utc>) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            raw_parts,
            icao: String::new(),
            observed: reference,
            wind: Wind::default(),
            visibility: Visibility::default(),
            conditions: Vec::new(),
            clouds: Vec::new(),
            temperature: None,
            dewpoint: None,
            humidity_percent: None,
            barometer: None,
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icao, self.observed.format("%d%H%MZ"))?;

        match self.wind.degrees {
            Some(degrees) => write!(f, " wind {:03}° {:.0}kt", degrees, self.wind.speed.kts)?,
            None => write!(f, " wind VRB {:.0}kt", self.wind.speed.kts)?,
        }
        if let Some(gust) = self.wind.gust {
            write!(f, " G{:.0}kt", gust.kts)?;
        }

        write!(
            f,
            " vis {}mi/{}m",
            self.visibility.miles, self.visibility.meters
        )?;

        for condition in &self.conditions {
            write!(f, " {}", condition.code)?;
        }
        for layer in &self.clouds {
            write!(f, " {}@{}ft", layer.code, layer.feet)?;
        }

        if let (Some(temp), Some(dew)) = (self.temperature, self.dewpoint) {
            write!(f, " {:.0}°C/{:.0}°C", temp.celsius, dew.celsius)?;
        }
        if let Some(humidity) = self.humidity_percent {
            write!(f, " RH {:.0}%", humidity)?;
        }
        if let Some(barometer) = self.barometer {
            write!(f, " {:.2}inHg/{:.0}hPa", barometer.hg, barometer.mb)?;
        }

        write!(
            f,
            " {} (ICAO {})",
            self.flight_category, self.icao_flight_category
        )
    }
}
