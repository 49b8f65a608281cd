//! Parser for METAR aviation routine weather reports.
//!
//! A METAR has no field separators beyond whitespace and any group may be
//! omitted, so the parser walks the fields left to right through a fixed
//! sequence of [`Mode`]s. Each mode consumes zero or more fields of one
//! kind. A field that belongs to a later group makes the parser skip ahead
//! before the field is consumed; a field that matches nothing is ignored.
//!
//! Individual groups are recognized with small `nom` parsers.
//!
//! # Report Format
//!
//! ```text
//! [METAR] STATION DDHHMMZ [AUTO] WIND [VAR] VIS [WX...] [CLOUDS...] TT/DD PRESSURE [RMK ...]
//! ```
//!
//! Example:
//! ```text
//! METAR LBBG 041600Z 12012MPS 090V150 1400 R04/P1500N +SN BKN022 OVC050 M04/M07 Q1020 NOSIG
//! ```

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, digit1},
    combinator::{all_consuming, map, map_res, opt, value, verify},
    multi::many_m_n,
    sequence::{preceded, separated_pair},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::trace;

use crate::derived::humidity_percent;
use crate::observation::{
    Barometer, CloudCode, CloudLayer, Condition, Observation, ObservationDraft, Speed,
    Temperature, Visibility, Wind,
};

/// Fewest fields a report must have to be decoded.
pub const MIN_FIELDS: usize = 3;

/// Placeholder reported in place of a missing temperature group.
const MISSING_TEMPERATURE: &str = "/////";

/// Errors that can occur during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Not enough METAR information found: {found} field(s), need at least {required}")]
    NotEnoughFields { found: usize, required: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// The group the classifier expects next.
///
/// Modes only ever move forward during a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Station,
    Time,
    Wind,
    Visibility,
    Conditions,
    Clouds,
    Temperature,
    Pressure,
    /// Everything after the pressure group (remarks, trends) is ignored.
    Done,
}

impl Mode {
    /// Position of this mode in the sequence, 0 through 8.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Jump past groups the report left out.
    ///
    /// If `field` looks like a visibility, a cloud layer or a temperature
    /// group while an earlier mode is active, the groups in between were
    /// omitted. The checks run in that order and each may move the mode
    /// further.
    pub fn skip_ahead(self, field: &str) -> Mode {
        let mut mode = self;
        if mode < Mode::Visibility && is_visibility(field) {
            mode = Mode::Visibility;
        }
        if mode < Mode::Clouds && is_cloud_layer(field) {
            mode = Mode::Clouds;
        }
        if mode < Mode::Temperature && is_temperature(field) {
            mode = Mode::Temperature;
        }
        mode
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Station => write!(f, "station"),
            Mode::Time => write!(f, "time"),
            Mode::Wind => write!(f, "wind"),
            Mode::Visibility => write!(f, "visibility"),
            Mode::Conditions => write!(f, "conditions"),
            Mode::Clouds => write!(f, "clouds"),
            Mode::Temperature => write!(f, "temperature"),
            Mode::Pressure => write!(f, "pressure"),
            Mode::Done => write!(f, "done"),
        }
    }
}

/// What happened to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The field matched and the classifier moved to the next mode.
    Advanced,
    /// The field matched and the mode accepts more fields of its kind.
    Matched,
    /// The field did not match the mode and was ignored.
    Skipped,
}

/// How one field of a report was classified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldClass {
    pub field: String,
    /// The mode the field was consumed in, after any skip-ahead.
    pub mode: Mode,
    pub outcome: Outcome,
}

impl fmt::Display for FieldClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.outcome {
            Outcome::Advanced => "advanced",
            Outcome::Matched => "matched",
            Outcome::Skipped => "skipped",
        };
        write!(f, "{:<12} {} ({})", self.field, self.mode, outcome)
    }
}

// ---------------------------------------------------------------------------
// Field matchers

/// Run `parser` over the whole field.
fn full<'a, O>(
    field: &'a str,
    parser: impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
) -> Option<O> {
    all_consuming(parser).parse(field).ok().map(|(_, out)| out)
}

/// Run `parser` over the start of the field, ignoring anything after it.
fn leading<'a, O>(
    field: &'a str,
    mut parser: impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
) -> Option<O> {
    parser.parse(field).ok().map(|(_, out)| out)
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn fixed_digits(input: &str, count: usize) -> IResult<&str, u32> {
    map_res(take_while_m_n(count, count, is_digit), |s: &str| s.parse::<u32>()).parse(input)
}

fn two_digits(input: &str) -> IResult<&str, u32> {
    fixed_digits(input, 2)
}

fn number(input: &str) -> IResult<&str, f64> {
    map_res(digit1, |s: &str| s.parse::<f64>()).parse(input)
}

fn degrees(input: &str) -> IResult<&str, u16> {
    map_res(digit1, |s: &str| s.parse::<u16>()).parse(input)
}

/// Day, hour and minute from a `DDHHMMZ` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimeGroup {
    day: u32,
    hour: u32,
    minute: u32,
}

impl TimeGroup {
    /// Place the group in the month of `reference`.
    ///
    /// Out-of-range values roll over into the neighbouring day or month.
    fn resolve(self, reference: DateTime<Utc>) -> DateTime<Utc> {
        let date = reference.date_naive();
        let month_start = date.with_day(1).unwrap_or(date).and_time(NaiveTime::MIN).and_utc();
        month_start
            + Duration::days(i64::from(self.day) - 1)
            + Duration::hours(i64::from(self.hour))
            + Duration::minutes(i64::from(self.minute))
    }
}

fn time_group(input: &str) -> IResult<&str, TimeGroup> {
    map(
        (two_digits, two_digits, two_digits, char('Z')),
        |(day, hour, minute, _)| TimeGroup { day, hour, minute },
    )
    .parse(input)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpeedUnit {
    Knots,
    MetersPerSecond,
    KilometersPerHour,
}

impl SpeedUnit {
    fn speed(self, value: f64) -> Speed {
        match self {
            SpeedUnit::Knots => Speed::from_knots(value),
            SpeedUnit::MetersPerSecond => Speed::from_mps(value),
            SpeedUnit::KilometersPerHour => Speed::from_kph(value),
        }
    }
}

/// Direction, speed and gust from a group like `02013G17KT`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindGroup {
    degrees: Option<u16>,
    speed: Speed,
    gust: Option<Speed>,
}

fn wind_direction(input: &str) -> IResult<&str, Option<u16>> {
    alt((
        value(None, tag("VRB")),
        map(
            map_res(take_while_m_n(3, 3, is_digit), |s: &str| s.parse::<u16>()),
            Some,
        ),
    ))
    .parse(input)
}

fn speed_unit(input: &str) -> IResult<&str, SpeedUnit> {
    alt((
        value(SpeedUnit::Knots, tag("KT")),
        value(SpeedUnit::MetersPerSecond, tag("MPS")),
        value(SpeedUnit::KilometersPerHour, tag("KPH")),
    ))
    .parse(input)
}

fn wind_group(input: &str) -> IResult<&str, WindGroup> {
    map(
        (
            wind_direction,
            opt(alt((char('P'), char('>')))),
            number,
            opt(preceded(char('G'), number)),
            speed_unit,
        ),
        |(degrees, _, speed, gust, unit)| WindGroup {
            degrees,
            speed: unit.speed(speed),
            gust: gust.map(|gust| unit.speed(gust)),
        },
    )
    .parse(input)
}

/// A distance such as `9999`, `10SM` or `3/2SM`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VisibilityGroup {
    distance: f64,
    statute_miles: bool,
}

impl VisibilityGroup {
    fn visibility(self) -> Visibility {
        if self.statute_miles {
            Visibility::from_miles(self.distance)
        } else {
            Visibility::from_meters(self.distance)
        }
    }
}

fn visibility_group(input: &str) -> IResult<&str, VisibilityGroup> {
    map(
        (
            number,
            opt(preceded(char('/'), verify(number, |d: &f64| *d != 0.0))),
            opt(tag("SM")),
        ),
        |(distance, denominator, unit)| VisibilityGroup {
            distance: denominator.map_or(distance, |d| distance / d),
            statute_miles: unit.is_some(),
        },
    )
    .parse(input)
}

/// Variable wind direction arc, e.g. `090V150`.
fn variable_arc(input: &str) -> IResult<&str, (u16, u16)> {
    separated_pair(degrees, char('V'), degrees).parse(input)
}

fn intensity(input: &str) -> IResult<&str, &str> {
    alt((tag("+"), tag("-"), tag("VC"), tag("RE"))).parse(input)
}

fn phenomenon(input: &str) -> IResult<&str, &str> {
    take_while_m_n(2, 2, |c: char| c.is_ascii_uppercase()).parse(input)
}

fn prefixed_conditions(input: &str) -> IResult<&str, Vec<&str>> {
    let (input, prefix) = intensity(input)?;
    let (input, mut codes) = many_m_n(1, 3, phenomenon).parse(input)?;
    codes.insert(0, prefix);
    Ok((input, codes))
}

/// Weather codes like `+SN`, `VCTS` or `FZFG`, split into their parts.
fn condition_group(input: &str) -> IResult<&str, Vec<&str>> {
    alt((
        all_consuming(prefixed_conditions),
        all_consuming(many_m_n(1, 3, phenomenon)),
    ))
    .parse(input)
}

fn cloud_code(input: &str) -> IResult<&str, CloudCode> {
    alt((
        value(CloudCode::Few, tag("FEW")),
        value(CloudCode::Sct, tag("SCT")),
        value(CloudCode::Bkn, tag("BKN")),
        value(CloudCode::Ovc, tag("OVC")),
    ))
    .parse(input)
}

/// A layer like `BKN022`; trailing cloud types (`TCU`, `CB`) are ignored.
fn cloud_layer(input: &str) -> IResult<&str, CloudLayer> {
    map(
        (cloud_code, map_res(digit1, |s: &str| s.parse::<u32>())),
        |(code, hundreds)| CloudLayer::new(code, hundreds.saturating_mul(100)),
    )
    .parse(input)
}

fn signed_celsius(input: &str) -> IResult<&str, f64> {
    map((opt(char('M')), number), |(minus, celsius)| {
        if minus.is_some() { -celsius } else { celsius }
    })
    .parse(input)
}

/// Temperature and dewpoint, e.g. `09/M03`.
fn temperature_group(input: &str) -> IResult<&str, (f64, f64)> {
    separated_pair(signed_celsius, char('/'), signed_celsius).parse(input)
}

/// `Q1012` (hectopascals) or `A2992` (hundredths of inches of mercury).
fn pressure_group(input: &str) -> IResult<&str, Barometer> {
    alt((
        map(preceded(char('Q'), number), Barometer::from_hectopascals),
        map(preceded(char('A'), number), Barometer::from_inches_hg_hundredths),
    ))
    .parse(input)
}

fn is_visibility(field: &str) -> bool {
    full(field, visibility_group).is_some()
}

fn is_cloud_layer(field: &str) -> bool {
    leading(field, cloud_code).is_some()
}

fn is_temperature(field: &str) -> bool {
    full(field, temperature_group).is_some() || field.starts_with(MISSING_TEMPERATURE)
}

// ---------------------------------------------------------------------------
// Preprocessing

fn single_digit(input: &str) -> IResult<&str, u32> {
    fixed_digits(input, 1)
}

/// Combine `1` and `1/2SM` into `3/2SM`.
fn mixed_fraction(whole: &str, fraction: &str) -> Option<String> {
    let whole = full(whole, single_digit)?;
    let (rest, (numerator, _, denominator, _)) =
        (single_digit, char('/'), single_digit, tag("SM"))
            .parse(fraction)
            .ok()?;
    Some(format!(
        "{}/{}SM{}",
        whole * denominator + numerator,
        denominator,
        rest
    ))
}

/// Split a raw report into the fields the classifier walks.
///
/// Drops a leading `METAR`/`SPECI` marker (and a `COR` modifier after it)
/// and rewrites mixed-number visibilities such as `1 1/2SM`, whose
/// internal space would otherwise split one group in two.
pub fn preprocess(report: &str) -> Vec<String> {
    let mut fields: Vec<&str> = report.split_whitespace().collect();

    if fields.len() > 1
        && fields
            .first()
            .is_some_and(|f| f.starts_with("METAR") || f.starts_with("SPECI"))
    {
        fields.remove(0);
        if fields.first() == Some(&"COR") {
            fields.remove(0);
        }
    }

    let mut merged = Vec::with_capacity(fields.len());
    let mut index = 0;
    while index < fields.len() {
        if index > 0
            && let Some(next) = fields.get(index + 1)
            && let Some(combined) = mixed_fraction(fields[index], next)
        {
            merged.push(combined);
            index += 2;
            continue;
        }
        merged.push(fields[index].to_string());
        index += 1;
    }
    merged
}

// ---------------------------------------------------------------------------
// Classifier

enum Step {
    Advance(Mode),
    Stay,
    Skip,
}

struct Classifier {
    mode: Mode,
    draft: ObservationDraft,
    wind_reported: bool,
    reference: DateTime<Utc>,
}

impl Classifier {
    fn new(draft: ObservationDraft, reference: DateTime<Utc>) -> Self {
        Self {
            mode: Mode::Station,
            draft,
            wind_reported: false,
            reference,
        }
    }

    fn feed(&mut self, field: &str) -> FieldClass {
        let mode = self.mode.skip_ahead(field);
        if mode != self.mode {
            trace!(field, from = %self.mode, to = %mode, "group omitted, skipping ahead");
            self.mode = mode;
        }

        let outcome = match self.consume(field) {
            Step::Advance(next) => {
                trace!(field, mode = %mode, next = %next, "field consumed");
                self.mode = next;
                Outcome::Advanced
            }
            Step::Stay => {
                trace!(field, mode = %mode, "field consumed");
                Outcome::Matched
            }
            Step::Skip => {
                trace!(field, mode = %mode, "field ignored");
                Outcome::Skipped
            }
        };

        FieldClass {
            field: field.to_string(),
            mode,
            outcome,
        }
    }

    fn consume(&mut self, field: &str) -> Step {
        match self.mode {
            Mode::Station => {
                self.draft.icao = field.to_string();
                Step::Advance(Mode::Time)
            }

            Mode::Time => match full(field, time_group) {
                Some(time) => {
                    self.draft.observed = time.resolve(self.reference);
                    Step::Advance(Mode::Wind)
                }
                None => Step::Skip,
            },

            Mode::Wind => match leading(field, wind_group) {
                Some(group) => {
                    let variable = group.degrees.is_none();
                    self.draft.wind = Wind {
                        degrees: group.degrees,
                        speed: group.speed,
                        gust: group.gust,
                        degrees_from: variable.then_some(0),
                        degrees_to: variable.then_some(359),
                    };
                    self.wind_reported = true;
                    Step::Advance(Mode::Visibility)
                }
                None => Step::Skip,
            },

            Mode::Visibility => {
                if let Some(group) = full(field, visibility_group) {
                    self.draft.visibility = group.visibility();
                    Step::Advance(Mode::Conditions)
                } else if field == "CAVOK" || field == "CLR" {
                    self.draft.visibility = Visibility::default();
                    Step::Advance(Mode::Clouds)
                } else if self.wind_reported
                    && let Some((from, to)) = full(field, variable_arc)
                {
                    self.draft.wind.degrees_from = Some(from);
                    self.draft.wind.degrees_to = Some(to);
                    Step::Stay
                } else {
                    Step::Skip
                }
            }

            Mode::Conditions => match leading(field, condition_group) {
                Some(codes) => {
                    self.draft
                        .conditions
                        .extend(codes.into_iter().map(Condition::new));
                    Step::Stay
                }
                None => Step::Skip,
            },

            Mode::Clouds => match leading(field, cloud_layer) {
                Some(layer) => {
                    self.draft.clouds.push(layer);
                    Step::Stay
                }
                None => Step::Skip,
            },

            Mode::Temperature => {
                if let Some((temperature, dewpoint)) = full(field, temperature_group) {
                    self.draft.temperature = Some(Temperature::from_celsius(temperature));
                    self.draft.dewpoint = Some(Temperature::from_celsius(dewpoint));
                    self.draft.humidity_percent = Some(humidity_percent(temperature, dewpoint));
                    Step::Advance(Mode::Pressure)
                } else if field == MISSING_TEMPERATURE {
                    Step::Advance(Mode::Pressure)
                } else {
                    Step::Skip
                }
            }

            Mode::Pressure => match leading(field, pressure_group) {
                Some(barometer) => {
                    self.draft.barometer = Some(barometer);
                    Step::Advance(Mode::Done)
                }
                None => Step::Skip,
            },

            Mode::Done => Step::Skip,
        }
    }
}

fn decode(report: &str, reference: DateTime<Utc>) -> ParseResult<(Observation, Vec<FieldClass>)> {
    let fields = preprocess(report);
    if fields.len() < MIN_FIELDS {
        return Err(ParseError::NotEnoughFields {
            found: fields.len(),
            required: MIN_FIELDS,
        });
    }

    let draft = ObservationDraft::new(report, fields.clone(), reference);
    let mut classifier = Classifier::new(draft, reference);
    let trail = fields.iter().map(|field| classifier.feed(field)).collect();

    Ok((classifier.draft.finalize(), trail))
}

/// Decode a METAR report.
///
/// The day, hour and minute of the report are placed in the current UTC
/// month. Use [`parse_metar_at`] to supply the calendar context.
///
/// # Example
///
/// ```
/// use metar_decoder::parser::parse_metar;
/// use metar_decoder::observation::FlightCategory;
///
/// let report = "KEYW 041053Z AUTO 13005KT 10SM CLR 24/22 A3000 RMK AO2";
/// let observation = parse_metar(report).unwrap();
/// assert_eq!(observation.icao, "KEYW");
/// assert_eq!(observation.wind.degrees, Some(130));
/// assert_eq!(observation.flight_category, FlightCategory::Vfr);
/// ```
pub fn parse_metar(report: &str) -> ParseResult<Observation> {
    parse_metar_at(report, Utc::now())
}

/// Decode a METAR report, taking year and month from `reference`.
///
/// Without a time group, `observed` is `reference` itself.
pub fn parse_metar_at(report: &str, reference: DateTime<Utc>) -> ParseResult<Observation> {
    decode(report, reference).map(|(observation, _)| observation)
}

/// Show how each field of a report is classified.
pub fn explain(report: &str) -> ParseResult<Vec<FieldClass>> {
    decode(report, Utc::now()).map(|(_, trail)| trail)
}

/// Check if a line looks like a METAR (quick pre-filter).
///
/// Requires enough fields and a `DDHHMMZ` time group somewhere in them.
pub fn looks_like_metar(line: &str) -> bool {
    let fields = preprocess(line);
    fields.len() >= MIN_FIELDS && fields.iter().any(|f| full(f, time_group).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert;
    use crate::observation::{FlightCategory, IcaoFlightCategory};
    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 34, 56).unwrap()
    }

    fn parse(report: &str) -> Observation {
        parse_metar_at(report, reference())
            .unwrap_or_else(|e| panic!("Should parse '{}': {}", report, e))
    }

    fn approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn codes(observation: &Observation) -> Vec<&str> {
        observation
            .conditions
            .iter()
            .map(|c| c.code.as_str())
            .collect()
    }

    #[test]
    fn test_parse_us_report() {
        let obs = parse("KEYW 041053Z AUTO 13005KT 10SM CLR 24/22 A3000 RMK AO2 SLP159 T02440222");

        assert_eq!(obs.icao, "KEYW");
        assert_eq!(obs.wind.degrees, Some(130));
        assert_eq!(obs.wind.speed.kts, 5.0);
        approx(obs.wind.speed.mps, convert::kts_to_mps(5.0));
        assert!(obs.wind.gust.is_none());
        approx(obs.visibility.meters_float, 16093.44);
        assert_eq!(obs.visibility.meters, "16000");
        assert_eq!(obs.visibility.miles, "10");
        assert_eq!(obs.temperature.unwrap().celsius, 24.0);
        let barometer = obs.barometer.unwrap();
        assert_eq!(barometer.hg, 30.0);
        approx(barometer.kpa, 3000.0 / 10.0 / 2.9529988);
        assert_eq!(obs.flight_category, FlightCategory::Vfr);
        assert_eq!(obs.icao_flight_category, IcaoFlightCategory::Vfr);
    }

    #[test]
    fn test_parse_observed_time() {
        let obs = parse("KEYW 041053Z AUTO 13005KT 10SM CLR 24/22 A3000");
        assert_eq!(obs.observed, Utc.with_ymd_and_hms(2024, 3, 4, 10, 53, 0).unwrap());
    }

    #[test]
    fn test_observed_defaults_to_reference() {
        let obs = parse("KEYW AUTO 13005KT 10SM CLR 24/22 A3000");
        assert_eq!(obs.observed, reference());
    }

    #[test]
    fn test_observed_day_rolls_over() {
        let reference = Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap();
        let obs = parse_metar_at("KEYW 310000Z 13005KT 10SM", reference).unwrap();
        assert_eq!(obs.observed, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_european_report() {
        let obs = parse("EDDS 081620Z 29010KT 9999 FEW040TCU 09/M03 Q1012 NOSIG");

        assert_eq!(obs.icao, "EDDS");
        assert_eq!(obs.wind.degrees, Some(290));
        assert_eq!(obs.wind.speed.kts, 10.0);
        assert_eq!(obs.wind.speed.mps, convert::kts_to_mps(10.0));
        assert!(obs.wind.gust.is_none());
        assert_eq!(obs.visibility.meters_float, 9999.0);
        assert_eq!(obs.visibility.meters, "10000");
        assert_eq!(obs.clouds.len(), 1);
        assert_eq!(obs.clouds[0].code, CloudCode::Few);
        assert_eq!(obs.clouds[0].feet, 4000);
        assert!(obs.ceiling.is_none());
        assert_eq!(obs.temperature.unwrap().celsius, 9.0);
        approx(obs.temperature.unwrap().fahrenheit, 48.2);
        assert_eq!(obs.dewpoint.unwrap().celsius, -3.0);
        assert_eq!(obs.barometer.unwrap().kpa, 101.2);
        assert_eq!(obs.barometer.unwrap().mb, 1012.0);
        assert_eq!(obs.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_parse_cavok() {
        let obs = parse("EHAM 100125Z 33004KT CAVOK M00/M01 Q1026 NOSIG");

        assert_eq!(obs.icao, "EHAM");
        assert_eq!(obs.visibility.miles_float, 10.0);
        assert_eq!(obs.visibility.meters_float, convert::miles_to_meters(10.0));
        assert_eq!(obs.visibility.meters, "16000");
        assert_eq!(obs.temperature.unwrap().celsius, 0.0);
        approx(obs.temperature.unwrap().fahrenheit, 32.0);
        assert_eq!(obs.dewpoint.unwrap().celsius, -1.0);
        approx(obs.dewpoint.unwrap().fahrenheit, 30.2);
        approx(obs.barometer.unwrap().kpa, 102.6);
        assert_eq!(obs.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_parse_metric_wind_with_variable_arc() {
        let obs = parse(
            "METAR LBBG 041600Z 12012MPS 090V150 1400 R04/P1500N R22/P1500U +SN BKN022 OVC050 M04/M07 Q1020 NOSIG 8849//91=",
        );

        assert_eq!(obs.icao, "LBBG");
        assert_eq!(obs.wind.degrees, Some(120));
        assert_eq!(obs.wind.speed.mps, 12.0);
        approx(obs.wind.speed.kts, convert::mps_to_kts(12.0));
        assert_eq!(obs.wind.degrees_from, Some(90));
        assert_eq!(obs.wind.degrees_to, Some(150));
        assert_eq!(obs.visibility.meters_float, 1400.0);
        assert_eq!(obs.visibility.meters, "1500");
        assert_eq!(codes(&obs), vec!["+", "SN"]);
        assert_eq!(obs.clouds.len(), 2);
        assert_eq!(obs.clouds[0].code, CloudCode::Bkn);
        assert_eq!(obs.clouds[0].feet, 2200);
        assert_eq!(obs.clouds[1].code, CloudCode::Ovc);
        assert_eq!(obs.clouds[1].feet, 5000);
        assert_eq!(obs.ceiling, Some(obs.clouds[0]));
        assert_eq!(obs.temperature.unwrap().celsius, -4.0);
        approx(obs.temperature.unwrap().fahrenheit, 24.8);
        assert_eq!(obs.dewpoint.unwrap().celsius, -7.0);
        assert_eq!(obs.barometer.unwrap().kpa, 102.0);
        assert_eq!(obs.flight_category, FlightCategory::Lifr);
        assert_eq!(obs.icao_flight_category, IcaoFlightCategory::Ifr);
    }

    #[test]
    fn test_parse_too_short() {
        let err = parse_metar_at("KEYW 041053Z", reference()).unwrap_err();
        assert_eq!(
            err,
            ParseError::NotEnoughFields {
                found: 2,
                required: 3
            }
        );
        assert!(parse_metar_at("", reference()).is_err());
        assert!(parse_metar_at("METAR KEYW 041053Z", reference()).is_err());
    }

    #[test]
    fn test_parse_fractional_visibility_and_conditions() {
        let obs = parse(
            "METAR KTTN 051853Z 04011KT 1/2SM VCTS SN FZFG BKN003 OVC010 M02/M02 A3006 RMK AO2 TSB40 SLP176 P0002 T10171017=",
        );

        assert_eq!(obs.icao, "KTTN");
        assert_eq!(obs.wind.degrees, Some(40));
        assert_eq!(obs.wind.speed.kts, 11.0);
        assert_eq!(obs.visibility.miles_float, 0.5);
        assert_eq!(obs.visibility.meters_float, convert::miles_to_meters(0.5));
        assert_eq!(obs.visibility.meters, "1000");
        assert_eq!(codes(&obs), vec!["VC", "TS", "SN", "FZ", "FG"]);
        assert_eq!(obs.clouds.len(), 2);
        assert_eq!(obs.clouds[0].feet, 300);
        assert_eq!(obs.clouds[1].feet, 1000);
        assert_eq!(obs.temperature.unwrap().celsius, -2.0);
        approx(obs.temperature.unwrap().fahrenheit, 28.4);
        approx(obs.humidity_percent.unwrap(), 100.0);
        assert_eq!(obs.barometer.unwrap().hg, 30.06);
        assert_eq!(obs.flight_category, FlightCategory::Lifr);
    }

    #[test]
    fn test_parse_mixed_number_visibility() {
        let obs = parse(
            "KSFO 070121Z 19023KT 1 1/2SM R28R/6000VP6000FT -RA BKN004 BKN013 OVC035 15/12 A2970 RMK AO2 T01500122 PNO $",
        );

        assert_eq!(obs.icao, "KSFO");
        assert_eq!(obs.raw_parts[3], "3/2SM");
        assert_eq!(obs.visibility.miles_float, 1.5);
        assert_eq!(obs.visibility.meters_float, convert::miles_to_meters(1.5));
        assert_eq!(obs.visibility.meters, "2500");
        assert_eq!(codes(&obs), vec!["-", "RA"]);
        assert_eq!(obs.ceiling.unwrap().feet, 400);
        assert_eq!(obs.temperature.unwrap().celsius, 15.0);
        approx(obs.temperature.unwrap().fahrenheit, 59.0);
        approx(obs.dewpoint.unwrap().fahrenheit, 53.6);
        approx(obs.barometer.unwrap().kpa, 2970.0 / 10.0 / 2.9529988);
        approx(obs.barometer.unwrap().mb, 2970.0 / 2.9529988);
        assert_eq!(obs.flight_category, FlightCategory::Lifr);
    }

    #[test]
    fn test_parse_ifr_with_low_ceiling() {
        let obs = parse("EDDH 041050Z 29013KT 6000 SCT006 BKN009 04/03 Q1028 TEMPO BKN012");

        assert_eq!(obs.visibility.meters_float, 6000.0);
        assert_eq!(obs.visibility.meters, "6000");
        assert_eq!(obs.clouds.len(), 2);
        assert_eq!(obs.clouds[0].code, CloudCode::Sct);
        assert_eq!(obs.clouds[0].feet, 600);
        assert_eq!(obs.ceiling.unwrap().feet, 900);
        assert_eq!(obs.temperature.unwrap().celsius, 4.0);
        assert_eq!(obs.barometer.unwrap().kpa, 102.8);
        assert_eq!(obs.flight_category, FlightCategory::Ifr);
        assert_eq!(obs.icao_flight_category, IcaoFlightCategory::Ifr);
    }

    #[test]
    fn test_parse_missing_visibility_group() {
        let obs = parse("KEYW 050653Z AUTO 19006KT FEW024 BKN039 26/23 A3000 RMK AO2 LTG DSNT W");

        assert_eq!(obs.wind.degrees, Some(190));
        assert_eq!(obs.visibility.miles_float, 10.0);
        assert_eq!(obs.visibility.meters_float, convert::miles_to_meters(10.0));
        assert_eq!(obs.clouds.len(), 2);
        assert_eq!(obs.clouds[0].code, CloudCode::Few);
        assert_eq!(obs.clouds[0].feet, 2400);
        let ceiling = obs.ceiling.unwrap();
        assert_eq!(ceiling.code, CloudCode::Bkn);
        assert_eq!(ceiling.feet, 3900);
        assert_eq!(obs.temperature.unwrap().celsius, 26.0);
        assert_eq!(obs.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_parse_variable_wind() {
        let obs = parse("KEYW 291553Z VRB03KT CLR 17/09 A3009 RMK AO2 SLP189 T01670089 $");

        assert_eq!(obs.wind.degrees, None);
        assert_eq!(obs.wind.degrees_from, Some(0));
        assert_eq!(obs.wind.degrees_to, Some(359));
        assert_eq!(obs.wind.speed.kts, 3.0);
        assert_eq!(obs.visibility.miles_float, 10.0);
        assert_eq!(obs.visibility.meters, "16000");
        assert_eq!(obs.temperature.unwrap().celsius, 17.0);
        assert_eq!(obs.dewpoint.unwrap().celsius, 9.0);
        assert_eq!(obs.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_parse_gusts() {
        let obs = parse("KPIE 260853Z AUTO 02013G17KT 10SM CLR 17/07 A2998 RMK AO2 SLP153");

        assert_eq!(obs.wind.degrees, Some(20));
        assert_eq!(obs.wind.speed.kts, 13.0);
        let gust = obs.wind.gust.unwrap();
        assert_eq!(gust.kts, 17.0);
        approx(gust.mps, convert::kts_to_mps(17.0));
        assert_eq!(obs.barometer.unwrap().hg, 29.98);
    }

    #[test]
    fn test_parse_kph_wind() {
        let obs = parse("UUEE 101200Z 27036G54KPH 9999 SCT030 05/01 Q1015");

        approx(obs.wind.speed.mps, 10.0);
        approx(obs.wind.speed.kts, convert::mps_to_kts(10.0));
        approx(obs.wind.gust.unwrap().mps, 15.0);
    }

    #[test]
    fn test_parse_wind_above_marker() {
        let obs = parse("KXYZ 101200Z 270P99KT 10SM CLR 05/01 A2992");
        assert_eq!(obs.wind.speed.kts, 99.0);

        let obs = parse("KXYZ 101200Z 270>99KT 10SM CLR 05/01 A2992");
        assert_eq!(obs.wind.speed.kts, 99.0);
    }

    #[test]
    fn test_parse_missing_wind_group() {
        let obs = parse("KDVO 022335Z AUTO 4SM BR BKN007 BKN013 12/12 A2988 RMK AO2");

        assert_eq!(obs.icao, "KDVO");
        assert_eq!(obs.wind, Wind::default());
        assert_eq!(obs.visibility.miles_float, 4.0);
        assert_eq!(obs.visibility.meters, "6500");
        assert_eq!(obs.visibility.meters_float, convert::miles_to_meters(4.0));
        assert_eq!(codes(&obs), vec!["BR"]);
    }

    #[test]
    fn test_parse_missing_temperature_placeholder() {
        let obs = parse("LFMK 151400Z AUTO 06007KT 030V100 CAVOK ///// Q1017 NOSIG=");

        assert_eq!(obs.icao, "LFMK");
        assert_eq!(obs.wind.degrees_from, Some(30));
        assert_eq!(obs.wind.degrees_to, Some(100));
        assert!(obs.temperature.is_none());
        assert!(obs.dewpoint.is_none());
        assert!(obs.humidity_percent.is_none());
        assert_eq!(obs.barometer.unwrap().mb, 1017.0);
    }

    #[test]
    fn test_parse_arc_before_visibility() {
        let obs = parse("LFMK 211130Z AUTO 29005KT 260V320 9999 OVC034 24/20 Q1011=");

        assert_eq!(obs.wind.degrees_from, Some(260));
        assert_eq!(obs.wind.degrees_to, Some(320));
        assert_eq!(obs.visibility.meters_float, 9999.0);
        assert_eq!(obs.ceiling.unwrap().feet, 3400);
        assert_eq!(obs.barometer.unwrap().mb, 1011.0);
        assert_eq!(obs.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_arc_ignored_without_wind() {
        let obs = parse("KXYZ 101200Z 090V150 10SM CLR 05/01 A2992");
        assert!(obs.wind.degrees_from.is_none());
        assert!(obs.wind.degrees_to.is_none());
    }

    #[test]
    fn test_remarks_not_processed() {
        let obs = parse("KACV 041053Z AUTO 07003KT 10SM CLR 04/04 A3001 RMK AO2 SLP169 Q0999 FEW010");

        assert_eq!(obs.barometer.unwrap().hg, 30.01);
        assert!(obs.clouds.is_empty());
        assert_eq!(obs.raw_text, "KACV 041053Z AUTO 07003KT 10SM CLR 04/04 A3001 RMK AO2 SLP169 Q0999 FEW010");
    }

    #[test]
    fn test_partial_report_is_still_valid() {
        let obs = parse("ZZZZ garbage tokens");

        assert_eq!(obs.icao, "ZZZZ");
        assert_eq!(obs.observed, reference());
        assert!(obs.temperature.is_none());
        assert!(obs.barometer.is_none());
        assert_eq!(obs.flight_category, FlightCategory::Vfr);
    }

    #[test]
    fn test_preprocess() {
        assert_eq!(preprocess("  METAR KEYW 041053Z  AUTO "), vec!["KEYW", "041053Z", "AUTO"]);
        assert_eq!(preprocess("SPECI COR KEYW 041053Z"), vec!["KEYW", "041053Z"]);
        assert_eq!(
            preprocess("KSFO 070121Z 19023KT 1 1/2SM -RA"),
            vec!["KSFO", "070121Z", "19023KT", "3/2SM", "-RA"]
        );
        assert_eq!(
            preprocess("KSFO 070121Z 2 3/4SM"),
            vec!["KSFO", "070121Z", "11/4SM"]
        );
        // Leading digit cannot be the station
        assert_eq!(preprocess("1 1/2SM X"), vec!["1", "1/2SM", "X"]);
        assert_eq!(preprocess("METAR"), vec!["METAR"]);
    }

    #[test]
    fn test_skip_ahead_visibility() {
        assert_eq!(Mode::Wind.skip_ahead("9999"), Mode::Visibility);
        assert_eq!(Mode::Time.skip_ahead("10SM"), Mode::Visibility);
        assert_eq!(Mode::Wind.skip_ahead("3/2SM"), Mode::Visibility);
        assert_eq!(Mode::Wind.skip_ahead("13005KT"), Mode::Wind);
        // Already past visibility
        assert_eq!(Mode::Conditions.skip_ahead("9999"), Mode::Conditions);
    }

    #[test]
    fn test_skip_ahead_clouds() {
        assert_eq!(Mode::Wind.skip_ahead("FEW024"), Mode::Clouds);
        assert_eq!(Mode::Visibility.skip_ahead("BKN"), Mode::Clouds);
        assert_eq!(Mode::Conditions.skip_ahead("FEW040TCU"), Mode::Clouds);
        assert_eq!(Mode::Clouds.skip_ahead("OVC010"), Mode::Clouds);
        assert_eq!(Mode::Temperature.skip_ahead("OVC010"), Mode::Temperature);
    }

    #[test]
    fn test_skip_ahead_temperature() {
        assert_eq!(Mode::Visibility.skip_ahead("M04/M07"), Mode::Temperature);
        assert_eq!(Mode::Wind.skip_ahead("/////"), Mode::Temperature);
        assert_eq!(Mode::Clouds.skip_ahead("24/22"), Mode::Temperature);
        assert_eq!(Mode::Pressure.skip_ahead("24/22"), Mode::Pressure);
        // A bare fraction looks like both a visibility and a temperature
        assert_eq!(Mode::Wind.skip_ahead("1/2"), Mode::Temperature);
    }

    #[test]
    fn test_mode_index() {
        assert_eq!(Mode::Station.index(), 0);
        assert_eq!(Mode::Visibility.index(), 3);
        assert_eq!(Mode::Done.index(), 8);
    }

    #[test]
    fn test_wind_matcher() {
        let group = leading("02013G17KT", wind_group).unwrap();
        assert_eq!(group.degrees, Some(20));
        assert_eq!(group.speed.kts, 13.0);
        assert_eq!(group.gust.unwrap().kts, 17.0);

        assert!(leading("VRB03KT", wind_group).unwrap().degrees.is_none());
        assert!(leading("13005", wind_group).is_none());
        assert!(leading("13005XX", wind_group).is_none());
        assert!(leading("AUTO", wind_group).is_none());
    }

    #[test]
    fn test_visibility_matcher() {
        assert_eq!(
            full("9999", visibility_group),
            Some(VisibilityGroup { distance: 9999.0, statute_miles: false })
        );
        assert_eq!(
            full("1/4SM", visibility_group),
            Some(VisibilityGroup { distance: 0.25, statute_miles: true })
        );
        assert!(full("1/0SM", visibility_group).is_none());
        assert!(full("R04/P1500N", visibility_group).is_none());
        assert!(full("10SMX", visibility_group).is_none());
    }

    #[test]
    fn test_condition_matcher() {
        assert_eq!(leading("+SN", condition_group), Some(vec!["+", "SN"]));
        assert_eq!(leading("VCSH", condition_group), Some(vec!["VC", "SH"]));
        assert_eq!(leading("RE", condition_group), Some(vec!["RE"]));
        assert_eq!(leading("-SHRASN", condition_group), Some(vec!["-", "SH", "RA", "SN"]));
        assert_eq!(leading("TSRAGR", condition_group), Some(vec!["TS", "RA", "GR"]));
        assert!(leading("TSRAGRSN", condition_group).is_none());
        assert!(leading("NOSIG", condition_group).is_none());
        assert!(leading("+", condition_group).is_none());
        assert!(leading("ra", condition_group).is_none());
    }

    #[test]
    fn test_cloud_matcher() {
        let layer = leading("FEW040TCU", cloud_layer).unwrap();
        assert_eq!(layer.code, CloudCode::Few);
        assert_eq!(layer.feet, 4000);
        assert!(leading("BKN", cloud_layer).is_none());
        assert!(leading("SKC", cloud_layer).is_none());
    }

    #[test]
    fn test_time_matcher() {
        assert_eq!(
            full("041053Z", time_group),
            Some(TimeGroup { day: 4, hour: 10, minute: 53 })
        );
        assert!(full("41053Z", time_group).is_none());
        assert!(full("041053", time_group).is_none());
        assert!(full("0410530Z", time_group).is_none());
    }

    #[test]
    fn test_explain_trace() {
        let trail = explain("LBBG 041600Z 12012MPS 090V150 1400 +SN BKN022 M04/M07 Q1020 NOSIG").unwrap();
        let modes: Vec<Mode> = trail.iter().map(|c| c.mode).collect();
        assert_eq!(
            modes,
            vec![
                Mode::Station,
                Mode::Time,
                Mode::Wind,
                Mode::Visibility,
                Mode::Visibility,
                Mode::Conditions,
                Mode::Clouds,
                Mode::Temperature,
                Mode::Pressure,
                Mode::Done,
            ]
        );
        assert_eq!(trail[3].outcome, Outcome::Matched);
        assert_eq!(trail[4].outcome, Outcome::Advanced);
        assert_eq!(trail[9].outcome, Outcome::Skipped);
    }

    #[test]
    fn test_looks_like_metar() {
        assert!(looks_like_metar("KEYW 041053Z AUTO 13005KT 10SM CLR 24/22 A3000"));
        assert!(looks_like_metar("METAR EHAM 100125Z 33004KT CAVOK"));
        assert!(!looks_like_metar("Hello world again"));
        assert!(!looks_like_metar(""));
        assert!(!looks_like_metar("KEYW 041053Z"));
    }

    #[test]
    fn test_observed_minutes_from_report() {
        let obs = parse("EDDS 081620Z 29010KT 9999");
        assert_eq!(obs.observed.day(), 8);
        assert_eq!(obs.observed.hour(), 16);
        assert_eq!(obs.observed.minute(), 20);
        assert_eq!(obs.observed.second(), 0);
    }

    const VOCABULARY: &[&str] = &[
        "KEYW", "METAR", "041053Z", "AUTO", "13005KT", "VRB03KT", "090V150", "9999", "10SM",
        "1/2SM", "1", "CAVOK", "CLR", "+SN", "BR", "VCTS", "FEW040", "BKN022", "OVC", "24/22",
        "M04/M07", "/////", "Q1020", "A2992", "RMK", "NOSIG", "R04/P1500N",
    ];

    fn report_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(VOCABULARY), 0..16).prop_map(|f| f.join(" "))
    }

    proptest! {
        #[test]
        fn prop_modes_never_go_backwards(report in report_strategy()) {
            if let Ok(trail) = explain(&report) {
                for pair in trail.windows(2) {
                    prop_assert!(pair[0].mode <= pair[1].mode, "{:?}", trail);
                }
            }
        }

        #[test]
        fn prop_parsing_is_deterministic(report in report_strategy()) {
            let first = parse_metar_at(&report, reference());
            let second = parse_metar_at(&report, reference());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_wind_units_consistent(
            dir in 0u16..360,
            speed in 0u32..120,
            unit in prop::sample::select(vec!["KT", "MPS"]),
        ) {
            let report = format!("KXYZ 101200Z {dir:03}{speed:02}{unit} 9999");
            let obs = parse_metar_at(&report, reference()).unwrap();
            prop_assert_eq!(obs.wind.degrees, Some(dir));
            prop_assert!((convert::kts_to_mps(obs.wind.speed.kts) - obs.wind.speed.mps).abs() < 1e-9);
        }

        #[test]
        fn prop_short_reports_fail(fields in prop::collection::vec("[A-Z0-9]{1,6}", 0..3)) {
            let report = fields.join(" ");
            prop_assert!(parse_metar_at(&report, reference()).is_err());
        }
    }
}
