//! Observation filtering for selective output.
//!
//! Allows configuring which decoded reports to print based on criteria
//! like station patterns, flight categories and wind thresholds.

use serde::Deserialize;
use serde::de::{self, Deserializer, Visitor};
use std::fmt;

use crate::observation::{FlightCategory, Observation};

/// A list of patterns that deserializes from either a string or array.
///
/// Used for the icao field to allow both:
/// - `icao = "K*"` (single pattern)
/// - `icao = ["K*", "ED*"]` (multiple patterns with OR logic)
#[derive(Debug, Clone, Default)]
pub struct PatternList(Vec<String>);

impl PatternList {
    /// Get the patterns as a slice.
    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    /// Check if any pattern matches the value.
    pub fn matches_any(&self, value: &str) -> bool {
        self.0.iter().any(|p| matches_wildcard(p, value))
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for PatternList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PatternListVisitor;

        impl<'de> Visitor<'de> for PatternListVisitor {
            type Value = PatternList;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or array of strings")
            }

            fn visit_str<E>(self, value: &str) -> Result<PatternList, E>
            where
                E: de::Error,
            {
                Ok(PatternList(vec![value.to_string()]))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<PatternList, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut patterns = Vec::new();
                while let Some(value) = seq.next_element::<String>()? {
                    patterns.push(value);
                }
                Ok(PatternList(patterns))
            }
        }

        deserializer.deserialize_any(PatternListVisitor)
    }
}

/// A filter for matching observations.
///
/// All specified fields must match (AND logic).
/// Use multiple filters for OR logic.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObservationFilter {
    /// Optional name for this filter (used in log messages).
    pub name: Option<String>,

    /// Station patterns (supports `*` wildcard for prefix/suffix).
    pub icao: Option<PatternList>,

    /// Flight categories to match.
    pub flight_categories: Option<Vec<FlightCategory>>,

    /// Minimum sustained wind speed in knots.
    pub min_wind_kts: Option<f64>,

    /// Maximum visibility in statute miles.
    pub max_visibility_miles: Option<f64>,

    /// Require (or forbid) a ceiling.
    pub has_ceiling: Option<bool>,
}

impl ObservationFilter {
    /// Check if an observation matches this filter.
    ///
    /// All specified fields must match (AND logic).
    pub fn matches(&self, observation: &Observation) -> bool {
        if let Some(ref patterns) = self.icao
            && !patterns.is_empty()
            && !patterns.matches_any(&observation.icao)
        {
            return false;
        }

        if let Some(ref categories) = self.flight_categories
            && !categories.contains(&observation.flight_category)
        {
            return false;
        }

        if let Some(min_wind) = self.min_wind_kts
            && observation.wind.speed.kts < min_wind
        {
            return false;
        }

        if let Some(max_visibility) = self.max_visibility_miles
            && observation.visibility.miles_float > max_visibility
        {
            return false;
        }

        if let Some(has_ceiling) = self.has_ceiling
            && observation.ceiling.is_some() != has_ceiling
        {
            return false;
        }

        true
    }

    /// Validate the filter configuration.
    ///
    /// Returns an error if any patterns are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref patterns) = self.icao {
            for pattern in patterns.patterns() {
                validate_wildcard_pattern(pattern)?;
            }
        }
        Ok(())
    }
}

/// Check if any filter in the list matches the observation.
///
/// Returns `true` if at least one filter matches (OR logic).
/// Returns `false` if the list is empty.
pub fn any_filter_matches(filters: &[ObservationFilter], observation: &Observation) -> bool {
    filters.iter().any(|f| f.matches(observation))
}

/// Match a string against a wildcard pattern.
///
/// Supports `*` as prefix or suffix wildcard (not both).
/// Matching is case-insensitive.
fn matches_wildcard(pattern: &str, value: &str) -> bool {
    let pattern_upper = pattern.to_ascii_uppercase();
    let value_upper = value.to_ascii_uppercase();

    if let Some(suffix) = pattern_upper.strip_prefix('*') {
        value_upper.ends_with(suffix)
    } else if let Some(prefix) = pattern_upper.strip_suffix('*') {
        value_upper.starts_with(prefix)
    } else {
        pattern_upper == value_upper
    }
}

/// Validate a wildcard pattern.
///
/// Returns an error if the pattern has wildcards in invalid positions.
fn validate_wildcard_pattern(pattern: &str) -> Result<(), String> {
    let wildcard_count = pattern.chars().filter(|&c| c == '*').count();

    if wildcard_count > 1 {
        return Err(format!(
            "Pattern '{}' has multiple wildcards; only one is allowed",
            pattern
        ));
    }

    if wildcard_count == 1 && !pattern.starts_with('*') && !pattern.ends_with('*') {
        return Err(format!(
            "Pattern '{}' has wildcard in middle; only prefix (*ABC) or suffix (ABC*) allowed",
            pattern
        ));
    }

    Ok(())
}
