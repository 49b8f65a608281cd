//! Statistics tracking for batches of decoded reports.
//!
//! This module provides structures for tracking counts and distributions
//! over decoded METARs, broken down by flight category and station.

use hdrhistogram::Histogram;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::observation::{FlightCategory, Observation};

/// Offset added to Celsius readings so they fit an unsigned histogram.
const TEMPERATURE_OFFSET: i64 = 100;

/// Thread-safe statistics collector for decoded reports.
#[derive(Debug)]
pub struct DecodeStats {
    /// Total number of reports decoded successfully
    pub total_reports: AtomicU64,

    /// Total number of reports that failed to decode
    pub parse_failures: AtomicU64,

    /// Total number of lines that were not METARs (filtered early)
    pub non_metar_lines: AtomicU64,

    /// Total bytes of raw input processed
    pub bytes_processed: AtomicU64,

    /// Histogram of sustained wind speed in knots
    wind_histogram: RwLock<Histogram<u64>>,

    /// Histogram of temperature in Celsius, offset by `TEMPERATURE_OFFSET`
    temperature_histogram: RwLock<Histogram<u64>>,

    /// Reports per flight category
    reports_by_category: RwLock<HashMap<FlightCategory, u64>>,

    /// Reports per station
    reports_by_station: RwLock<HashMap<String, u64>>,

    /// When stats collection started
    start_time: Instant,
}

impl DecodeStats {
    /// Create a new statistics collector.
    pub fn new() -> Self {
        Self {
            total_reports: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
            non_metar_lines: AtomicU64::new(0),
            bytes_processed: AtomicU64::new(0),
            // Wind histogram: 1 to 250 kt, 2 significant figures
            wind_histogram: RwLock::new(
                Histogram::new_with_bounds(1, 250, 2).expect("Failed to create wind histogram"),
            ),
            // Temperature histogram: -99 to +149 C after the offset
            temperature_histogram: RwLock::new(
                Histogram::new_with_bounds(1, 250, 2)
                    .expect("Failed to create temperature histogram"),
            ),
            reports_by_category: RwLock::new(HashMap::new()),
            reports_by_station: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a successfully decoded report.
    pub fn record_observation(&self, observation: &Observation) {
        self.total_reports.fetch_add(1, Ordering::Relaxed);

        // Calm winds are recorded as 1 kt, the histogram floor
        let wind = observation.wind.speed.kts.round().max(1.0) as u64;
        if let Ok(mut hist) = self.wind_histogram.write() {
            let _ = hist.record(wind.min(250));
        }

        if let Some(temperature) = observation.temperature
            && let Ok(mut hist) = self.temperature_histogram.write()
        {
            let offset = temperature.celsius.round() as i64 + TEMPERATURE_OFFSET;
            let _ = hist.record(offset.clamp(1, 250) as u64);
        }

        if let Ok(mut map) = self.reports_by_category.write() {
            *map.entry(observation.flight_category).or_insert(0) += 1;
        }

        if let Ok(mut map) = self.reports_by_station.write() {
            *map.entry(observation.icao.clone()).or_insert(0) += 1;
        }
    }

    /// Record a parse failure.
    pub fn record_parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a line that was not a METAR.
    pub fn record_non_metar(&self) {
        self.non_metar_lines.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes processed.
    pub fn record_bytes(&self, bytes: u64) {
        self.bytes_processed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get the elapsed time since stats collection started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Generate a summary report.
    pub fn summary(&self) -> StatsSummary {
        let total = self.total_reports.load(Ordering::Relaxed);

        let wind_percentiles = self
            .wind_histogram
            .read()
            .ok()
            .filter(|h| !h.is_empty())
            .map(|h| HistogramPercentiles {
                p50: h.value_at_quantile(0.50) as i64,
                p90: h.value_at_quantile(0.90) as i64,
                p99: h.value_at_quantile(0.99) as i64,
                min: h.min() as i64,
                max: h.max() as i64,
                mean: h.mean(),
            });

        let temperature_percentiles = self
            .temperature_histogram
            .read()
            .ok()
            .filter(|h| !h.is_empty())
            .map(|h| HistogramPercentiles {
                // Subtract the offset to get back to real Celsius values
                p50: h.value_at_quantile(0.50) as i64 - TEMPERATURE_OFFSET,
                p90: h.value_at_quantile(0.90) as i64 - TEMPERATURE_OFFSET,
                p99: h.value_at_quantile(0.99) as i64 - TEMPERATURE_OFFSET,
                min: h.min() as i64 - TEMPERATURE_OFFSET,
                max: h.max() as i64 - TEMPERATURE_OFFSET,
                mean: h.mean() - TEMPERATURE_OFFSET as f64,
            });

        let reports_by_category = self
            .reports_by_category
            .read()
            .map(|m| m.iter().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap_or_default();

        // Get top 10 stations
        let top_stations = self
            .reports_by_station
            .read()
            .map(|m| {
                let mut vec: Vec<_> = m.iter().map(|(k, v)| (k.clone(), *v)).collect();
                vec.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                vec.truncate(10);
                vec
            })
            .unwrap_or_default();

        StatsSummary {
            elapsed_secs: self.elapsed().as_secs_f64(),
            total_reports: total,
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            non_metar_lines: self.non_metar_lines.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            wind_percentiles,
            temperature_percentiles,
            reports_by_category,
            top_stations,
        }
    }
}

impl Default for DecodeStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentile values from a histogram.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramPercentiles {
    pub p50: i64,
    pub p90: i64,
    pub p99: i64,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
}

/// Summary of collected statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub elapsed_secs: f64,
    pub total_reports: u64,
    pub parse_failures: u64,
    pub non_metar_lines: u64,
    pub bytes_processed: u64,
    pub wind_percentiles: Option<HistogramPercentiles>,
    pub temperature_percentiles: Option<HistogramPercentiles>,
    pub reports_by_category: HashMap<String, u64>,
    pub top_stations: Vec<(String, u64)>,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f, "                 METAR DECODE STATISTICS")?;
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f)?;
        writeln!(f, "Runtime: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Reports decoded: {}", self.total_reports)?;
        writeln!(f, "Parse failures: {}", self.parse_failures)?;
        writeln!(f, "Non-METAR lines: {}", self.non_metar_lines)?;
        writeln!(f, "Bytes processed: {}", self.bytes_processed)?;
        writeln!(f)?;

        if let Some(ref p) = self.wind_percentiles {
            writeln!(f, "Wind Speed Distribution (kt):")?;
            writeln!(f, "  Min: {}, Max: {}, Mean: {:.1}", p.min, p.max, p.mean)?;
            writeln!(f, "  P50: {}, P90: {}, P99: {}", p.p50, p.p90, p.p99)?;
            writeln!(f)?;
        }

        if let Some(ref p) = self.temperature_percentiles {
            writeln!(f, "Temperature Distribution (°C):")?;
            writeln!(f, "  Min: {}, Max: {}, Mean: {:.1}", p.min, p.max, p.mean)?;
            writeln!(f, "  P50: {}, P90: {}, P99: {}", p.p50, p.p90, p.p99)?;
            writeln!(f)?;
        }

        if !self.reports_by_category.is_empty() {
            writeln!(f, "Reports by Flight Category:")?;
            let mut categories: Vec<_> = self.reports_by_category.iter().collect();
            categories.sort_by(|a, b| b.1.cmp(a.1));
            for (category, count) in categories {
                writeln!(f, "  {}: {}", category, count)?;
            }
            writeln!(f)?;
        }

        if !self.top_stations.is_empty() {
            writeln!(f, "Top 10 Stations:")?;
            for (i, (station, count)) in self.top_stations.iter().enumerate() {
                writeln!(f, "  {}. {}: {}", i + 1, station, count)?;
            }
        }

        Ok(())
    }
}
