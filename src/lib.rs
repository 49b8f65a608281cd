//! METAR Decoder - A Rust library and CLI for decoding METAR aviation weather reports.
//!
//! This crate provides:
//! - A nom-based field classifier for METAR reports
//! - Derived values such as ceiling, flight category and relative humidity
//! - Statistics tracking with HDR histograms
//! - Configurable observation filters
//!
//! # Example
//!
//! ```rust
//! use metar_decoder::{parser::parse_metar, stats::DecodeStats};
//!
//! let report = "EDDH 041050Z 29013KT 6000 SCT006 BKN009 04/03 Q1028";
//! let observation = parse_metar(report).expect("Failed to parse report");
//! assert_eq!(observation.ceiling.map(|c| c.feet), Some(900));
//!
//! let stats = DecodeStats::new();
//! stats.record_observation(&observation);
//!
//! println!("{}", stats.summary());
//! ```

pub mod config;
pub mod convert;
pub mod derived;
pub mod filter;
pub mod observation;
pub mod parser;
pub mod stats;

pub use config::{Config, OutputFormat};
pub use filter::{ObservationFilter, any_filter_matches};
pub use observation::{
    Barometer, CloudCode, CloudLayer, Condition, FlightCategory, IcaoFlightCategory, Observation,
    Speed, Temperature, Visibility, Wind,
};
pub use parser::{
    FieldClass, Mode, Outcome, ParseError, explain, looks_like_metar, parse_metar, parse_metar_at,
    preprocess,
};
pub use stats::{DecodeStats, StatsSummary};
