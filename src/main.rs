//! METAR decoder CLI - Decode aviation weather reports into JSON or text.

use anyhow::{Context, Result};
use clap::Parser;
use metar_decoder::{
    config::{Config, OutputFormat},
    filter::{ObservationFilter, any_filter_matches},
    observation::Observation,
    parser::{explain, looks_like_metar, parse_metar},
    stats::DecodeStats,
};
use std::io::{self, BufRead, Write};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// METAR decoder - Decode aviation routine weather reports
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Reports to decode; reads one report per line from stdin if omitted
    reports: Vec<String>,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum, env = "METAR_FORMAT")]
    format: Option<OutputFormat>,

    /// Print statistics after decoding
    #[arg(short, long)]
    stats: bool,

    /// Show how each field is classified instead of the decoded report
    #[arg(short, long)]
    explain: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "METAR_LOG_LEVEL")]
    log_level: Option<String>,

    /// Config file to load instead of the default location
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

/// Options resolved from the config file and command line.
struct Output {
    format: OutputFormat,
    explain: bool,
    filters: Vec<ObservationFilter>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let output = Output {
        format: args.format.unwrap_or(config.format),
        explain: args.explain,
        filters: config.filters,
    };
    let show_stats = args.stats || config.stats;
    if !output.filters.is_empty() {
        info!("{} observation filter(s) active", output.filters.len());
    }

    let stats = DecodeStats::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.reports.is_empty() {
        debug!("Reading reports from stdin");
        for line in io::stdin().lock().lines() {
            let line = line.context("Failed to read from stdin")?;
            process_line(&line, &stats, &output, &mut out)?;
        }
    } else {
        for report in &args.reports {
            process_line(report, &stats, &output, &mut out)?;
        }
    }

    if show_stats {
        eprintln!("\n{}", stats.summary());
    }

    Ok(())
}

/// Decode a single line and write the result.
fn process_line(
    line: &str,
    stats: &DecodeStats,
    output: &Output,
    out: &mut impl Write,
) -> Result<()> {
    stats.record_bytes(line.len() as u64);

    // Quick filter for blank lines and headers
    if !looks_like_metar(line) {
        stats.record_non_metar();
        debug!("Non-METAR line: {}", line);
        return Ok(());
    }

    if output.explain {
        match explain(line) {
            Ok(trail) => {
                for class in trail {
                    writeln!(out, "{}", class)?;
                }
                writeln!(out)?;
            }
            Err(e) => {
                stats.record_parse_failure();
                debug!("Parse error for '{}': {}", line, e);
            }
        }
        return Ok(());
    }

    match parse_metar(line) {
        Ok(observation) => {
            stats.record_observation(&observation);

            if !output.filters.is_empty() && !any_filter_matches(&output.filters, &observation) {
                debug!("Filtered out report from {}", observation.icao);
                return Ok(());
            }

            write_observation(&observation, output.format, out)?;
        }
        Err(e) => {
            stats.record_parse_failure();
            debug!("Parse error for '{}': {}", line, e);
        }
    }

    Ok(())
}

fn write_observation(
    observation: &Observation,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(observation)?)?,
        OutputFormat::Pretty => writeln!(out, "{}", serde_json::to_string_pretty(observation)?)?,
        OutputFormat::Text => writeln!(out, "{}", observation)?,
    }
    Ok(())
}
