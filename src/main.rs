//! Building Energy Fingerprint - command line front end
//!
//! Turns an interval meter upload (Green Button XML, `date,reading` CSV, or a
//! ZIP of either) into the load-shape summary the report layer renders, and
//! optionally lines it up against daily outdoor temperature from the NOAA
//! QCLCD archives nearest the building's zip code.
//!
//! Usage:
//!   fingerprint_service analyze meter.xml --zip 94305
//!   fingerprint_service analyze upload.zip --json
//!   fingerprint_service stations 94305 2013 3 -n 5
//!   fingerprint_service export meter.xml meter.csv
//!
//! Environment:
//!   FINGERPRINT_CONFIG - configuration file (default: fingerprint.toml)
//!   RUST_LOG           - overrides the configured log level

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use fingerprint_service::analysis::alignment::TemperatureSeries;
use fingerprint_service::analysis::building::{Building, UsageSummary};
use fingerprint_service::config::{self, ServiceConfig};
use fingerprint_service::ingest::delimited::write_series;
use fingerprint_service::ingest::upload::{check_interval_resolution, parse_reading_file};
use fingerprint_service::logging::init_logging;
use fingerprint_service::model::Sample;
use fingerprint_service::stations::WeatherStationIndex;
use fingerprint_service::zipcodes::ZipTable;

#[derive(Parser)]
#[command(name = "fingerprint_service")]
#[command(about = "Building energy fingerprints from interval meter data", long_about = None)]
struct Cli {
    /// Configuration file (overrides FINGERPRINT_CONFIG)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a meter upload and print its load-shape summary
    Analyze {
        /// Green Button XML, delimited CSV, or a ZIP containing either
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Building zip code; enables the outdoor temperature match
        #[arg(short, long)]
        zip: Option<String>,

        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the weather stations nearest a zip code for one month
    Stations {
        zip: String,

        year: i32,

        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,

        /// Number of stations to list
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
    /// Re-export a meter upload as a `date,reading` CSV
    Export {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(value_name = "OUT")]
        out: PathBuf,
    },
}

/// Everything the report layer needs about one building.
#[derive(Serialize)]
struct AnalysisReport<'a> {
    readings: usize,
    first_reading: Option<String>,
    last_reading: Option<String>,
    observations_per_day: usize,
    observations_per_week: usize,
    days: &'a [NaiveDate],
    summary: &'a UsageSummary,
    daily_kwh: Vec<f64>,
    weekend: Vec<bool>,
    temperatures: Option<&'a TemperatureSeries>,
    temperature_correlation: Option<f64>,
}

impl<'a> AnalysisReport<'a> {
    fn new(building: &'a Building) -> Self {
        let samples = building.series().samples();
        let stamp = |s: &Sample| s.timestamp.format("%Y-%m-%d %H:%M").to_string();
        Self {
            readings: samples.len(),
            first_reading: samples.first().map(stamp),
            last_reading: samples.last().map(stamp),
            observations_per_day: building.series().observations_per_day(),
            observations_per_week: building.series().observations_per_week(),
            days: building.days(),
            summary: building.summary(),
            daily_kwh: building.daily_kwh(),
            weekend: building.weekend_flags(),
            temperatures: building.temperatures(),
            temperature_correlation: building.temperature_correlation(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let config = config::load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    init_logging(&config.logging.level);

    match cli.command {
        Commands::Analyze { file, zip, json } => analyze(&config, &file, zip, json),
        Commands::Stations {
            zip,
            year,
            month,
            count,
        } => stations(&config, &zip, year, month, count),
        Commands::Export { file, out } => export(&config, &file, &out),
    }
}

fn load_readings(config: &ServiceConfig, file: &Path) -> Result<Vec<Sample>> {
    let samples = parse_reading_file(file, &config.ingest.feed_options())
        .with_context(|| format!("parsing {}", file.display()))?;
    info!("Parsed {} readings from {}", samples.len(), file.display());
    Ok(samples)
}

fn analyze(config: &ServiceConfig, file: &Path, zip: Option<String>, json: bool) -> Result<()> {
    let samples = load_readings(config, file)?;
    check_interval_resolution(&samples, config.ingest.max_interval())?;

    let mut building = Building::new(samples, zip.clone())?;

    if let Some(zip5) = zip.as_deref() {
        let zips = ZipTable::load(&config.weather.zip_table).with_context(|| {
            format!("loading zip code table {}", config.weather.zip_table.display())
        })?;
        let index = WeatherStationIndex::from_config(&zips, &config.weather)?;
        let without_weather = building.clone();
        building = match building.with_weather(&index) {
            Ok(with_weather) => with_weather,
            Err(e) => {
                warn!("Weather match for {} failed, continuing without it: {}", zip5, e);
                without_weather
            }
        };
    }

    let report = AnalysisReport::new(&building);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Readings:        {}", report.readings);
    if let (Some(first), Some(last)) = (&report.first_reading, &report.last_reading) {
        println!("Span:            {} .. {}", first, last);
    }
    println!("Obs per day:     {}", report.observations_per_day);
    println!("Full days:       {}", report.days.len());
    println!("Mean demand:     {:.1} W", report.summary.mean);
    println!("Daily max (p95): {:.1} W", report.summary.max);
    println!("Daily min (p5):  {:.1} W", report.summary.min);
    match report.summary.max_min_ratio {
        Some(ratio) => println!("Max/min ratio:   {:.2}", ratio),
        None => println!("Max/min ratio:   n/a"),
    }
    println!("Daily range:     {:.1} W", report.summary.range);
    if let Some(temps) = report.temperatures {
        println!(
            "Weather matched: {}/{} days",
            temps.matched_count(),
            temps.dates.len()
        );
        match report.temperature_correlation {
            Some(r) => println!("kWh vs temp r:   {:.3}", r),
            None => println!("kWh vs temp r:   n/a"),
        }
    }
    Ok(())
}

fn stations(config: &ServiceConfig, zip: &str, year: i32, month: u32, count: usize) -> Result<()> {
    let zips = ZipTable::load(&config.weather.zip_table)
        .with_context(|| format!("loading zip code table {}", config.weather.zip_table.display()))?;
    let index = WeatherStationIndex::from_config(&zips, &config.weather)?;

    let origin = index.zip_to_coordinate(zip)?;
    println!(
        "Stations nearest {} ({:.4}, {:.4}) for {}/{}:",
        zip, origin.latitude, origin.longitude, month, year
    );
    for ranked in index.nearest_stations(zip, year, month, count)? {
        println!(
            "  {:>8.2} km  WBAN {:<6} {:<5} {}, {}",
            ranked.distance_km,
            ranked.station.wban,
            ranked.station.call_sign,
            ranked.station.name,
            ranked.station.state
        );
    }
    Ok(())
}

fn export(config: &ServiceConfig, file: &Path, out: &Path) -> Result<()> {
    let samples = load_readings(config, file)?;
    let writer = BufWriter::new(
        File::create(out).with_context(|| format!("creating {}", out.display()))?,
    );
    write_series(&samples, writer)?;
    println!("Wrote {} readings to {}", samples.len(), out.display());
    Ok(())
}
