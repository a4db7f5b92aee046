/// Service configuration loader - parses fingerprint.toml
///
/// Separates deployment details (cache directories, reference data paths,
/// the weather archive endpoint, ingest limits) from code, so they can be
/// adjusted without recompiling the service.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::feed::{FeedOptions, OffsetConvention};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "fingerprint.toml";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "FINGERPRINT_CONFIG";

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Weather reference data and archive cache settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub data_dir: PathBuf,
    pub zip_table: PathBuf,
    pub archive_base_url: String,
    pub station_candidates: usize,
    pub warn_distance_km: f64,
    pub download_timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("weather"),
            zip_table: PathBuf::from("weather/Erle_zipcodes.csv"),
            archive_base_url: crate::ingest::qclcd::QCLCD_BASE_URL.to_string(),
            station_candidates: 5,
            warn_distance_km: 15.0,
            download_timeout_secs: 120,
        }
    }
}

/// Upload ingestion limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_interval_minutes: i64,
    pub offset_convention: OffsetConvention,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_interval_minutes: 60,
            offset_convention: OffsetConvention::Subtract,
        }
    }
}

impl IngestConfig {
    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            offset_convention: self.offset_convention,
        }
    }

    pub fn max_interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.max_interval_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Errors loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Resolves the configuration file path: `FINGERPRINT_CONFIG` (from the
/// environment or a `.env` file) or `fingerprint.toml`.
pub fn config_path() -> PathBuf {
    dotenv::dotenv().ok();
    env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Loads and parses a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Parses configuration text. Missing sections and fields take defaults.
pub fn parse_config(contents: &str) -> Result<ServiceConfig, toml::de::Error> {
    toml::from_str(contents)
}
