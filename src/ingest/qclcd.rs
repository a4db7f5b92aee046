/// NOAA Quality Controlled Local Climatological Data (QCLCD) monthly archives.
///
/// NOAA publishes one ZIP per month for the whole US:
///   http://cdo.ncdc.noaa.gov/qclcd_ascii/QCLCD<YYYY><MM>.zip
///
/// containing, among others:
///   <YYYY><MM>station.txt  pipe-delimited station roster (changes monthly)
///   <YYYY><MM>daily.txt    comma-delimited daily summaries, all stations
///   <YYYY><MM>hourly.txt   comma-delimited hourly observations
///
/// Archives are cached under the configured data directory by file name. A
/// month's archive keeps changing until a few days into the following month,
/// so a cached copy fetched before the 7th of month M+1 is re-fetched once on
/// or after that date and kept from then on (see `needs_refresh`).
///
/// Temperatures are degrees Fahrenheit, as published.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::{debug, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::config::WeatherConfig;
use crate::model::WeatherError;

pub const QCLCD_BASE_URL: &str = "http://cdo.ncdc.noaa.gov/qclcd_ascii/";

/// Day of month M+1 on which month M's archive is considered final.
pub const FINALIZED_DAY: u32 = 7;

// ============================================================================
// Records
// ============================================================================

/// One row of the monthly station roster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherStation {
    pub wban: String,
    pub wmo: String,
    pub call_sign: String,
    pub name: String,
    pub state: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ground_height: Option<f64>,
    pub time_zone: String,
}

/// One station-day from the daily summaries. Values the archive marks as
/// missing (`M`) or trace (`T`) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyObservation {
    pub wban: String,
    pub date: NaiveDate,
    pub t_max: Option<f64>,
    pub t_min: Option<f64>,
    pub t_avg: Option<f64>,
}

// ============================================================================
// Naming
// ============================================================================

pub fn archive_file_name(year: i32, month: u32) -> String {
    format!("QCLCD{}{:02}.zip", year, month)
}

pub fn build_archive_url(base_url: &str, year: i32, month: u32) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        archive_file_name(year, month)
    )
}

pub fn station_member(year: i32, month: u32) -> String {
    format!("{}{:02}station.txt", year, month)
}

pub fn daily_member(year: i32, month: u32) -> String {
    format!("{}{:02}daily.txt", year, month)
}

// ============================================================================
// Freshness
// ============================================================================

/// Midnight on the 7th of the month after `year`/`month`.
pub fn refresh_cutoff(year: i32, month: u32) -> Option<NaiveDateTime> {
    let (post_year, post_month) = if month >= 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(post_year, post_month, FINALIZED_DAY)?.and_hms_opt(0, 0, 0)
}

/// Whether the cached archive for `year`/`month` must be (re)downloaded.
///
/// `modified` is the cached file's local modification time, `None` when the
/// file is absent. A present file is stale only when `now` is on or after
/// the cutoff, the file predates the cutoff, and it was not fetched today.
pub fn needs_refresh(
    modified: Option<NaiveDateTime>,
    now: NaiveDateTime,
    year: i32,
    month: u32,
) -> bool {
    let Some(modified) = modified else {
        return true;
    };
    let Some(cutoff) = refresh_cutoff(year, month) else {
        return false;
    };
    now >= cutoff && modified < cutoff && modified.date() != now.date()
}

// ============================================================================
// Fetching
// ============================================================================

/// Where archive bytes come from when the cache is stale.
pub trait ArchiveSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WeatherError>;
}

/// Blocking HTTP download via reqwest.
pub struct HttpArchiveSource {
    client: reqwest::blocking::Client,
}

impl HttpArchiveSource {
    pub fn new(timeout: Duration) -> Result<Self, WeatherError> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, WeatherError> {
        let response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(WeatherError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

// ============================================================================
// Archive cache
// ============================================================================

pub struct QclcdArchive {
    data_dir: PathBuf,
    base_url: String,
    source: Box<dyn ArchiveSource>,
}

impl QclcdArchive {
    pub fn new(data_dir: impl Into<PathBuf>, base_url: impl Into<String>, source: Box<dyn ArchiveSource>) -> Self {
        Self {
            data_dir: data_dir.into(),
            base_url: base_url.into(),
            source,
        }
    }

    /// Archive cache backed by HTTP downloads, per `[weather]` config.
    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let source = HttpArchiveSource::new(Duration::from_secs(config.download_timeout_secs))?;
        Ok(Self::new(
            config.data_dir.clone(),
            config.archive_base_url.clone(),
            Box::new(source),
        ))
    }

    pub fn archive_path(&self, year: i32, month: u32) -> PathBuf {
        self.data_dir.join(archive_file_name(year, month))
    }

    /// Path to a usable local copy of the month's archive, downloading it
    /// first if it is missing or stale.
    pub fn confirmed_archive(&self, year: i32, month: u32) -> Result<PathBuf, WeatherError> {
        self.confirmed_archive_at(year, month, Local::now().naive_local())
    }

    pub fn confirmed_archive_at(
        &self,
        year: i32,
        month: u32,
        now: NaiveDateTime,
    ) -> Result<PathBuf, WeatherError> {
        let path = self.archive_path(year, month);
        let modified = modified_time(&path)?;
        if !needs_refresh(modified, now, year, month) {
            return Ok(path);
        }

        if modified.is_some() {
            info!("{} predates the {}/{} cutoff; refreshing", path.display(), month, year);
        }
        let url = build_archive_url(&self.base_url, year, month);
        info!("{} not current. Attempting download at {}", path.display(), url);
        let bytes = self.source.fetch(&url)?;
        self.store(&path, &bytes)?;
        Ok(path)
    }

    /// Writes to a sibling temp file, then renames into place, so readers
    /// never see a partial archive.
    fn store(&self, path: &Path, bytes: &[u8]) -> Result<(), WeatherError> {
        fs::create_dir_all(&self.data_dir)?;
        let mut partial = path.as_os_str().to_owned();
        partial.push(".part");
        let partial = PathBuf::from(partial);

        let mut file = File::create(&partial)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&partial, path)?;
        debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }

    /// The month's station roster. Rows with unparseable coordinates are
    /// logged and skipped.
    pub fn station_roster(&self, year: i32, month: u32) -> Result<Vec<WeatherStation>, WeatherError> {
        let path = self.confirmed_archive(year, month)?;
        let data = read_member(&path, &station_member(year, month))?;
        parse_station_roster(&data)
    }

    /// Every station's daily summaries for the month.
    pub fn daily_observations(&self, year: i32, month: u32) -> Result<Vec<DailyObservation>, WeatherError> {
        let path = self.confirmed_archive(year, month)?;
        let data = read_member(&path, &daily_member(year, month))?;
        parse_daily_observations(&data)
    }
}

fn modified_time(path: &Path) -> Result<Option<NaiveDateTime>, WeatherError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(DateTime::<Local>::from(meta.modified()?).naive_local())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_member(archive_path: &Path, member: &str) -> Result<Vec<u8>, WeatherError> {
    let mut archive = ZipArchive::new(File::open(archive_path)?)?;
    let mut file = match archive.by_name(member) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(WeatherError::MissingArchiveMember {
                archive: archive_path.display().to_string(),
                member: member.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    Ok(data)
}

// ============================================================================
// Member parsing
// ============================================================================

// station.txt columns
const ST_WBAN: usize = 0;
const ST_WMO: usize = 1;
const ST_CALL_SIGN: usize = 2;
const ST_NAME: usize = 6;
const ST_STATE: usize = 7;
const ST_LOCATION: usize = 8;
const ST_LATITUDE: usize = 9;
const ST_LONGITUDE: usize = 10;
const ST_GROUND_HEIGHT: usize = 11;
const ST_TIME_ZONE: usize = 14;

// daily.txt columns
const DY_WBAN: usize = 0;
const DY_DATE: usize = 1;
const DY_TMAX: usize = 2;
const DY_TMIN: usize = 4;
const DY_TAVG: usize = 6;

pub fn parse_station_roster(data: &[u8]) -> Result<Vec<WeatherStation>, WeatherError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'|')
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let mut stations = Vec::new();
    for result in reader.records() {
        let record = result?;
        let coords = (
            field(&record, ST_LATITUDE).parse::<f64>(),
            field(&record, ST_LONGITUDE).parse::<f64>(),
        );
        let (Ok(latitude), Ok(longitude)) = coords else {
            warn!("Bad station data, skipping: {:?}", record);
            continue;
        };
        stations.push(WeatherStation {
            wban: field(&record, ST_WBAN).to_string(),
            wmo: field(&record, ST_WMO).to_string(),
            call_sign: field(&record, ST_CALL_SIGN).to_string(),
            name: field(&record, ST_NAME).to_string(),
            state: field(&record, ST_STATE).to_string(),
            location: field(&record, ST_LOCATION).to_string(),
            latitude,
            longitude,
            ground_height: field(&record, ST_GROUND_HEIGHT).parse().ok(),
            time_zone: field(&record, ST_TIME_ZONE).to_string(),
        });
    }
    Ok(stations)
}

pub fn parse_daily_observations(data: &[u8]) -> Result<Vec<DailyObservation>, WeatherError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let mut observations = Vec::new();
    for result in reader.records() {
        let record = result?;
        let Ok(date) = NaiveDate::parse_from_str(field(&record, DY_DATE), "%Y%m%d") else {
            warn!("Bad daily observation date, skipping: {:?}", record);
            continue;
        };
        observations.push(DailyObservation {
            wban: field(&record, DY_WBAN).to_string(),
            date,
            t_max: field(&record, DY_TMAX).parse().ok(),
            t_min: field(&record, DY_TMIN).parse().ok(),
            t_avg: field(&record, DY_TAVG).parse().ok(),
        });
    }
    Ok(observations)
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}
