/// Core data types for the building energy fingerprint service.
///
/// This module defines the shared domain model imported by all other modules:
/// interval samples, the ESPI feed tree, geographic coordinates, and the error
/// enums for each layer. It contains no I/O.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Interval samples
// ---------------------------------------------------------------------------

/// A single interval meter reading: demand in watts at a local timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub value: i64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, value: i64) -> Self {
        Self { timestamp, value }
    }
}

// ---------------------------------------------------------------------------
// ESPI feed tree
// ---------------------------------------------------------------------------

/// Root of a parsed Green Button (ESPI) feed. Immutable once parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feed {
    pub title: Option<String>,
    pub updated: Option<String>,
    pub published: Option<String>,
    pub usage_points: Vec<UsagePoint>,
}

/// A logical metering location (one meter / address) within a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsagePoint {
    /// `"<entry title> [<instance id>]"`
    pub name: String,
    /// Signed local-time offset in seconds, from LocalTimeParameters.
    pub time_offset_secs: i64,
    pub reading_blocks: Vec<ReadingBlock>,
}

/// One MeterReading grouping. Samples from every IntervalBlock that follows
/// the MeterReading are concatenated here in document order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingBlock {
    pub instance: String,
    pub updated: Option<String>,
    pub published: Option<String>,
    pub reading_type: Option<String>,
    pub samples: Vec<Sample>,
}

impl UsagePoint {
    pub fn new(name: String) -> Self {
        Self {
            name,
            time_offset_secs: 0,
            reading_blocks: Vec::new(),
        }
    }
}

impl ReadingBlock {
    pub fn new(instance: String, updated: Option<String>, published: Option<String>) -> Self {
        Self {
            instance,
            updated,
            published,
            reading_type: None,
            samples: Vec::new(),
        }
    }
}

impl Feed {
    /// Samples of reading block `block` under usage point `usage_point`,
    /// or `None` if either index is out of range.
    pub fn readings(&self, usage_point: usize, block: usize) -> Option<&[Sample]> {
        self.usage_points
            .get(usage_point)?
            .reading_blocks
            .get(block)
            .map(|b| b.samples.as_slice())
    }

    pub fn summary(&self) -> FeedSummary {
        FeedSummary {
            title: self.title.clone(),
            usage_points: self
                .usage_points
                .iter()
                .map(|up| {
                    (
                        up.name.clone(),
                        up.reading_blocks
                            .iter()
                            .map(|b| (b.instance.clone(), b.samples.len()))
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}

/// Counts of usage points, reading blocks and samples in a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSummary {
    pub title: Option<String>,
    /// (usage point name, [(block instance, sample count)])
    pub usage_points: Vec<(String, Vec<(String, usize)>)>,
}

impl FeedSummary {
    pub fn block_count(&self) -> usize {
        self.usage_points.iter().map(|(_, blocks)| blocks.len()).sum()
    }
}

impl fmt::Display for FeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Feed: {}", self.title.as_deref().unwrap_or("(untitled)"))?;
        writeln!(f, "  {} UsagePoints", self.usage_points.len())?;
        for (i, (name, blocks)) in self.usage_points.iter().enumerate() {
            writeln!(f, "  site [{}]: {}", i, name)?;
            for (instance, count) in blocks {
                writeln!(f, "    reading block [{}] {} obs", instance, count)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while turning an uploaded file into a reading series.
/// Any of these aborts the whole parse.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Can't find a suitable date format for '{0}'")]
    FormatNotRecognized(String),

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    #[error("Rejected unsafe XML construct: {0}")]
    SecurityRejected(String),

    #[error("File contains no readings")]
    EmptyFile,

    #[error(
        "Unrecognized zip format: no member named like '*electric*.xml' or '*electric*.csv'. \
         Try again with the xml or csv file unzipped."
    )]
    UnrecognizedArchive,

    #[error("Time difference must be at most {max_minutes} minutes between readings (smallest gap is {actual_minutes} minutes)")]
    IntervalTooCoarse { max_minutes: i64, actual_minutes: i64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Errors from the zip-code table, station rosters and weather archives.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Zip code not found in national list: {0}")]
    UnknownZip(String),

    #[error("No station data for {month}/{year}")]
    StationDataUnavailable { year: i32, month: u32 },

    #[error("Archive {archive} has no member {member}")]
    MissingArchiveMember { archive: String, member: String },

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Delimited data error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors from reshaping a reading series into period grids.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("Not enough readings to infer a daily cadence: {0}")]
    InsufficientData(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
