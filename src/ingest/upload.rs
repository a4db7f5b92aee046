/// Routes an uploaded meter file to the right parser.
///
/// Uploads arrive as a delimited export, a Green Button feed, or a ZIP of
/// either (utilities commonly zip gas and electric exports together). For
/// archives, the first member whose name looks like `*electric*.xml` or
/// `*electric*.csv` is used and the rest are ignored.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::ingest::delimited::parse_delimited;
use crate::ingest::feed::{FeedOptions, parse_feed_with};
use crate::model::{IngestError, Sample};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

static ELECTRIC_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^.*electric.*\.(xml|csv)").expect("electric member pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Feed,
}

impl SourceFormat {
    /// `csv` is a delimited export, `xml` a feed. Anything else is tried as
    /// a feed.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => SourceFormat::Delimited,
            "xml" => SourceFormat::Feed,
            other => {
                warn!("Unrecognized extension '{}'; trying the feed parser", other);
                SourceFormat::Feed
            }
        }
    }

    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default(),
        )
    }
}

/// The archive member chosen by `extract_electric_member`.
#[derive(Debug)]
pub struct ElectricMember {
    pub name: String,
    pub format: SourceFormat,
    pub data: Vec<u8>,
}

/// Reads and parses an uploaded file.
///
/// Feeds yield the first reading block of the first usage point; delimited
/// files yield every row.
///
/// # Errors
/// Any `IngestError` from the underlying parser, `UnrecognizedArchive` for a
/// ZIP without an electric member, or `EmptyFile` for a feed with no readings.
pub fn parse_reading_file(path: &Path, options: &FeedOptions) -> Result<Vec<Sample>, IngestError> {
    let bytes = fs::read(path)?;
    parse_reading_bytes(path, &bytes, options)
}

/// As `parse_reading_file`, for contents already in memory. `path` only
/// supplies the extension.
pub fn parse_reading_bytes(
    path: &Path,
    bytes: &[u8],
    options: &FeedOptions,
) -> Result<Vec<Sample>, IngestError> {
    if bytes.starts_with(ZIP_MAGIC) {
        let member = extract_electric_member(bytes)?;
        info!("Using archive member {} ({:?})", member.name, member.format);
        return parse_as(member.format, &member.data, options);
    }
    parse_as(SourceFormat::from_path(path), bytes, options)
}

fn parse_as(format: SourceFormat, data: &[u8], options: &FeedOptions) -> Result<Vec<Sample>, IngestError> {
    match format {
        SourceFormat::Delimited => parse_delimited(data),
        SourceFormat::Feed => {
            let feed = parse_feed_with(data, options)?;
            debug!("{}", feed.summary());
            feed.readings(0, 0)
                .filter(|samples| !samples.is_empty())
                .map(<[Sample]>::to_vec)
                .ok_or(IngestError::EmptyFile)
        }
    }
}

/// Pulls the first `*electric*.xml` / `*electric*.csv` member out of a ZIP.
pub fn extract_electric_member(bytes: &[u8]) -> Result<ElectricMember, IngestError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        let Some(captures) = ELECTRIC_MEMBER.captures(&name) else {
            continue;
        };
        let format = if captures[1].eq_ignore_ascii_case("csv") {
            SourceFormat::Delimited
        } else {
            SourceFormat::Feed
        };

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        return Ok(ElectricMember { name, format, data });
    }

    Err(IngestError::UnrecognizedArchive)
}

/// Rejects a series whose finest sample spacing is coarser than `max_gap`.
///
/// Daily or monthly billing data would otherwise produce meaningless
/// time-of-day statistics. Fewer than two samples have no spacing to check.
pub fn check_interval_resolution(samples: &[Sample], max_gap: Duration) -> Result<(), IngestError> {
    let Some(smallest) = samples
        .windows(2)
        .map(|w| w[1].timestamp - w[0].timestamp)
        .min()
    else {
        return Ok(());
    };

    if smallest > max_gap {
        return Err(IngestError::IntervalTooCoarse {
            max_minutes: max_gap.num_minutes(),
            actual_minutes: smallest.num_minutes(),
        });
    }
    Ok(())
}
