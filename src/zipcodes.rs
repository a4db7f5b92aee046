/// Postal code to coordinate lookup.
///
/// Backed by the zip code table (`zip,city,state,latitude,longitude,
/// timezone,dst`, header row first), circa 2004. Codes are keyed by numeric
/// value so "02138" and "2138" resolve the same way.
///
/// Construct one `ZipTable` at process start and pass it by shared
/// reference; it is read-only after loading.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{info, warn};

use crate::model::{Coordinate, WeatherError};

const COL_ZIP: usize = 0;
const COL_LATITUDE: usize = 3;
const COL_LONGITUDE: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct ZipTable {
    entries: HashMap<u32, Coordinate>,
}

impl ZipTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, WeatherError> {
        Self::from_reader(File::open(path)?)
    }

    /// Parses the table. Rows with a non-numeric zip or coordinate are
    /// logged and skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, WeatherError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for result in reader.records() {
            let record = result?;
            let parsed = (
                record.get(COL_ZIP).and_then(|z| z.parse::<u32>().ok()),
                record.get(COL_LATITUDE).and_then(|v| v.parse::<f64>().ok()),
                record.get(COL_LONGITUDE).and_then(|v| v.parse::<f64>().ok()),
            );
            match parsed {
                (Some(zip), Some(lat), Some(lon)) => {
                    entries.insert(zip, Coordinate::new(lat, lon));
                }
                _ => warn!("Skipping malformed zip code row: {:?}", record),
            }
        }

        info!("Zip to lat/long lookup initialized with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Coordinate of a 5-digit zip code.
    ///
    /// # Errors
    /// `UnknownZip` if the code is not numeric or not in the table.
    pub fn lookup(&self, zip5: &str) -> Result<Coordinate, WeatherError> {
        zip5.trim()
            .parse::<u32>()
            .ok()
            .and_then(|zip| self.entries.get(&zip).copied())
            .ok_or_else(|| WeatherError::UnknownZip(zip5.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
