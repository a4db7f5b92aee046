/// Weather station selection for a building's location.
///
/// The station roster is re-published every month (stations open, close and
/// move), so "nearest station to this zip code" is always asked for a
/// specific year and month. Distances are great-circle (haversine) from the
/// zip code's centroid.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::WeatherConfig;
use crate::ingest::qclcd::{DailyObservation, QclcdArchive, WeatherStation};
use crate::model::{Coordinate, WeatherError};
use crate::zipcodes::ZipTable;

/// Mean earth radius used for station distances, in km.
pub const EARTH_RADIUS_KM: f64 = 6367.0;

pub const DEFAULT_STATION_CANDIDATES: usize = 5;
pub const DEFAULT_WARN_DISTANCE_KM: f64 = 15.0;

/// Great-circle distance between two coordinates, in km.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.latitude.to_radians(), a.longitude.to_radians());
    let (lat2, lon2) = (b.latitude.to_radians(), b.longitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * EARTH_RADIUS_KM
}

/// A station together with its distance from the queried zip code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStation {
    pub station: WeatherStation,
    pub distance_km: f64,
}

pub struct WeatherStationIndex<'z> {
    zips: &'z ZipTable,
    archive: QclcdArchive,
    station_candidates: usize,
    warn_distance_km: f64,
}

impl<'z> WeatherStationIndex<'z> {
    pub fn new(zips: &'z ZipTable, archive: QclcdArchive) -> Self {
        Self {
            zips,
            archive,
            station_candidates: DEFAULT_STATION_CANDIDATES,
            warn_distance_km: DEFAULT_WARN_DISTANCE_KM,
        }
    }

    /// Index over HTTP-backed archives, with `[weather]` limits applied.
    pub fn from_config(zips: &'z ZipTable, config: &WeatherConfig) -> Result<Self, WeatherError> {
        Ok(Self::new(zips, QclcdArchive::from_config(config)?)
            .with_station_candidates(config.station_candidates)
            .with_warn_distance_km(config.warn_distance_km))
    }

    pub fn with_station_candidates(mut self, n: usize) -> Self {
        self.station_candidates = n.max(1);
        self
    }

    pub fn with_warn_distance_km(mut self, km: f64) -> Self {
        self.warn_distance_km = km;
        self
    }

    pub fn zip_to_coordinate(&self, zip5: &str) -> Result<Coordinate, WeatherError> {
        self.zips.lookup(zip5)
    }

    /// The `n` stations closest to `zip5` in that month's roster, nearest
    /// first. Fewer are returned if the roster is smaller than `n`.
    ///
    /// # Errors
    /// - `UnknownZip` if the zip code is not in the table
    /// - `StationDataUnavailable` if the month's roster is empty
    /// - archive download / read errors
    pub fn nearest_stations(
        &self,
        zip5: &str,
        year: i32,
        month: u32,
        n: usize,
    ) -> Result<Vec<RankedStation>, WeatherError> {
        let origin = self.zip_to_coordinate(zip5)?;
        let roster = self.archive.station_roster(year, month)?;
        if roster.is_empty() {
            return Err(WeatherError::StationDataUnavailable { year, month });
        }

        let mut ranked: Vec<RankedStation> = roster
            .into_iter()
            .map(|station| {
                let distance_km =
                    haversine_km(origin, Coordinate::new(station.latitude, station.longitude));
                RankedStation { station, distance_km }
            })
            .collect();
        ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        ranked.truncate(n);

        if let Some(closest) = ranked.first() {
            if closest.distance_km > self.warn_distance_km {
                warn!(
                    "Closest weather station to {} (WBAN {}, {}) is {:.2}km away",
                    zip5, closest.station.wban, closest.station.name, closest.distance_km
                );
            }
        }
        Ok(ranked)
    }

    /// Daily observations for the month from the nearest station that has
    /// any, trying up to `station_candidates` stations. Empty if none do.
    pub fn monthly_daily_observations(
        &self,
        zip5: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<DailyObservation>, WeatherError> {
        let candidates = self.nearest_stations(zip5, year, month, self.station_candidates)?;
        let daily = self.archive.daily_observations(year, month)?;

        for candidate in &candidates {
            let subset: Vec<DailyObservation> = daily
                .iter()
                .filter(|obs| obs.wban == candidate.station.wban)
                .cloned()
                .collect();
            if !subset.is_empty() {
                return Ok(subset);
            }
            debug!(
                "WBAN {} has no daily data for {}/{}; trying next station",
                candidate.station.wban, month, year
            );
        }
        Ok(Vec::new())
    }

    /// Daily observations for every month touched by `start..=end`. Months
    /// with no published roster are skipped with a warning.
    pub fn observations_for_range(
        &self,
        zip5: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyObservation>, WeatherError> {
        let mut observations = Vec::new();
        for (year, month) in months_between(start, end) {
            match self.monthly_daily_observations(zip5, year, month) {
                Ok(month_obs) => observations.extend(month_obs),
                Err(WeatherError::StationDataUnavailable { year, month }) => {
                    warn!("No station data for {}/{}, so closest WBAN not found", month, year);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(observations)
    }
}

/// Every (year, month) from `start`'s month through `end`'s, inclusive.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<(i32, u32)> {
    let mut months = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    while (year, month) <= (end.year(), end.month()) {
        months.push((year, month));
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    months
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use crate::ingest::qclcd::{ArchiveSource, QCLCD_BASE_URL};
    use std::fs;
    use std::io::{self, Write};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    const ZIPS: &str = "zip,city,state,latitude,longitude,timezone,dst\n\
                        94305,Stanford,CA,37.4275,-122.1697,-8,1\n\
                        94043,Mountain View,CA,37.4193,-122.0574,-8,1\n\
                        02138,Cambridge,MA,42.380044,-71.13464,-5,1\n";

    const HEADER_ONLY_ROSTER: &str = "WBAN|WMO|CallSign|ClimateDivisionCode|ClimateDivisionStateCode|ClimateDivisionStationCode|Name|State|Location|Latitude|Longitude|GroundHeight|StationHeight|Barometer|TimeZone\n";

    /// Serves the fixture roster for every month except `unpublished`, which
    /// gets a header-only roster.
    struct FixtureSource {
        roster: &'static str,
        unpublished: Option<&'static str>,
    }

    impl ArchiveSource for FixtureSource {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, WeatherError> {
            let stamp = url
                .trim_end_matches(".zip")
                .rsplit("QCLCD")
                .next()
                .unwrap_or_default()
                .to_string();
            let roster = if self.unpublished == Some(stamp.as_str()) {
                HEADER_ONLY_ROSTER
            } else {
                self.roster
            };
            let station_name = format!("{}station.txt", stamp);
            let daily_name = format!("{}daily.txt", stamp);
            Ok(zip_archive(&[
                (station_name.as_str(), roster),
                (daily_name.as_str(), fixture_daily_observations()),
            ]))
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fingerprint_stations_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn index<'z>(zips: &'z ZipTable, dir: &Path, roster: &'static str) -> WeatherStationIndex<'z> {
        WeatherStationIndex::new(
            zips,
            QclcdArchive::new(
                dir,
                QCLCD_BASE_URL,
                Box::new(FixtureSource {
                    roster,
                    unpublished: None,
                }),
            ),
        )
    }

    fn zips() -> ZipTable {
        ZipTable::from_reader(ZIPS.as_bytes()).unwrap()
    }

    #[test]
    fn test_haversine_bay_area_pair() {
        let d = haversine_km(
            Coordinate::new(37.4275, -122.1697),
            Coordinate::new(37.3382, -121.8863),
        );
        assert!((d - 26.9).abs() < 0.5, "distance was {}", d);
    }

    #[test]
    fn test_haversine_is_symmetric_and_zero_at_origin() {
        let a = Coordinate::new(40.6939, -89.5898);
        let b = Coordinate::new(41.8781, -87.6298);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
        assert_eq!(haversine_km(a, a), 0.0);
    }

    #[test]
    fn test_nearest_stations_are_sorted_by_distance() {
        let zips = zips();
        let dir = scratch_dir("sorted");
        let index = index(&zips, &dir, fixture_station_roster());

        let ranked = index.nearest_stations("94305", 2013, 3, 3).unwrap();
        let calls: Vec<&str> = ranked.iter().map(|r| r.station.call_sign.as_str()).collect();
        assert_eq!(calls, vec!["PAO", "NUQ", "SJC"]);
        assert!(ranked.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
        assert!((ranked[0].distance_km - 6.09).abs() < 0.05);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_n_is_capped_at_roster_size() {
        let zips = zips();
        let dir = scratch_dir("capped");
        let index = index(&zips, &dir, fixture_station_roster());
        assert_eq!(index.nearest_stations("94305", 2013, 3, 10).unwrap().len(), 3);
        assert_eq!(index.nearest_stations("94305", 2013, 3, 1).unwrap().len(), 1);
        let _ = fs::remove_dir_all(&dir);
    }

    /// Log sink shared between the test and a scoped fmt subscriber.
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    /// Runs `f` with WARN-and-above events written to the returned log.
    fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, String) {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, log.contents())
    }

    #[test]
    fn test_distant_closest_station_still_returned() {
        let zips = zips();
        let dir = scratch_dir("distant");
        let index = index(&zips, &dir, fixture_station_roster());
        let (ranked, log) = capture_warnings(|| index.nearest_stations("02138", 2013, 3, 1));
        let ranked = ranked.unwrap();
        assert!(ranked[0].distance_km > 4000.0);
        assert!(
            log.contains("Closest weather station to 02138"),
            "expected a distance warning, log was: {}",
            log
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_nearby_station_logs_no_distance_warning() {
        let zips = zips();
        let dir = scratch_dir("nearby");
        let index = index(&zips, &dir, fixture_station_roster());
        let (ranked, log) = capture_warnings(|| index.nearest_stations("94305", 2013, 3, 1));
        assert!(ranked.unwrap()[0].distance_km < 15.0);
        assert!(!log.contains("Closest weather station"), "unexpected warning: {}", log);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_zip_fails_before_download() {
        let zips = zips();
        let dir = scratch_dir("unknown");
        let index = index(&zips, &dir, fixture_station_roster());
        assert!(matches!(
            index.nearest_stations("00000", 2013, 3, 1),
            Err(WeatherError::UnknownZip(_))
        ));
        assert!(!dir.exists(), "nothing should have been downloaded");
    }

    #[test]
    fn test_empty_roster_is_station_data_unavailable() {
        let zips = zips();
        let dir = scratch_dir("empty");
        let index = index(&zips, &dir, HEADER_ONLY_ROSTER);
        assert!(matches!(
            index.nearest_stations("94305", 2013, 3, 1),
            Err(WeatherError::StationDataUnavailable { year: 2013, month: 3 })
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_monthly_observations_come_from_nearest_station() {
        let zips = zips();
        let dir = scratch_dir("nearest_obs");
        let index = index(&zips, &dir, fixture_station_roster());
        let obs = index.monthly_daily_observations("94305", 2013, 3).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].wban, "93231");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_station_without_data_falls_back_to_next() {
        // Moffett (NUQ) is closest to Mountain View but reports nothing.
        let zips = zips();
        let dir = scratch_dir("fallback");
        let index = index(&zips, &dir, fixture_station_roster());
        let ranked = index.nearest_stations("94043", 2013, 3, 1).unwrap();
        assert_eq!(ranked[0].station.call_sign, "NUQ");

        let obs = index.monthly_daily_observations("94043", 2013, 3).unwrap();
        assert!(obs.iter().all(|o| o.wban == "93231"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_single_candidate_without_data_yields_empty() {
        let zips = zips();
        let dir = scratch_dir("single");
        let index = index(&zips, &dir, fixture_station_roster()).with_station_candidates(1);
        assert!(index.monthly_daily_observations("94043", 2013, 3).unwrap().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_range_concatenates_months() {
        let zips = zips();
        let dir = scratch_dir("range");
        let index = index(&zips, &dir, fixture_station_roster());
        let start = NaiveDate::from_ymd_opt(2013, 2, 20).unwrap();
        let end = NaiveDate::from_ymd_opt(2013, 3, 5).unwrap();
        // Each month's archive carries the same daily rows, so both months
        // contribute PAO's single day.
        let obs = index.observations_for_range("94305", start, end).unwrap();
        assert_eq!(obs.len(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_range_skips_month_without_roster() {
        let zips = zips();
        let dir = scratch_dir("range_gap");
        let index = WeatherStationIndex::new(
            &zips,
            QclcdArchive::new(
                &dir,
                QCLCD_BASE_URL,
                Box::new(FixtureSource {
                    roster: fixture_station_roster(),
                    unpublished: Some("201302"),
                }),
            ),
        );
        let start = NaiveDate::from_ymd_opt(2013, 2, 20).unwrap();
        let end = NaiveDate::from_ymd_opt(2013, 3, 5).unwrap();
        let obs = index.observations_for_range("94305", start, end).unwrap();
        assert_eq!(obs.len(), 1, "only March has a roster");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_months_between_crosses_year_end() {
        let start = NaiveDate::from_ymd_opt(2012, 11, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2013, 2, 1).unwrap();
        assert_eq!(
            months_between(start, end),
            vec![(2012, 11), (2012, 12), (2013, 1), (2013, 2)]
        );
        assert!(months_between(end, start).is_empty());
    }
}
