/// fingerprint_service: building energy fingerprints from interval meter data.
///
/// # Module structure
///
/// ```text
/// fingerprint_service
/// ├── model       - shared data types (Sample, Feed, Coordinate, IngestError, …)
/// ├── config      - service configuration loader (fingerprint.toml)
/// ├── logging     - tracing subscriber setup
/// ├── zipcodes    - zip code → latitude/longitude table
/// ├── stations    - nearest-station ranking and weather lookups by zip code
/// ├── ingest
/// │   ├── dates     - multi-layout timestamp resolution
/// │   ├── delimited - `date,reading` CSV import/export
/// │   ├── feed      - Green Button (ESPI Atom) XML parsing
/// │   ├── upload    - upload dispatch: extension, ZIP extraction, cadence check
/// │   ├── qclcd     - NOAA QCLCD monthly archive cache and CSV parsing
/// │   └── fixtures (test only) - representative feeds, exports, and rosters
/// └── analysis
///     ├── intervals - day/week breaks, cadence, and period grids
///     ├── stats     - per-period and per-slot summary statistics
///     ├── alignment - date merge-join against weather observations
///     └── building  - per-building summary bundle
/// ```

pub mod analysis;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod stations;
pub mod zipcodes;
