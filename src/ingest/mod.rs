/// Parsers for everything the service reads from outside.
///
/// Submodules:
/// - `dates`     - ordered timestamp layouts for delimited exports
/// - `delimited` - `date,reading` CSV exports (and writing them back out)
/// - `feed`      - Green Button / ESPI Atom feeds
/// - `upload`    - routes an uploaded file or ZIP to the right parser
/// - `qclcd`     - NOAA QCLCD monthly weather archives and their cache

pub mod dates;
pub mod delimited;
pub mod feed;
pub mod qclcd;
pub mod upload;

#[cfg(test)]
pub(crate) mod fixtures;
