/// Timestamp resolution for delimited meter exports.
///
/// Utilities export interval data with whatever timestamp layout their
/// software happens to use. `resolve_timestamp` tries a fixed, ordered list
/// of layouts and returns the first that parses the whole string.
///
/// Ordering matters because chrono's `%Y` accepts fewer than four digits:
/// every two-digit-year (`%y`) layout is tried before any four-digit-year
/// layout using the same separator, so that `03-07-13 00:00` is read as
/// 2013-03-07 and not as ISO year 3. A four-digit year can never satisfy a
/// `%y` layout (its third digit lands where a separator is expected), so the
/// earlier `%y` attempts cannot swallow it.

use chrono::NaiveDateTime;

use crate::model::IngestError;

/// Candidate layouts, in the order they are tried.
pub const CANDIDATE_FORMATS: &[&str] = &[
    // C-locale default representation, e.g. "Sat Oct 29 13:45:00 2011"
    "%c",
    // US month-day-year, dashes, two-digit year. Must precede ISO: "03-07-13"
    // is otherwise a valid year-3 ISO date.
    "%m-%d-%y %H:%M:%S",
    "%m-%d-%y %H:%M",
    // ISO-like
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    // US month-day-year, dashes, four-digit year
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    // US month/day/year, slashes, 12-hour clock
    "%m/%d/%y %I:%M:%S%p",
    "%m/%d/%y %I:%M%p",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%Y %I:%M:%S%p",
    "%m/%d/%Y %I:%M%p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    // US month/day/year, slashes, 24-hour clock
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses `text` against `CANDIDATE_FORMATS` in order.
///
/// # Errors
/// `IngestError::FormatNotRecognized` if no layout matches.
pub fn resolve_timestamp(text: &str) -> Result<NaiveDateTime, IngestError> {
    let trimmed = text.trim();
    CANDIDATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| IngestError::FormatNotRecognized(trimmed.to_string()))
}
