/// Two-column delimited meter exports: `date,reading` header then one row per
/// interval.
///
/// Timestamps go through `dates::resolve_timestamp`; readings must be whole
/// watts. The first bad row aborts the parse, so callers never see a
/// partially-read series.

use std::io::{self, Write};

use csv::{ReaderBuilder, Trim, WriterBuilder};

use crate::ingest::dates::resolve_timestamp;
use crate::model::{IngestError, Sample};

/// Timestamp layout used by `write_series`.
pub const EXPORT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Parses a delimited export into samples, in file order.
///
/// # Errors
/// - `MalformedRow` if a row has fewer than two columns or a non-integer reading
/// - `FormatNotRecognized` if a timestamp matches none of the candidate layouts
/// - `EmptyFile` if nothing follows the header row
pub fn parse_delimited(data: &[u8]) -> Result<Vec<Sample>, IngestError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let mut samples = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| IngestError::MalformedRow {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let (date, reading) = match (record.get(0), record.get(1)) {
            (Some(date), Some(reading)) => (date, reading),
            _ => {
                return Err(IngestError::MalformedRow {
                    line,
                    reason: format!("expected 2 columns, found {}", record.len()),
                });
            }
        };

        let timestamp = resolve_timestamp(date)?;
        let value: i64 = reading.parse().map_err(|_| IngestError::MalformedRow {
            line,
            reason: format!("reading '{}' is not an integer", reading),
        })?;

        samples.push(Sample::new(timestamp, value));
    }

    if samples.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    Ok(samples)
}

/// Writes samples as a `date,reading` export readable by `parse_delimited`.
pub fn write_series<W: Write>(samples: &[Sample], out: W) -> Result<(), IngestError> {
    let mut writer = WriterBuilder::new().from_writer(out);
    writer
        .write_record(["date", "reading"])
        .map_err(io::Error::from)?;
    for sample in samples {
        writer
            .write_record([
                sample.timestamp.format(EXPORT_FORMAT).to_string(),
                sample.value.to_string(),
            ])
            .map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}
