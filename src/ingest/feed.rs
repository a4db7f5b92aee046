/// Green Button (ESPI) feed parser.
///
/// A feed is an Atom document whose entries each carry one ESPI resource:
///
///   feed
///     title / updated / published
///     entry*
///       link rel="self" href=".../<Type>/<instance>"
///       title
///       content
///         <UsagePoint> | <LocalTimeParameters> | <MeterReading>
///         | <ReadingType> | <IntervalBlock> | ...
///
/// Entries arrive flat and in document order. A UsagePoint entry opens a new
/// metering location, MeterReading opens a reading block under it, and every
/// following IntervalBlock appends its IntervalReadings to that block. The
/// walk is an explicit state machine (`ParseState`), so a partial block is
/// complete exactly when a transition flushes it.
///
/// Input is user-uploaded. The document is parsed by roxmltree with DTD
/// support off: any `<!DOCTYPE` is rejected outright, which rules out entity
/// expansion bombs, external entities and DTD retrieval in one place.

use chrono::{DateTime, NaiveDateTime};
use roxmltree::{Document, Node, ParsingOptions};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::model::{Feed, IngestError, ReadingBlock, Sample, UsagePoint};

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const ESPI_NS: &str = "http://naesb.org/espi";

/// Instance id used when an entry has no self link to take one from.
const DEFAULT_INSTANCE: &str = "001";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// How a UsagePoint's `tzOffset` is applied to IntervalReading start times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetConvention {
    /// `local = start - tzOffset`. Historical behavior of this service.
    #[default]
    Subtract,
    /// `local = start + tzOffset`, as ESPI defines it.
    Add,
}

impl OffsetConvention {
    /// Local epoch seconds, or `None` if the result doesn't fit in an i64.
    pub fn apply(self, epoch_secs: i64, offset_secs: i64) -> Option<i64> {
        match self {
            OffsetConvention::Subtract => epoch_secs.checked_sub(offset_secs),
            OffsetConvention::Add => epoch_secs.checked_add(offset_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeedOptions {
    pub offset_convention: OffsetConvention,
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

enum ParseState {
    Idle,
    InUsagePoint(UsagePoint),
    InReadingBlock(UsagePoint, ReadingBlock),
}

impl ParseState {
    /// Closes any open block and usage point, appending them to `feed`.
    fn flush(self, feed: &mut Feed) {
        match self {
            ParseState::Idle => {}
            ParseState::InUsagePoint(up) => feed.usage_points.push(up),
            ParseState::InReadingBlock(mut up, block) => {
                up.reading_blocks.push(block);
                feed.usage_points.push(up);
            }
        }
    }

    fn usage_point_mut(&mut self) -> Option<&mut UsagePoint> {
        match self {
            ParseState::Idle => None,
            ParseState::InUsagePoint(up) | ParseState::InReadingBlock(up, _) => Some(up),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parses a feed with the default options.
pub fn parse_feed(xml: &[u8]) -> Result<Feed, IngestError> {
    parse_feed_with(xml, &FeedOptions::default())
}

/// Parses a feed document into its usage point / reading block tree.
///
/// # Errors
/// - `SecurityRejected` for documents carrying a DTD or entity tricks
/// - `MalformedFeed` for XML errors, an IntervalReading missing its start or
///   value, or readings that appear before any UsagePoint
pub fn parse_feed_with(xml: &[u8], options: &FeedOptions) -> Result<Feed, IngestError> {
    let text = std::str::from_utf8(xml)
        .map_err(|e| IngestError::MalformedFeed(format!("not UTF-8: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let doc = Document::parse_with_options(
        text,
        ParsingOptions {
            allow_dtd: false,
            ..ParsingOptions::default()
        },
    )
    .map_err(classify_xml_error)?;

    let root = doc.root_element();
    let mut feed = Feed {
        title: atom_text(root, "title"),
        updated: atom_text(root, "updated"),
        published: atom_text(root, "published"),
        usage_points: Vec::new(),
    };

    let mut state = ParseState::Idle;
    for entry in root.children().filter(|n| n.has_tag_name((ATOM_NS, "entry"))) {
        let Some((entry_type, instance)) = entry_type(entry) else {
            debug!("Ignoring feed entry with no self link or content");
            continue;
        };
        state = apply_entry(state, &mut feed, entry, &entry_type, &instance, options)?;
    }
    state.flush(&mut feed);

    Ok(feed)
}

// ---------------------------------------------------------------------------
// Entry handling
// ---------------------------------------------------------------------------

fn apply_entry(
    state: ParseState,
    feed: &mut Feed,
    entry: Node,
    entry_type: &str,
    instance: &str,
    options: &FeedOptions,
) -> Result<ParseState, IngestError> {
    match entry_type {
        "UsagePoint" => {
            state.flush(feed);
            let title = atom_text(entry, "title");
            let name = format!("{} [{}]", title.as_deref().unwrap_or("(untitled)"), instance);
            Ok(ParseState::InUsagePoint(UsagePoint::new(name)))
        }

        "LocalTimeParameters" => {
            let mut state = state;
            let Some(offset_node) = entry
                .descendants()
                .find(|n| n.has_tag_name((ESPI_NS, "tzOffset")))
            else {
                return Ok(state);
            };
            let offset = parse_integer(offset_node, "tzOffset")?;
            match state.usage_point_mut() {
                Some(up) => up.time_offset_secs = offset,
                None => warn!("LocalTimeParameters before any UsagePoint; offset {} ignored", offset),
            }
            Ok(state)
        }

        "MeterReading" => {
            let block = ReadingBlock::new(
                instance.to_string(),
                atom_text(entry, "updated"),
                atom_text(entry, "published"),
            );
            match state {
                ParseState::Idle => Err(IngestError::MalformedFeed(
                    "MeterReading before any UsagePoint".to_string(),
                )),
                ParseState::InUsagePoint(up) => Ok(ParseState::InReadingBlock(up, block)),
                ParseState::InReadingBlock(mut up, previous) => {
                    // A MeterReading that never got an IntervalBlock is dropped.
                    if previous.samples.is_empty() {
                        debug!("Dropping empty reading block {}", previous.instance);
                    } else {
                        up.reading_blocks.push(previous);
                    }
                    Ok(ParseState::InReadingBlock(up, block))
                }
            }
        }

        "ReadingType" => match state {
            ParseState::InReadingBlock(up, mut block) => {
                block.reading_type = Some(instance.to_string());
                Ok(ParseState::InReadingBlock(up, block))
            }
            other => {
                debug!("ReadingType {} outside a MeterReading; ignored", instance);
                Ok(other)
            }
        },

        "IntervalBlock" => match state {
            ParseState::Idle => Err(IngestError::MalformedFeed(
                "IntervalBlock before any UsagePoint".to_string(),
            )),
            ParseState::InUsagePoint(up) => {
                // No MeterReading entry: the readings still need a block to live in.
                let mut block = ReadingBlock::new(
                    instance.to_string(),
                    atom_text(entry, "updated"),
                    atom_text(entry, "published"),
                );
                append_readings(entry, up.time_offset_secs, options, &mut block)?;
                Ok(ParseState::InReadingBlock(up, block))
            }
            ParseState::InReadingBlock(up, mut block) => {
                append_readings(entry, up.time_offset_secs, options, &mut block)?;
                Ok(ParseState::InReadingBlock(up, block))
            }
        },

        other => {
            debug!("Ignoring feed entry: {} {}", other, instance);
            Ok(state)
        }
    }
}

/// Appends every IntervalReading under `entry` to `block`, in document order.
fn append_readings(
    entry: Node,
    offset_secs: i64,
    options: &FeedOptions,
    block: &mut ReadingBlock,
) -> Result<(), IngestError> {
    for reading in entry
        .descendants()
        .filter(|n| n.has_tag_name((ESPI_NS, "IntervalReading")))
    {
        let start_node = reading
            .descendants()
            .filter(|n| n.has_tag_name((ESPI_NS, "timePeriod")))
            .find_map(|period| espi_child(period, "start"))
            .ok_or_else(|| {
                IngestError::MalformedFeed("IntervalReading without timePeriod/start".to_string())
            })?;
        let value_node = espi_child(reading, "value").ok_or_else(|| {
            IngestError::MalformedFeed("IntervalReading without value".to_string())
        })?;

        let start = parse_integer(start_node, "start")?;
        let value = parse_integer(value_node, "value")?;
        let local = options
            .offset_convention
            .apply(start, offset_secs)
            .ok_or_else(|| IngestError::MalformedFeed("start/tzOffset out of range".to_string()))?;
        let timestamp = local_timestamp(local)?;

        block.samples.push(Sample::new(timestamp, value));
    }
    Ok(())
}

/// Determines an entry's resource type and instance id.
///
/// The self link's last two path segments are `<Type>/<instance>`. Without a
/// self link, the local name of the first element inside `content` is the
/// type and the instance defaults to "001".
fn entry_type(entry: Node) -> Option<(String, String)> {
    let self_href = entry
        .children()
        .filter(|n| n.has_tag_name((ATOM_NS, "link")))
        .find(|n| n.attribute("rel") == Some("self"))
        .and_then(|n| n.attribute("href"));

    if let Some(href) = self_href {
        let parts: Vec<&str> = href.split('/').collect();
        return match parts.as_slice() {
            [.., kind, instance] => Some((kind.to_string(), instance.to_string())),
            _ => Some((href.to_string(), DEFAULT_INSTANCE.to_string())),
        };
    }

    entry
        .children()
        .find(|n| n.has_tag_name((ATOM_NS, "content")))
        .and_then(|content| content.children().find(|n| n.is_element()))
        .map(|payload| {
            (
                payload.tag_name().name().to_string(),
                DEFAULT_INSTANCE.to_string(),
            )
        })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn atom_text(node: Node, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name((ATOM_NS, name)))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
}

fn espi_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name((ESPI_NS, name)))
}

fn parse_integer(node: Node, field: &str) -> Result<i64, IngestError> {
    let text = node.text().map(str::trim).unwrap_or("");
    text.parse().map_err(|_| {
        IngestError::MalformedFeed(format!("{} '{}' is not an integer", field, text))
    })
}

/// Seconds since the epoch to a naive timestamp, read as UTC so the result
/// never depends on the host's time zone.
fn local_timestamp(secs: i64) -> Result<NaiveDateTime, IngestError> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| IngestError::MalformedFeed(format!("start {} is out of range", secs)))
}

fn classify_xml_error(err: roxmltree::Error) -> IngestError {
    match err {
        roxmltree::Error::DtdDetected
        | roxmltree::Error::EntityReferenceLoop(..)
        | roxmltree::Error::NodesLimitReached => IngestError::SecurityRejected(err.to_string()),
        other => IngestError::MalformedFeed(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
