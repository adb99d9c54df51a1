//! Telescope Hex Record Decoder
//!
//! Each line written by a telescope's counting board is one of:
//!
//! - a data record: 8 hexadecimal digits `CCCCCCFF`, where `CCCCCC` is the
//!   device clock in whole seconds and `FF` the sub-second tick count;
//! - a GPS reference record: a comma-delimited NMEA-style sentence with the
//!   board's clock stamp (same 8-digit layout) appended to the end.
//!
//! Reference sentences are often damaged in transit, so their fields are
//! located by comma position rather than by character offset.
//!
//! Malformed lines are reported with their 1-based line number and literal
//! content; decoding always continues with the next line.

use crate::types::{ClockSample, ClockScale};
use serde::Serialize;
use thiserror::Error;

/// Hex digits in a data record (and in a reference record's trailing stamp).
pub const RECORD_WIDTH: usize = 8;

/// Hex digits holding whole seconds.
const COARSE_WIDTH: usize = 6;

/// Comma-delimited field positions within a reference sentence
pub mod reference_fields {
    /// UTC time of fix, `hhmmss[.sss]`
    pub const TIME: usize = 1;
    /// Fix status, `A` (active) or `V` (void)
    pub const STATUS: usize = 2;
    /// UTC date of fix, `ddmmyy`
    pub const DATE: usize = 9;
}

/// Why a record could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum DecodeFailure {
    #[error("not an 8-digit hex timestamp")]
    NotHex,

    #[error("reference record is missing its {0} field")]
    MissingReferenceField(&'static str),

    #[error("reference record has no readable trailing clock stamp")]
    BadReferenceClock,
}

/// A record that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("line {line}: {reason}: {content:?}")]
pub struct DecodeError {
    /// 1-based line number in the channel's input
    pub line: usize,
    /// Literal record content (trailing whitespace removed)
    pub content: String,
    pub reason: DecodeFailure,
}

/// A structurally valid GPS reference record, kept verbatim for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRecord {
    pub line: usize,
    pub raw: String,
}

/// Successful decode of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRecord {
    Data(ClockSample),
    Reference(ReferenceRecord),
}

/// Decode a fixed-width `CCCCCCFF` hex stamp.
///
/// Returns `None` unless `text` is exactly 8 hex digits.
pub fn parse_clock_stamp(text: &str) -> Option<ClockSample> {
    if text.len() != RECORD_WIDTH || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let coarse = u32::from_str_radix(&text[..COARSE_WIDTH], 16).ok()?;
    let fine = u8::from_str_radix(&text[COARSE_WIDTH..], 16).ok()?;
    Some(ClockSample::new(coarse, fine))
}

/// Decode a single raw line.
pub fn decode_record(line: usize, raw: &str) -> Result<DecodedRecord, DecodeError> {
    let record = raw.trim_end();
    let fail = |reason| DecodeError {
        line,
        content: record.to_string(),
        reason,
    };

    if let Some(sample) = parse_clock_stamp(record.trim_start()) {
        return Ok(DecodedRecord::Data(sample));
    }

    if !(record.contains(',') && record.contains('.')) {
        return Err(fail(DecodeFailure::NotHex));
    }

    let fields: Vec<&str> = record.split(',').collect();
    let required = [
        (reference_fields::TIME, "time"),
        (reference_fields::STATUS, "status"),
        (reference_fields::DATE, "date"),
    ];
    for (index, name) in required {
        if fields.get(index).map_or(true, |f| f.trim().is_empty()) {
            return Err(fail(DecodeFailure::MissingReferenceField(name)));
        }
    }

    trailing_clock_stamp(record).ok_or_else(|| fail(DecodeFailure::BadReferenceClock))?;

    Ok(DecodedRecord::Reference(ReferenceRecord {
        line,
        raw: record.to_string(),
    }))
}

/// Clock stamp appended to the end of a reference sentence.
pub fn trailing_clock_stamp(record: &str) -> Option<ClockSample> {
    let record = record.trim_end();
    let start = record.len().checked_sub(RECORD_WIDTH)?;
    record.get(start..).and_then(parse_clock_stamp)
}

/// Everything recovered from one channel's raw input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedStream {
    /// Data samples in input order
    pub samples: Vec<ClockSample>,
    /// Reference sentences in input order
    pub references: Vec<ReferenceRecord>,
    /// Lines that could not be interpreted
    pub errors: Vec<DecodeError>,
}

impl DecodedStream {
    /// Number of samples whose fine counter overran the full second.
    ///
    /// These are real detections and are kept; the count is a diagnostic.
    pub fn rollovers(&self, scale: ClockScale) -> usize {
        self.samples.iter().filter(|s| s.is_rollover(scale)).count()
    }
}

/// Decode a whole channel, continuing past malformed lines. Blank lines are skipped.
pub fn decode_stream<I, S>(lines: I) -> DecodedStream
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stream = DecodedStream::default();

    for (index, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match decode_record(index + 1, line) {
            Ok(DecodedRecord::Data(sample)) => stream.samples.push(sample),
            Ok(DecodedRecord::Reference(reference)) => stream.references.push(reference),
            Err(e) => {
                tracing::debug!(line = e.line, content = %e.content, reason = %e.reason, "Malformed record");
                stream.errors.push(e);
            }
        }
    }

    if !stream.errors.is_empty() {
        tracing::warn!(
            malformed = stream.errors.len(),
            samples = stream.samples.len(),
            "Channel input contains records that could not be decoded"
        );
    }

    stream
}
