//! GPS Reference Time Reconciliation
//!
//! Each channel's counting board resets its clock to zero at power-on and
//! occasionally interleaves a GPS sentence stamped with the board clock. The
//! difference between the GPS time of day and the board clock gives the wall
//! time at which the board clock read zero.
//!
//! Sentences are frequently corrupted, so every parseable sentence is resolved
//! independently and the results are ranked by how many sentences agree. The
//! operator (or caller) picks from the ranking; this module never chooses.

pub mod calendar;

use crate::acquisition::hex_decoder::{reference_fields, trailing_clock_stamp, ReferenceRecord};
use crate::types::{RankedStartTime, ReferenceCandidate, ResolvedStartTime};
use calendar::{eastern_offset_hours, roll_back, SECONDS_PER_DAY};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Most distinct start times offered for selection.
pub const MAX_RANKED_CANDIDATES: usize = 12;

/// Why a reference sentence was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("unreadable time of day {0:?}")]
    BadTime(String),

    #[error("unreadable date {0:?}")]
    BadDate(String),

    #[error("GPS fix not active (status {0:?})")]
    VoidFix(String),

    #[error("unreadable trailing clock stamp")]
    BadClockStamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("no usable GPS reference time found")]
    NoReferenceFound,
}

/// Ranked start-time candidates for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceRanking {
    /// Distinct start times, most frequent first (at most 12)
    pub candidates: Vec<RankedStartTime>,
    /// Distinct start times that did not fit in the ranking
    pub overflow: usize,
    /// Reference sentences that could not be parsed
    pub discarded: usize,
}

impl ReferenceRanking {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Most frequent candidate.
    pub fn best(&self) -> Result<&RankedStartTime, ReconcileError> {
        self.candidates.first().ok_or(ReconcileError::NoReferenceFound)
    }

    /// Resolve a caller's selection (indices into `candidates`); unknown indices are ignored.
    pub fn select(&self, indices: &[usize]) -> Vec<ResolvedStartTime> {
        indices
            .iter()
            .filter_map(|&i| self.candidates.get(i).map(|c| c.start))
            .collect()
    }
}

/// Parse a two-digit decimal field starting at `at`.
fn two_digits(text: &str, at: usize) -> Option<u8> {
    let digits = text.get(at..at + 2)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Extract the candidate fields from a reference sentence.
pub fn parse_candidate(record: &ReferenceRecord) -> Result<ReferenceCandidate, ReferenceError> {
    let fields: Vec<&str> = record.raw.split(',').collect();
    let field = |index: usize, name: &'static str| {
        fields
            .get(index)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .ok_or(ReferenceError::MissingField(name))
    };

    let status = field(reference_fields::STATUS, "status")?;
    if status != "A" {
        return Err(ReferenceError::VoidFix(status.to_string()));
    }

    let time_field = field(reference_fields::TIME, "time")?;
    let hhmmss = time_field.split('.').next().unwrap_or_default();
    let bad_time = || ReferenceError::BadTime(time_field.to_string());
    if hhmmss.len() != 6 {
        return Err(bad_time());
    }
    let hour = two_digits(hhmmss, 0).filter(|&h| h < 24).ok_or_else(bad_time)?;
    let minute = two_digits(hhmmss, 2).filter(|&m| m < 60).ok_or_else(bad_time)?;
    let second = two_digits(hhmmss, 4).filter(|&s| s < 60).ok_or_else(bad_time)?;

    let date_field = field(reference_fields::DATE, "date")?;
    let bad_date = || ReferenceError::BadDate(date_field.to_string());
    if date_field.len() != 6 || !date_field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_date());
    }
    let day = two_digits(date_field, 0).filter(|d| (1..=31).contains(d)).ok_or_else(bad_date)?;
    let month = two_digits(date_field, 2).filter(|m| (1..=12).contains(m)).ok_or_else(bad_date)?;

    let stamp = trailing_clock_stamp(&record.raw).ok_or(ReferenceError::BadClockStamp)?;

    Ok(ReferenceCandidate {
        hour,
        minute,
        second,
        month,
        day,
        device_seconds: stamp.coarse,
    })
}

/// Wall time (Eastern civil time) at which the device clock read zero.
///
/// The zone shift borrows a day only when the hour goes negative; hour 0 is
/// midnight of the same day.
pub fn resolve_candidate(candidate: &ReferenceCandidate) -> ResolvedStartTime {
    let mut month = i64::from(candidate.month);
    let mut day = i64::from(candidate.day);

    let start = candidate.time_of_day_secs() - i64::from(candidate.device_seconds);
    if start < 0 {
        // ceil(|start| / 86400) whole days before the GPS date
        day -= (-start + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    }
    (month, day) = roll_back(month, day);

    let time_of_day = start.rem_euclid(SECONDS_PER_DAY);
    let mut hour = time_of_day / 3600;
    let minute = (time_of_day % 3600) / 60;
    let second = time_of_day % 60;

    hour -= eastern_offset_hours(month, day);
    if hour < 0 {
        hour += 24;
        (month, day) = roll_back(month, day - 1);
    }

    ResolvedStartTime {
        hour: hour as u8,
        minute: minute as u8,
        second: second as u8,
        month: month as u8,
        day: day as u8,
    }
}

/// Parse, resolve, deduplicate and rank a channel's reference sentences.
pub fn resolve(records: &[ReferenceRecord]) -> ReferenceRanking {
    let mut discarded = 0usize;
    let mut ranked: Vec<RankedStartTime> = Vec::new();
    let mut index_of: HashMap<ResolvedStartTime, usize> = HashMap::new();

    for record in records {
        let candidate = match parse_candidate(record) {
            Ok(c) => c,
            Err(e) => {
                debug!(line = record.line, error = %e, "Discarding reference sentence");
                discarded += 1;
                continue;
            }
        };

        let start = resolve_candidate(&candidate);
        match index_of.get(&start) {
            Some(&i) => ranked[i].count += 1,
            None => {
                index_of.insert(start, ranked.len());
                ranked.push(RankedStartTime { start, count: 1 });
            }
        }
    }

    // Stable: equally frequent candidates keep first-seen order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));

    let overflow = ranked.len().saturating_sub(MAX_RANKED_CANDIDATES);
    if overflow > 0 {
        warn!(
            distinct = ranked.len(),
            shown = MAX_RANKED_CANDIDATES,
            "Too many different GPS start times to display at once"
        );
    }
    ranked.truncate(MAX_RANKED_CANDIDATES);

    if ranked.is_empty() {
        info!(sentences = records.len(), discarded, "No usable GPS reference time found");
    } else {
        info!(
            sentences = records.len(),
            discarded,
            distinct = ranked.len() + overflow,
            best = %ranked[0],
            "Resolved GPS start-time candidates"
        );
    }

    ReferenceRanking {
        candidates: ranked,
        overflow,
        discarded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(time: &str, status: &str, date: &str, device_seconds: u32) -> ReferenceRecord {
        ReferenceRecord {
            line: 1,
            raw: format!(
                "$GPRMC,{time},{status},4216.3712,N,07148.5039,W,0.00,0.00,{date},,,A*7B{device_seconds:06X}00"
            ),
        }
    }

    fn candidate(h: u8, m: u8, s: u8, month: u8, day: u8, device_seconds: u32) -> ReferenceCandidate {
        ReferenceCandidate {
            hour: h,
            minute: m,
            second: s,
            month,
            day,
            device_seconds,
        }
    }

    #[test]
    fn test_parse_candidate_fields() {
        let c = parse_candidate(&sentence("180000.000", "A", "150619", 1000)).unwrap();
        assert_eq!(c, candidate(18, 0, 0, 6, 15, 1000));
    }

    #[test]
    fn test_void_fix_discarded() {
        let err = parse_candidate(&sentence("180000.000", "V", "150619", 1000)).unwrap_err();
        assert_eq!(err, ReferenceError::VoidFix("V".to_string()));
    }

    #[test]
    fn test_damaged_time_discarded() {
        let err = parse_candidate(&sentence("18000.000", "A", "150619", 1000)).unwrap_err();
        assert!(matches!(err, ReferenceError::BadTime(_)));
        let err = parse_candidate(&sentence("186000.000", "A", "150619", 1000)).unwrap_err();
        assert!(matches!(err, ReferenceError::BadTime(_)));
    }

    #[test]
    fn test_bad_month_discarded() {
        let err = parse_candidate(&sentence("180000.000", "A", "151319", 1000)).unwrap_err();
        assert!(matches!(err, ReferenceError::BadDate(_)));
    }

    #[test]
    fn test_same_day_summer_resolution() {
        // 18:00:00 UTC minus 1000 s = 17:43:20 UTC = 13:43:20 EDT
        let r = resolve_candidate(&candidate(18, 0, 0, 6, 15, 1000));
        assert_eq!(
            r,
            ResolvedStartTime { hour: 13, minute: 43, second: 20, month: 6, day: 15 }
        );
    }

    #[test]
    fn test_march_offset_depends_on_day() {
        let edt = resolve_candidate(&candidate(12, 0, 0, 3, 15, 0));
        assert_eq!(edt.hour, 8);
        let est = resolve_candidate(&candidate(12, 0, 0, 3, 5, 0));
        assert_eq!(est.hour, 7);
    }

    #[test]
    fn test_november_offset_depends_on_day() {
        assert_eq!(resolve_candidate(&candidate(12, 0, 0, 11, 3, 0)).hour, 8);
        assert_eq!(resolve_candidate(&candidate(12, 0, 0, 11, 4, 0)).hour, 7);
    }

    #[test]
    fn test_device_clock_past_midnight_borrows_day() {
        // 01:00:00 UTC on Jan 1 with 2 h on the clock = 23:00:00 UTC Dec 31 = 18:00 EST
        let r = resolve_candidate(&candidate(1, 0, 0, 1, 1, 7200));
        assert_eq!(
            r,
            ResolvedStartTime { hour: 18, minute: 0, second: 0, month: 12, day: 31 }
        );
    }

    #[test]
    fn test_multi_day_clock_borrows_several_days() {
        // 3 days + 1 h before 12:00 UTC on Mar 2 → 11:00 UTC Feb 27 → 06:00 EST
        let r = resolve_candidate(&candidate(12, 0, 0, 3, 2, 3 * 86_400 + 3600));
        assert_eq!(
            r,
            ResolvedStartTime { hour: 6, minute: 0, second: 0, month: 2, day: 27 }
        );
    }

    #[test]
    fn test_exact_day_multiple_borrows_one_day() {
        // start = 0 - 86400 exactly: midnight UTC the previous day → 19:00 EST two days back
        let r = resolve_candidate(&candidate(0, 0, 0, 1, 10, 86_400));
        assert_eq!(
            r,
            ResolvedStartTime { hour: 19, minute: 0, second: 0, month: 1, day: 8 }
        );
    }

    #[test]
    fn test_offset_crossing_midnight_borrows_day() {
        // 02:30 UTC on Aug 1 → 22:30 EDT on Jul 31
        let r = resolve_candidate(&candidate(2, 30, 0, 8, 1, 0));
        assert_eq!(
            r,
            ResolvedStartTime { hour: 22, minute: 30, second: 0, month: 7, day: 31 }
        );
    }

    #[test]
    fn test_offset_landing_on_midnight_keeps_day() {
        let r = resolve_candidate(&candidate(5, 0, 0, 1, 20, 0));
        assert_eq!(
            r,
            ResolvedStartTime { hour: 0, minute: 0, second: 0, month: 1, day: 20 }
        );
    }

    #[test]
    fn test_ranking_counts_and_orders() {
        let records = vec![
            sentence("180000.000", "A", "150619", 1000),
            sentence("190000.000", "A", "150619", 1000),
            sentence("180100.000", "A", "150619", 1060),
            sentence("garbage", "A", "150619", 1000),
            sentence("180200.000", "A", "150619", 1120),
        ];
        let ranking = resolve(&records);
        assert_eq!(ranking.discarded, 1);
        assert_eq!(ranking.overflow, 0);
        assert_eq!(ranking.candidates.len(), 2);
        assert_eq!(ranking.candidates[0].count, 3);
        assert_eq!(ranking.candidates[0].start.to_string(), "13:43:20 06/15");
        assert_eq!(ranking.candidates[1].count, 1);
        assert_eq!(ranking.best().unwrap().count, 3);
    }

    #[test]
    fn test_ranking_caps_at_twelve() {
        let records: Vec<ReferenceRecord> = (0..15)
            .map(|i| sentence(&format!("18{i:02}00.000"), "A", "150619", 0))
            .collect();
        let ranking = resolve(&records);
        assert_eq!(ranking.candidates.len(), MAX_RANKED_CANDIDATES);
        assert_eq!(ranking.overflow, 3);
    }

    #[test]
    fn test_empty_ranking_reports_no_reference() {
        let ranking = resolve(&[]);
        assert!(ranking.is_empty());
        assert_eq!(ranking.best(), Err(ReconcileError::NoReferenceFound));
    }

    #[test]
    fn test_select_ignores_unknown_indices() {
        let ranking = resolve(&[sentence("180000.000", "A", "150619", 1000)]);
        assert_eq!(ranking.select(&[0, 5]).len(), 1);
    }
}
