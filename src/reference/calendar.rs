//! Fixed calendar arithmetic for reference-time resolution.
//!
//! The array only ever ran in US Eastern time, so instead of a timezone
//! database a fixed month/day table picks EST or EDT. Months use a
//! 31/30/28-day table; leap years are not modelled.

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Days in `month` (1-12) under the no-leap-year table.
pub const fn days_in_month(month: i64) -> i64 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => 28,
    }
}

/// Normalise a non-positive day by borrowing whole months backwards.
///
/// Month 0 wraps to December. Positive days are returned unchanged.
pub const fn roll_back(mut month: i64, mut day: i64) -> (i64, i64) {
    while day <= 0 {
        month -= 1;
        if month < 1 {
            month += 12;
        }
        day += days_in_month(month);
    }
    (month, day)
}

/// Hours to subtract from UTC to get Eastern civil time on `month`/`day`.
///
/// EDT (UTC-4) from March 10 through November 3, EST (UTC-5) otherwise.
pub const fn eastern_offset_hours(month: i64, day: i64) -> i64 {
    match month {
        3 if day <= 9 => 5,
        3 => 4,
        11 if day <= 3 => 4,
        11 => 5,
        4..=10 => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_table() {
        assert_eq!(days_in_month(1), 31);
        assert_eq!(days_in_month(2), 28);
        assert_eq!(days_in_month(9), 30);
        assert_eq!(days_in_month(12), 31);
    }

    #[test]
    fn test_roll_back_across_year_start() {
        assert_eq!(roll_back(1, 0), (12, 31));
        assert_eq!(roll_back(3, 0), (2, 28));
        assert_eq!(roll_back(3, -28), (1, 31));
        assert_eq!(roll_back(6, 15), (6, 15));
    }

    #[test]
    fn test_eastern_offset_boundaries() {
        assert_eq!(eastern_offset_hours(3, 5), 5);
        assert_eq!(eastern_offset_hours(3, 9), 5);
        assert_eq!(eastern_offset_hours(3, 10), 4);
        assert_eq!(eastern_offset_hours(3, 15), 4);
        assert_eq!(eastern_offset_hours(7, 1), 4);
        assert_eq!(eastern_offset_hours(11, 3), 4);
        assert_eq!(eastern_offset_hours(11, 4), 5);
        assert_eq!(eastern_offset_hours(12, 25), 5);
        assert_eq!(eastern_offset_hours(1, 1), 5);
    }
}
