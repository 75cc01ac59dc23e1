//! Working hours from punch times and breaks.

use chrono::{NaiveTime, Timelike};

use crate::model::attendance::BreakInterval;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes from `start` to `end`, wrapping past midnight when `end` is earlier.
fn span_minutes(start: NaiveTime, end: NaiveTime) -> i64 {
    let minutes = (end.hour() as i64 - start.hour() as i64) * 60
        + (end.minute() as i64 - start.minute() as i64);
    if minutes < 0 {
        minutes + MINUTES_PER_DAY
    } else {
        minutes
    }
}

/// Decimal hours between two clock times. Only hour and minute take part.
pub fn span_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    span_minutes(start, end) as f64 / 60.0
}

/// Hours worked between `in_time` and `out_time`, minus every closed break.
///
/// A break without an end deducts nothing until it is closed. The result is
/// neither clamped nor rounded.
pub fn working_hours(in_time: NaiveTime, out_time: NaiveTime, breaks: &[BreakInterval]) -> f64 {
    let break_minutes: i64 = breaks
        .iter()
        .filter_map(|b| b.end.map(|end| span_minutes(b.start, end)))
        .sum();

    (span_minutes(in_time, out_time) - break_minutes) as f64 / 60.0
}

/// Two-decimal rounding used wherever hours are displayed or stored.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn closed(start: &str, end: &str) -> BreakInterval {
        BreakInterval {
            id: 0,
            start: t(start),
            end: Some(t(end)),
        }
    }

    fn ongoing(start: &str) -> BreakInterval {
        BreakInterval {
            id: 0,
            start: t(start),
            end: None,
        }
    }

    #[test]
    fn plain_day() {
        assert_eq!(working_hours(t("09:00"), t("17:00"), &[]), 8.0);
        assert_eq!(working_hours(t("09:15"), t("13:45"), &[]), 4.5);
    }

    #[test]
    fn overnight_shift_wraps_by_a_day() {
        assert_eq!(working_hours(t("22:00"), t("02:00"), &[]), 4.0);
        assert_eq!(span_hours(t("23:30"), t("00:15")), 0.75);
    }

    #[test]
    fn ongoing_break_deducts_nothing() {
        let breaks = [closed("13:00", "13:30"), ongoing("17:00")];
        assert_eq!(working_hours(t("09:00"), t("18:00"), &breaks), 8.5);
    }

    #[test]
    fn thirds_of_an_hour_do_not_drift() {
        // 8h20m shift minus a 20 minute break is exactly eight hours.
        let breaks = [closed("13:00", "13:20")];
        assert_eq!(working_hours(t("09:00"), t("17:20"), &breaks), 8.0);
    }

    #[test]
    fn overnight_break_wraps_too() {
        let breaks = [closed("23:50", "00:10")];
        assert_eq!(working_hours(t("22:00"), t("06:00"), &breaks), 460.0 / 60.0);
    }

    #[test]
    fn breaks_longer_than_the_shift_go_negative() {
        let breaks = [closed("10:00", "12:00")];
        assert_eq!(working_hours(t("09:00"), t("10:00"), &breaks), -1.0);
    }

    #[test]
    fn seconds_are_ignored() {
        let start = NaiveTime::from_hms_opt(9, 0, 59).unwrap();
        let end = NaiveTime::from_hms_opt(17, 0, 1).unwrap();
        assert_eq!(working_hours(start, end, &[]), 8.0);
    }

    #[test]
    fn rounding() {
        assert_eq!(round2(8.0 - 20.0 / 60.0), 7.67);
        assert_eq!(round2(4.333333), 4.33);
        assert_eq!(round2(-1.0), -1.0);
    }
}
