use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

/// Current wall-clock time in the organization timezone.
pub fn now_in(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Today's calendar date in the organization timezone.
pub fn today_in(tz: &Tz) -> NaiveDate {
    now_in(tz).date_naive()
}

/// Current time of day truncated to whole minutes, the resolution attendance is kept at.
pub fn minute_now_in(tz: &Tz) -> NaiveTime {
    truncate_to_minute(now_in(tz).time())
}

pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parses `YYYY-MM` into `(year, month)`.
pub fn parse_month(raw: &str) -> Option<(i32, u32)> {
    let (year, month) = raw.trim().split_once('-')?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Serializes times as `HH:MM`, the format clients already match on.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format("%H:%M"))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => serializer.collect_str(&t.format("%H:%M")),
                None => serializer.serialize_none(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ist_day_boundary_differs_from_utc() {
        // 20:00 UTC is already 01:30 the next day in IST.
        let utc = Utc.with_ymd_and_hms(2026, 3, 9, 20, 0, 0).unwrap();
        let ist = utc.with_timezone(&chrono_tz::Asia::Kolkata);
        assert_eq!(ist.date_naive(), NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(format_hhmm(ist.time()), "01:30");
    }

    #[test]
    fn minute_truncation_drops_seconds() {
        let t = NaiveTime::from_hms_milli_opt(9, 15, 42, 300).unwrap();
        assert_eq!(truncate_to_minute(t), NaiveTime::from_hms_opt(9, 15, 0).unwrap());
    }

    #[test]
    fn month_parsing() {
        assert_eq!(parse_month("2026-02"), Some((2026, 2)));
        assert_eq!(parse_month(" 2026-2 "), Some((2026, 2)));
        assert_eq!(parse_month("2026-13"), None);
        assert_eq!(parse_month("2026-00"), None);
        assert_eq!(parse_month("26-01"), None);
        assert_eq!(parse_month("2026"), None);
        assert_eq!(parse_month("2026-01-05"), None);
    }

    #[test]
    fn date_parsing() {
        assert_eq!(parse_date("2026-02-28"), NaiveDate::from_ymd_opt(2026, 2, 28));
        assert_eq!(parse_date("2026-02-30"), None);
        assert_eq!(parse_date("28/02/2026"), None);
    }

    #[test]
    fn today_is_consistent_with_now() {
        let tz = chrono_tz::Asia::Kolkata;
        let today = today_in(&tz);
        let now = now_in(&tz);
        assert!((now.date_naive() - today).num_days().abs() <= 1);
    }
}
