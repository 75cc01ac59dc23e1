//! Calendar-month rollup of daily statuses.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use super::{DayView, evaluate_day};
use super::status::AttendanceStatus;
use crate::model::attendance::AttendanceRecord;
use crate::model::leave_request::LeaveRequest;

/// First and last day of the month, or `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    month_bounds(year, month).map(|(_, last)| last.day())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct MonthlySummary {
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 3)]
    pub month: u32,
    #[schema(example = 31)]
    pub total_days: u32,
    /// Days labelled exactly "Present".
    pub present_days: u32,
    pub overtime_days: u32,
    pub half_days: u32,
    /// True absence only: no record on a past day, or under four hours.
    pub absent_days: u32,
    /// Approved non-WFH leave.
    pub leave_days: u32,
    /// `absent_days + leave_days`, the combined figure some screens show.
    pub absent_including_leave_days: u32,
    pub incomplete_days: u32,
    pub not_yet_days: u32,
    pub wfh_present_days: u32,
    pub wfh_overtime_days: u32,
    pub wfh_half_days: u32,
    pub wfh_incomplete_days: u32,
    pub wfh_not_marked_days: u32,
    pub work_from_home_days: u32,
    /// `present_days + overtime_days + half_days`.
    pub total_present_days: u32,
    #[schema(example = 83)]
    pub attendance_percentage: u32,
}

impl MonthlySummary {
    /// Tallies the statuses of one month. `total_days` is the month length,
    /// which is also the percentage denominator.
    pub fn tally<I>(year: i32, month: u32, total_days: u32, statuses: I) -> Self
    where
        I: IntoIterator<Item = AttendanceStatus>,
    {
        use AttendanceStatus::*;

        let mut summary = MonthlySummary {
            year,
            month,
            total_days,
            ..Default::default()
        };

        for status in statuses {
            match status {
                Present => summary.present_days += 1,
                PresentOvertime => summary.overtime_days += 1,
                HalfDay => summary.half_days += 1,
                Absent => summary.absent_days += 1,
                Leave => summary.leave_days += 1,
                Incomplete => summary.incomplete_days += 1,
                NotYet => summary.not_yet_days += 1,
                WfhPresent => summary.wfh_present_days += 1,
                WfhOvertime => summary.wfh_overtime_days += 1,
                WfhHalfDay => summary.wfh_half_days += 1,
                WfhIncomplete => summary.wfh_incomplete_days += 1,
                WfhNotMarked => summary.wfh_not_marked_days += 1,
            }
            if status.is_work_from_home() {
                summary.work_from_home_days += 1;
            }
        }

        summary.absent_including_leave_days = summary.absent_days + summary.leave_days;
        summary.total_present_days =
            summary.present_days + summary.overtime_days + summary.half_days;
        summary.attendance_percentage = if total_days == 0 {
            0
        } else {
            (summary.total_present_days as f64 / total_days as f64 * 100.0).round() as u32
        };

        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyReport {
    #[schema(example = 1000)]
    pub employee_id: u64,
    pub summary: MonthlySummary,
    pub days: Vec<DayView>,
}

/// Builds the month for one employee from already loaded data.
///
/// `records` and `leaves` may contain other employees' rows and dates outside
/// the month; they are filtered here. Missing data yields `Absent`/`Not Yet`
/// days, never an error. Returns `None` only for an invalid month.
pub fn aggregate_month(
    employee_id: u64,
    year: i32,
    month: u32,
    records: &[AttendanceRecord],
    leaves: &[LeaveRequest],
    today: NaiveDate,
) -> Option<MonthlyReport> {
    let (first, last) = month_bounds(year, month)?;

    let own_leaves: Vec<LeaveRequest> = leaves
        .iter()
        .filter(|l| l.employee_id == employee_id)
        .cloned()
        .collect();

    let days: Vec<DayView> = first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| {
            let record = records
                .iter()
                .find(|r| r.employee_id == employee_id && r.date == date);
            evaluate_day(date, record, &own_leaves, today)
        })
        .collect();

    let summary = MonthlySummary::tally(year, month, last.day(), days.iter().map(|d| d.status));

    Some(MonthlyReport {
        employee_id,
        summary,
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::WorkMode;
    use AttendanceStatus::*;
    use chrono::NaiveTime;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn record(employee_id: u64, date: NaiveDate, in_time: &str, out_time: Option<&str>) -> AttendanceRecord {
        AttendanceRecord {
            id: date.ordinal() as u64,
            employee_id,
            date,
            in_time: Some(t(in_time)),
            out_time: out_time.map(t),
            work_mode: WorkMode::Office,
            breaks: vec![],
            in_location: None,
            out_location: None,
        }
    }

    fn leave(leave_type: &str, start: NaiveDate, end: NaiveDate) -> LeaveRequest {
        LeaveRequest {
            id: 1,
            employee_id: 1000,
            leave_type: leave_type.into(),
            start_date: start,
            end_date: end,
            status: "Approved".into(),
            reason: None,
            created_at: None,
        }
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2026, 2), Some(28));
        assert_eq!(days_in_month(2028, 2), Some(29));
        assert_eq!(days_in_month(2026, 4), Some(30));
        assert_eq!(days_in_month(2026, 12), Some(31));
        assert_eq!(days_in_month(2026, 13), None);
        assert_eq!(days_in_month(2026, 0), None);
        assert_eq!(month_bounds(2026, 12), Some((d(2026, 12, 1), d(2026, 12, 31))));
    }

    #[test]
    fn thirty_day_percentage_counts_half_days() {
        let statuses = std::iter::repeat(Present)
            .take(20)
            .chain(std::iter::repeat(HalfDay).take(5))
            .chain(std::iter::repeat(Absent).take(5));
        let summary = MonthlySummary::tally(2026, 4, 30, statuses);
        assert_eq!(summary.total_present_days, 25);
        assert_eq!(summary.attendance_percentage, 83);
        assert_eq!(summary.absent_days, 5);
    }

    #[test]
    fn overtime_counts_towards_presence_but_wfh_does_not() {
        let statuses = vec![Present, PresentOvertime, WfhPresent, WfhOvertime, Leave, Absent];
        let summary = MonthlySummary::tally(2026, 2, 28, statuses);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.overtime_days, 1);
        assert_eq!(summary.total_present_days, 2);
        assert_eq!(summary.work_from_home_days, 2);
        assert_eq!(summary.leave_days, 1);
        assert_eq!(summary.absent_including_leave_days, 2);
        assert_eq!(summary.attendance_percentage, 7);
    }

    #[test]
    fn empty_month_is_all_absent_or_not_yet() {
        let report = aggregate_month(1000, 2026, 3, &[], &[], d(2026, 3, 16)).unwrap();
        assert_eq!(report.days.len(), 31);
        assert_eq!(report.summary.absent_days, 15);
        assert_eq!(report.summary.not_yet_days, 16);
        assert_eq!(report.summary.attendance_percentage, 0);
        assert_eq!(report.days[14].status, Absent);
        assert_eq!(report.days[15].status, NotYet);
    }

    #[test]
    fn invalid_month_has_no_report() {
        assert!(aggregate_month(1000, 2026, 13, &[], &[], d(2026, 3, 16)).is_none());
    }

    #[test]
    fn mixed_month() {
        let records = vec![
            record(1000, d(2026, 4, 1), "09:00", Some("17:00")),
            record(1000, d(2026, 4, 2), "09:00", Some("19:00")),
            record(1000, d(2026, 4, 3), "09:00", Some("13:00")),
            record(1000, d(2026, 4, 6), "09:00", None),
            record(1000, d(2026, 4, 8), "09:00", Some("18:00")),
            // another employee, ignored
            record(2000, d(2026, 4, 7), "09:00", Some("17:00")),
        ];
        let leaves = vec![
            leave("Sick", d(2026, 3, 30), d(2026, 4, 4)),
            leave("Work from Home", d(2026, 4, 8), d(2026, 4, 9)),
        ];
        let report = aggregate_month(1000, 2026, 4, &records, &leaves, d(2026, 4, 10)).unwrap();
        let s = &report.summary;

        // Days 1-4 sit under the sick leave, whatever was punched.
        assert_eq!(s.leave_days, 4);
        assert_eq!(report.days[5].status, Incomplete);
        assert_eq!(report.days[7].status, WfhOvertime);
        assert_eq!(report.days[7].working_hours, Some(9.0));
        assert_eq!(report.days[8].status, WfhNotMarked);
        // The 5th, and the 7th where only another employee punched.
        assert_eq!(s.absent_days, 2);
        assert_eq!(s.not_yet_days, 30 - 9);
        assert_eq!(s.absent_including_leave_days, 6);
        assert_eq!(s.total_present_days, 0);
        assert_eq!(s.work_from_home_days, 2);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = vec![
            record(1000, d(2026, 5, 4), "09:00", Some("17:00")),
            record(1000, d(2026, 5, 5), "10:00", Some("12:00")),
        ];
        let leaves = vec![leave("Casual", d(2026, 5, 6), d(2026, 5, 6))];
        let today = d(2026, 5, 20);
        let first = aggregate_month(1000, 2026, 5, &records, &leaves, today);
        let second = aggregate_month(1000, 2026, 5, &records, &leaves, today);
        assert_eq!(first, second);
        let summary = first.unwrap().summary;
        assert_eq!(summary.present_days, 1);
        // 16 empty past days plus the two-hour day on the 5th.
        assert_eq!(summary.absent_days, 17);
    }
}
