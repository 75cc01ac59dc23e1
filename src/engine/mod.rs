//! Attendance status engine.
//!
//! Every place that shows an attendance status (daily report, admin day view,
//! monthly views, spreadsheet export) goes through [`evaluate_day`], so the
//! hours arithmetic and the label rules live only here.

pub mod hours;
pub mod leave;
pub mod monthly;
pub mod status;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, BreakInterval, Location, WorkMode};
use crate::model::leave_request::LeaveRequest;
use crate::utils::time::hhmm;
use status::{AttendanceStatus, classify_day};

/// One employee-day as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DayView {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "Present", value_type = String)]
    pub status: AttendanceStatus,
    /// Rounded to two decimals.
    #[schema(example = 8.5)]
    pub working_hours: Option<f64>,
    #[serde(serialize_with = "hhmm::option::serialize")]
    #[schema(example = "09:00", value_type = Option<String>)]
    pub in_time: Option<NaiveTime>,
    #[serde(serialize_with = "hhmm::option::serialize")]
    #[schema(example = "18:00", value_type = Option<String>)]
    pub out_time: Option<NaiveTime>,
    pub work_mode: Option<WorkMode>,
    pub breaks: Vec<BreakInterval>,
    pub in_location: Option<Location>,
    pub out_location: Option<Location>,
    /// Type of the approved leave covering the day, if any.
    #[schema(example = "Work from Home")]
    pub leave_type: Option<String>,
}

/// Evaluates one day for one employee.
///
/// `record` must belong to `date`; `leaves` may hold any of the employee's
/// leaves, only an approved one covering `date` is used. `today` is the
/// current date in the organization timezone.
pub fn evaluate_day(
    date: NaiveDate,
    record: Option<&AttendanceRecord>,
    leaves: &[LeaveRequest],
    today: NaiveDate,
) -> DayView {
    let leave = leave::approved_leave_on(leaves, date);
    let classification = classify_day(record, leave, date < today);

    DayView {
        date,
        status: classification.status,
        working_hours: classification.working_hours.map(hours::round2),
        in_time: record.and_then(|r| r.in_time),
        out_time: record.and_then(|r| r.out_time),
        work_mode: record.map(|r| r.work_mode),
        breaks: record.map(|r| r.breaks.clone()).unwrap_or_default(),
        in_location: record.and_then(|r| r.in_location.clone()),
        out_location: record.and_then(|r| r.out_location.clone()),
        leave_type: leave.map(|l| l.leave_type.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, day).unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    #[test]
    fn past_and_future_days_without_data() {
        assert_eq!(evaluate_day(d(9), None, &[], d(10)).status, AttendanceStatus::Absent);
        assert_eq!(evaluate_day(d(10), None, &[], d(10)).status, AttendanceStatus::NotYet);
        assert_eq!(evaluate_day(d(11), None, &[], d(10)).status, AttendanceStatus::NotYet);
    }

    #[test]
    fn view_carries_record_details_and_rounded_hours() {
        let record = AttendanceRecord {
            id: 1,
            employee_id: 1000,
            date: d(3),
            in_time: Some(t("09:00")),
            out_time: Some(t("13:20")),
            work_mode: WorkMode::Home,
            breaks: vec![],
            in_location: None,
            out_location: None,
        };
        let view = evaluate_day(d(3), Some(&record), &[], d(10));
        assert_eq!(view.status, AttendanceStatus::HalfDay);
        assert_eq!(view.working_hours, Some(4.33));
        assert_eq!(view.work_mode, Some(WorkMode::Home));
        assert!(view.leave_type.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "Half-Day");
        assert_eq!(json["in_time"], "09:00");
        assert_eq!(json["out_time"], "13:20");
        assert_eq!(json["work_mode"], "home");
        assert_eq!(json["date"], "2026-06-03");
    }

    #[test]
    fn leave_type_is_reported() {
        let leaves = vec![LeaveRequest {
            id: 4,
            employee_id: 1000,
            leave_type: "Casual".into(),
            start_date: d(1),
            end_date: d(2),
            status: "Approved".into(),
            reason: None,
            created_at: None,
        }];
        let view = evaluate_day(d(2), None, &leaves, d(1));
        assert_eq!(view.status, AttendanceStatus::Leave);
        assert_eq!(view.leave_type.as_deref(), Some("Casual"));
    }
}
