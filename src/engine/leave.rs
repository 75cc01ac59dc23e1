use chrono::NaiveDate;

use crate::model::leave_request::LeaveRequest;

/// First approved leave whose inclusive range covers `date`.
///
/// Callers pass leaves ordered by start date, so with overlapping approvals
/// the earliest-starting one decides the day.
pub fn approved_leave_on(leaves: &[LeaveRequest], date: NaiveDate) -> Option<&LeaveRequest> {
    leaves.iter().find(|l| l.is_approved() && l.covers(date))
}
