//! Daily status classification.
//!
//! Rules are applied in order and the first match wins:
//! approved leave, complete punch, in-punch only, nothing at all.

use serde::{Serialize, Serializer};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use super::hours::working_hours;
use crate::model::attendance::AttendanceRecord;
use crate::model::leave_request::LeaveRequest;

pub const FULL_DAY_HOURS: f64 = 8.0;
pub const HALF_DAY_HOURS: f64 = 4.0;

/// Status labels shown to every consumer. The UI matches on these exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum AttendanceStatus {
    #[strum(serialize = "Present")]
    Present,
    #[strum(serialize = "Present + Overtime")]
    PresentOvertime,
    #[strum(serialize = "Half-Day")]
    HalfDay,
    #[strum(serialize = "Absent")]
    Absent,
    #[strum(serialize = "Incomplete")]
    Incomplete,
    #[strum(serialize = "Not Yet")]
    NotYet,
    #[strum(serialize = "Leave")]
    Leave,
    #[strum(serialize = "Work from Home - Present")]
    WfhPresent,
    #[strum(serialize = "Work from Home + Overtime")]
    WfhOvertime,
    #[strum(serialize = "Work from Home - Half Day")]
    WfhHalfDay,
    #[strum(serialize = "Work from Home - Incomplete")]
    WfhIncomplete,
    #[strum(serialize = "Work from Home - Not Marked")]
    WfhNotMarked,
}

impl AttendanceStatus {
    pub fn label(self) -> &'static str {
        self.into()
    }

    pub fn is_work_from_home(self) -> bool {
        matches!(
            self,
            AttendanceStatus::WfhPresent
                | AttendanceStatus::WfhOvertime
                | AttendanceStatus::WfhHalfDay
                | AttendanceStatus::WfhIncomplete
                | AttendanceStatus::WfhNotMarked
        )
    }
}

impl Serialize for AttendanceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Maps a day's worked hours onto a label.
pub fn classify_hours(hours: f64, work_from_home: bool) -> AttendanceStatus {
    use AttendanceStatus::*;

    if hours > FULL_DAY_HOURS {
        if work_from_home { WfhOvertime } else { PresentOvertime }
    } else if hours == FULL_DAY_HOURS {
        if work_from_home { WfhPresent } else { Present }
    } else if hours >= HALF_DAY_HOURS {
        if work_from_home { WfhHalfDay } else { HalfDay }
    } else if hours > 0.0 {
        if work_from_home { WfhIncomplete } else { Absent }
    } else if work_from_home {
        WfhNotMarked
    } else {
        Absent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayClassification {
    pub status: AttendanceStatus,
    /// Unrounded; present only when both punches exist.
    pub working_hours: Option<f64>,
}

/// Classifies one day.
///
/// `leave` is the approved leave covering the date, if any; anything not
/// approved is ignored. `is_past` is whether the date is strictly before
/// today in the organization timezone.
pub fn classify_day(
    record: Option<&AttendanceRecord>,
    leave: Option<&LeaveRequest>,
    is_past: bool,
) -> DayClassification {
    let punches = record.and_then(|r| r.in_time.map(|in_time| (r, in_time, r.out_time)));
    let leave = leave.filter(|l| l.is_approved());

    let hours_for = |work_from_home: bool| match punches {
        Some((r, in_time, Some(out_time))) => {
            let hours = working_hours(in_time, out_time, &r.breaks);
            DayClassification {
                status: classify_hours(hours, work_from_home),
                working_hours: Some(hours),
            }
        }
        Some((_, _, None)) => DayClassification {
            status: if work_from_home {
                AttendanceStatus::WfhIncomplete
            } else {
                AttendanceStatus::Incomplete
            },
            working_hours: None,
        },
        None => DayClassification {
            status: if work_from_home {
                AttendanceStatus::WfhNotMarked
            } else if is_past {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::NotYet
            },
            working_hours: None,
        },
    };

    match leave {
        Some(l) if l.is_work_from_home() => hours_for(true),
        Some(_) => DayClassification {
            status: AttendanceStatus::Leave,
            working_hours: None,
        },
        None => hours_for(false),
    }
}
