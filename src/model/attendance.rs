use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::utils::time::hhmm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkMode {
    #[default]
    Office,
    Home,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    #[schema(example = 12.9716)]
    pub latitude: f64,
    #[schema(example = 77.5946)]
    pub longitude: f64,
    #[schema(example = "Koramangala, Bengaluru")]
    pub area: Option<String>,
}

impl Location {
    fn from_columns(latitude: Option<f64>, longitude: Option<f64>, area: Option<String>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
                area,
            }),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match &self.area {
            Some(area) => format!("{} ({:.5}, {:.5})", area, self.latitude, self.longitude),
            None => format!("{:.5}, {:.5}", self.latitude, self.longitude),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
    pub work_mode: String,
    pub in_latitude: Option<f64>,
    pub in_longitude: Option<f64>,
    pub in_area: Option<String>,
    pub out_latitude: Option<f64>,
    pub out_longitude: Option<f64>,
    pub out_area: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BreakRow {
    pub id: u64,
    pub attendance_id: u64,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
}

/// A break inside a working day. `end == None` means the break is still going on.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BreakInterval {
    #[serde(skip)]
    pub id: u64,
    #[serde(with = "hhmm")]
    #[schema(example = "13:00", value_type = String)]
    pub start: NaiveTime,
    #[serde(serialize_with = "hhmm::option::serialize")]
    #[schema(example = "13:30", value_type = Option<String>)]
    pub end: Option<NaiveTime>,
}

impl BreakInterval {
    pub fn is_ongoing(&self) -> bool {
        self.end.is_none()
    }

    pub fn describe(&self) -> String {
        match self.end {
            Some(end) => format!("{}-{}", self.start.format("%H:%M"), end.format("%H:%M")),
            None => format!("{}-ongoing", self.start.format("%H:%M")),
        }
    }
}

impl From<BreakRow> for BreakInterval {
    fn from(row: BreakRow) -> Self {
        BreakInterval {
            id: row.id,
            start: row.start_time,
            end: row.end_time,
        }
    }
}

/// One employee's attendance for one calendar day, breaks included.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub in_time: Option<NaiveTime>,
    pub out_time: Option<NaiveTime>,
    pub work_mode: WorkMode,
    pub breaks: Vec<BreakInterval>,
    pub in_location: Option<Location>,
    pub out_location: Option<Location>,
}

impl AttendanceRecord {
    /// Builds a record from its row and the break rows belonging to it, ordered by start.
    pub fn from_parts(row: AttendanceRow, breaks: Vec<BreakRow>) -> Self {
        let mut breaks: Vec<BreakInterval> = breaks
            .into_iter()
            .filter(|b| b.attendance_id == row.id)
            .map(BreakInterval::from)
            .collect();
        breaks.sort_by_key(|b| (b.start, b.id));

        AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            in_time: row.in_time,
            out_time: row.out_time,
            work_mode: row.work_mode.parse().unwrap_or_default(),
            breaks,
            in_location: Location::from_columns(row.in_latitude, row.in_longitude, row.in_area),
            out_location: Location::from_columns(row.out_latitude, row.out_longitude, row.out_area),
        }
    }

    pub fn ongoing_break(&self) -> Option<&BreakInterval> {
        self.breaks.iter().find(|b| b.is_ongoing())
    }

    pub fn ensure_can_check_out(&self) -> Result<(), AppError> {
        if self.out_time.is_some() {
            return Err(AppError::bad_request("Out Time already set"));
        }
        if self.ongoing_break().is_some() {
            return Err(AppError::bad_request(
                "End the ongoing break before checking out",
            ));
        }
        Ok(())
    }

    pub fn ensure_can_start_break(&self) -> Result<(), AppError> {
        if self.out_time.is_some() {
            return Err(AppError::bad_request("Cannot start a break after check-out"));
        }
        if self.ongoing_break().is_some() {
            return Err(AppError::bad_request(
                "Only one active break is allowed. End the current break first.",
            ));
        }
        Ok(())
    }

    /// Returns the ongoing break that may be closed.
    pub fn ensure_can_end_break(&self) -> Result<&BreakInterval, AppError> {
        self.ongoing_break()
            .ok_or_else(|| AppError::bad_request("No active break to end"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn row() -> AttendanceRow {
        AttendanceRow {
            id: 7,
            employee_id: 1000,
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            in_time: Some(t(9, 0)),
            out_time: None,
            work_mode: "home".into(),
            in_latitude: Some(12.97),
            in_longitude: Some(77.59),
            in_area: Some("Bengaluru".into()),
            out_latitude: None,
            out_longitude: Some(77.0),
            out_area: None,
        }
    }

    fn break_row(id: u64, attendance_id: u64, start: NaiveTime, end: Option<NaiveTime>) -> BreakRow {
        BreakRow {
            id,
            attendance_id,
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn from_parts_keeps_own_breaks_in_start_order() {
        let record = AttendanceRecord::from_parts(
            row(),
            vec![
                break_row(3, 7, t(16, 0), None),
                break_row(1, 7, t(13, 0), Some(t(13, 30))),
                break_row(2, 8, t(11, 0), Some(t(11, 10))),
            ],
        );

        assert_eq!(record.work_mode, WorkMode::Home);
        assert_eq!(record.breaks.len(), 2);
        assert_eq!(record.breaks[0].start, t(13, 0));
        assert_eq!(record.ongoing_break().map(|b| b.id), Some(3));
        assert_eq!(record.in_location.as_ref().map(|l| l.latitude), Some(12.97));
        // Half a coordinate pair is not a location.
        assert!(record.out_location.is_none());
    }

    #[test]
    fn unknown_work_mode_falls_back_to_office() {
        let mut r = row();
        r.work_mode = "beach".into();
        assert_eq!(AttendanceRecord::from_parts(r, vec![]).work_mode, WorkMode::Office);
    }

    #[test]
    fn only_one_ongoing_break() {
        let record = AttendanceRecord::from_parts(row(), vec![break_row(1, 7, t(13, 0), None)]);
        let err = record.ensure_can_start_break().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only one active break is allowed. End the current break first."
        );
        assert_eq!(record.ensure_can_end_break().unwrap().id, 1);
    }

    #[test]
    fn out_time_is_set_once() {
        let mut r = row();
        r.out_time = Some(t(18, 0));
        let record = AttendanceRecord::from_parts(r, vec![]);
        assert_eq!(record.ensure_can_check_out().unwrap_err().to_string(), "Out Time already set");
        assert_eq!(
            record.ensure_can_start_break().unwrap_err().to_string(),
            "Cannot start a break after check-out"
        );
    }

    #[test]
    fn check_out_blocked_by_ongoing_break() {
        let record = AttendanceRecord::from_parts(row(), vec![break_row(1, 7, t(13, 0), None)]);
        assert!(matches!(record.ensure_can_check_out(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn closed_breaks_allow_new_ones() {
        let record =
            AttendanceRecord::from_parts(row(), vec![break_row(1, 7, t(13, 0), Some(t(13, 20)))]);
        assert!(record.ensure_can_start_break().is_ok());
        assert!(record.ensure_can_check_out().is_ok());
        assert_eq!(
            record.ensure_can_end_break().unwrap_err().to_string(),
            "No active break to end"
        );
    }

    #[test]
    fn break_serializes_as_hhmm() {
        let b = BreakInterval {
            id: 1,
            start: t(13, 5),
            end: None,
        };
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json, serde_json::json!({ "start": "13:05", "end": null }));
        assert_eq!(b.describe(), "13:05-ongoing");
    }
}
