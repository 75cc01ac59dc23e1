//! Attendance spreadsheet export.

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, XlsxError};

use crate::engine::DayView;
use crate::model::employee::Employee;
use crate::utils::time::format_hhmm;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADERS: [(&str, f64); 11] = [
    ("Employee ID", 12.0),
    ("Name", 28.0),
    ("Designation", 22.0),
    ("Date", 12.0),
    ("In Time", 9.0),
    ("Out Time", 9.0),
    ("Work Mode", 11.0),
    ("In Location", 30.0),
    ("Out Location", 30.0),
    ("Breaks", 28.0),
    ("Status", 18.0),
];

/// One spreadsheet line: an employee-day, already evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub employee_id: u64,
    pub name: String,
    pub designation: String,
    pub date: String,
    pub in_time: String,
    pub out_time: String,
    pub work_mode: String,
    pub in_location: String,
    pub out_location: String,
    pub breaks: String,
    pub status: String,
}

impl ExportRow {
    pub fn new(employee: &Employee, day: &DayView) -> Self {
        ExportRow {
            employee_id: employee.id,
            name: employee.full_name(),
            designation: employee.designation.clone().unwrap_or_default(),
            date: day.date.format("%Y-%m-%d").to_string(),
            in_time: day.in_time.map(format_hhmm).unwrap_or_default(),
            out_time: day.out_time.map(format_hhmm).unwrap_or_default(),
            work_mode: day.work_mode.map(|m| m.to_string()).unwrap_or_default(),
            in_location: day.in_location.as_ref().map(|l| l.describe()).unwrap_or_default(),
            out_location: day.out_location.as_ref().map(|l| l.describe()).unwrap_or_default(),
            breaks: day
                .breaks
                .iter()
                .map(|b| b.describe())
                .collect::<Vec<_>>()
                .join(", "),
            status: day.status.label().to_string(),
        }
    }

    fn cells(&self) -> [&str; 10] {
        [
            &self.name,
            &self.designation,
            &self.date,
            &self.in_time,
            &self.out_time,
            &self.work_mode,
            &self.in_location,
            &self.out_location,
            &self.breaks,
            &self.status,
        ]
    }
}

/// Renders the rows into an in-memory `.xlsx` file.
pub fn build_attendance_workbook(rows: &[ExportRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet.set_name("Attendance")?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x4472C4))
        .set_font_color(Color::White)
        .set_border(FormatBorder::Thin);

    for (col, (header, width)) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        worksheet.set_column_width(col as u16, *width)?;
    }

    for (idx, record) in rows.iter().enumerate() {
        let row = (idx + 1) as u32;

        worksheet.write_number(row, 0, record.employee_id as f64)?;
        for (offset, value) in record.cells().iter().enumerate() {
            worksheet.write_string(row, (offset + 1) as u16, *value)?;
        }
    }

    if !rows.is_empty() {
        worksheet.autofilter(0, 0, rows.len() as u32, (HEADERS.len() - 1) as u16)?;
    }

    worksheet.set_freeze_panes(1, 0)?;

    workbook.save_to_buffer()
}
