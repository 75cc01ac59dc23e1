use std::collections::HashMap;

use actix_web::{HttpResponse, http::header, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::auth::AuthUser,
    config::Config,
    engine::{
        DayView, evaluate_day,
        monthly::{MonthlyReport, aggregate_month, month_bounds},
    },
    error::{AppError, is_duplicate_key, is_foreign_key_violation},
    export::{ExportRow, XLSX_CONTENT_TYPE, build_attendance_workbook},
    model::{
        attendance::{AttendanceRecord, Location, WorkMode},
        employee::Employee,
        leave_request::LeaveRequest,
    },
    repository::{attendance as attendance_repo, employee as employee_repo, leave as leave_repo},
    utils::time::{minute_now_in, parse_date, parse_month, today_in},
};

#[derive(Deserialize, IntoParams)]
pub struct DateQuery {
    /// Day to report, `YYYY-MM-DD`
    pub date: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct MonthQuery {
    /// Month to report, `YYYY-MM`
    pub month: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct ExportQuery {
    /// First day, `YYYY-MM-DD`
    pub from: Option<String>,
    /// Last day (inclusive), `YYYY-MM-DD`
    pub to: Option<String>,
    /// Restrict the export to one employee
    pub employee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct CheckInRequest {
    #[schema(example = "office")]
    pub work_mode: Option<WorkMode>,
    pub location: Option<Location>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct CheckOutRequest {
    pub location: Option<Location>,
}

/// One employee's day in the admin day view.
#[derive(Serialize, ToSchema)]
pub struct EmployeeDay {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "EMP-1000")]
    pub employee_code: String,
    #[schema(example = "Asha Rao")]
    pub name: String,
    #[schema(example = "Software Engineer")]
    pub designation: Option<String>,
    #[serde(flatten)]
    pub day: DayView,
}

#[derive(Serialize, ToSchema)]
pub struct DailyReport {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub data: Vec<EmployeeDay>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceActionResponse {
    #[schema(example = "Checked in successfully")]
    pub message: String,
    pub attendance: DayView,
}

fn required_date(raw: Option<&str>, name: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.ok_or_else(|| AppError::bad_request(format!("{name} is required")))?;
    parse_date(raw)
        .ok_or_else(|| AppError::bad_request(format!("Invalid {name}, expected YYYY-MM-DD")))
}

pub(crate) fn required_month(raw: Option<&str>) -> Result<(i32, u32), AppError> {
    let raw = raw.ok_or_else(|| AppError::bad_request("month is required"))?;
    parse_month(raw).ok_or_else(|| AppError::bad_request("Invalid month, expected YYYY-MM"))
}

/// Records and approved leaves for a range, fetched concurrently.
async fn load_range(
    pool: &MySqlPool,
    employee_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<(Vec<AttendanceRecord>, Vec<LeaveRequest>), AppError> {
    let (records, leaves) = futures::try_join!(
        attendance_repo::fetch_range(pool, employee_id, from, to),
        leave_repo::approved_overlapping(pool, employee_id, from, to),
    )?;
    Ok((records, leaves))
}

async fn day_view(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<DayView, AppError> {
    let (records, leaves) = load_range(pool, Some(employee_id), date, date).await?;
    Ok(evaluate_day(date, records.first(), &leaves, today))
}

pub(crate) async fn monthly_report(
    pool: &MySqlPool,
    employee_id: u64,
    (year, month): (i32, u32),
    today: NaiveDate,
) -> Result<MonthlyReport, AppError> {
    let (first, last) =
        month_bounds(year, month).ok_or_else(|| AppError::bad_request("Invalid month"))?;
    let (records, leaves) = load_range(pool, Some(employee_id), first, last).await?;

    aggregate_month(employee_id, year, month, &records, &leaves, today)
        .ok_or_else(|| AppError::bad_request("Invalid month"))
}

/// Groups leaves by employee for views spanning many employees.
fn leaves_by_employee(leaves: Vec<LeaveRequest>) -> HashMap<u64, Vec<LeaveRequest>> {
    let mut grouped: HashMap<u64, Vec<LeaveRequest>> = HashMap::new();
    for leave in leaves {
        grouped.entry(leave.employee_id).or_default().push(leave);
    }
    grouped
}

/// Daily report for the signed-in employee
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(DateQuery),
    responses(
        (status = 200, description = "Status of the requested day", body = DayView),
        (status = 400, description = "Invalid date"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_day(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.require_employee()?;
    let today = today_in(&config.org_timezone);

    let date = match query.date.as_deref() {
        Some(raw) => required_date(Some(raw), "date")?,
        None => today,
    };

    let view = day_view(pool.get_ref(), employee_id, date, today).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Day view across all active employees (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/daily",
    params(DateQuery),
    responses(
        (status = 200, description = "One entry per active employee", body = DailyReport),
        (status = 400, description = "Missing or invalid date", body = Object, example = json!({
            "message": "date is required"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn daily_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    let date = required_date(query.date.as_deref(), "date")?;
    let today = today_in(&config.org_timezone);

    let pool = pool.get_ref();
    let (employees, (records, leaves)) = futures::try_join!(
        async { employee_repo::find_active(pool).await.map_err(AppError::from) },
        load_range(pool, None, date, date),
    )?;

    let records: HashMap<u64, AttendanceRecord> =
        records.into_iter().map(|r| (r.employee_id, r)).collect();
    let leaves = leaves_by_employee(leaves);

    let data = employees
        .into_iter()
        .map(|employee| {
            let own_leaves = leaves.get(&employee.id).map(Vec::as_slice).unwrap_or_default();
            let day = evaluate_day(date, records.get(&employee.id), own_leaves, today);
            EmployeeDay {
                employee_id: employee.id,
                name: employee.full_name(),
                employee_code: employee.employee_code,
                designation: employee.designation,
                day,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(DailyReport { date, data }))
}

/// Monthly view for the signed-in employee
#[utoipa::path(
    get,
    path = "/api/attendance/monthly",
    params(MonthQuery),
    responses(
        (status = 200, description = "Per-day statuses and summary counts", body = MonthlyReport),
        (status = 400, description = "Missing or invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_month(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.require_employee()?;
    let month = required_month(query.month.as_deref())?;
    let today = today_in(&config.org_timezone);

    let report = monthly_report(pool.get_ref(), employee_id, month, today).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Monthly view for any employee (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/monthly/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID"),
        MonthQuery
    ),
    responses(
        (status = 200, description = "Per-day statuses and summary counts", body = MonthlyReport),
        (status = 400, description = "Missing or invalid month"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employee_month(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();
    let month = required_month(query.month.as_deref())?;
    let today = today_in(&config.org_timezone);

    if employee_repo::find(pool.get_ref(), employee_id).await?.is_none() {
        return Err(AppError::not_found("Employee not found"));
    }

    let report = monthly_report(pool.get_ref(), employee_id, month, today).await?;
    Ok(HttpResponse::Ok().json(report))
}

/// Attendance spreadsheet for a date range (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "Excel workbook (.xlsx attachment)"),
        (status = 400, description = "Missing, invalid or too wide date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn export_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let from = required_date(query.from.as_deref(), "from")?;
    let to = required_date(query.to.as_deref(), "to")?;
    if from > to {
        return Err(AppError::bad_request("from cannot be after to"));
    }
    let span = (to - from).num_days() + 1;
    if span > config.export_max_days {
        return Err(AppError::bad_request(format!(
            "Date range too large, at most {} days",
            config.export_max_days
        )));
    }

    let pool = pool.get_ref();
    let employees: Vec<Employee> = match query.employee_id {
        Some(id) => vec![
            employee_repo::find(pool, id)
                .await?
                .ok_or_else(|| AppError::not_found("Employee not found"))?,
        ],
        None => employee_repo::find_active(pool).await?,
    };

    let (records, leaves) = load_range(pool, query.employee_id, from, to).await?;
    let records: HashMap<(u64, NaiveDate), AttendanceRecord> = records
        .into_iter()
        .map(|r| ((r.employee_id, r.date), r))
        .collect();
    let leaves = leaves_by_employee(leaves);
    let today = today_in(&config.org_timezone);

    let mut rows = Vec::with_capacity(employees.len() * span as usize);
    for employee in &employees {
        let own_leaves = leaves.get(&employee.id).map(Vec::as_slice).unwrap_or_default();
        for date in from.iter_days().take_while(|d| *d <= to) {
            let day = evaluate_day(date, records.get(&(employee.id, date)), own_leaves, today);
            rows.push(ExportRow::new(employee, &day));
        }
    }

    debug!(rows = rows.len(), %from, %to, "Rendering attendance export");

    let bytes = web::block(move || build_attendance_workbook(&rows))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("export worker failed: {e}")))?
        .map_err(|e| AppError::Internal(anyhow::anyhow!("xlsx rendering failed: {e}")))?;

    let filename = format!("attendance_{}_{}.xlsx", from.format("%Y%m%d"), to.format("%Y%m%d"));

    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(bytes))
}

async fn action_response(
    pool: &MySqlPool,
    config: &Config,
    employee_id: u64,
    message: &str,
) -> Result<HttpResponse, AppError> {
    let today = today_in(&config.org_timezone);
    let attendance = day_view(pool, employee_id, today, today).await?;

    Ok(HttpResponse::Ok().json(AttendanceActionResponse {
        message: message.to_string(),
        attendance,
    }))
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(content = CheckInRequest, description = "Work mode and location, both optional"),
    responses(
        (status = 200, description = "Checked in successfully", body = AttendanceActionResponse),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "message": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: Option<web::Json<CheckInRequest>>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.require_employee()?;
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();

    let date = today_in(&config.org_timezone);
    let now = minute_now_in(&config.org_timezone);
    let work_mode = payload.work_mode.unwrap_or_default();

    let result = attendance_repo::insert_check_in(
        pool.get_ref(),
        employee_id,
        date,
        now,
        work_mode,
        payload.location.as_ref(),
    )
    .await;

    match result {
        Ok(()) => {}
        Err(e) if is_duplicate_key(&e) => {
            return Err(AppError::bad_request("Already checked in today"));
        }
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(AppError::not_found("Employee profile not found"));
        }
        Err(e) => return Err(e.into()),
    }

    info!(employee_id, %date, %work_mode, "Checked in");
    action_response(pool.get_ref(), &config, employee_id, "Checked in successfully").await
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/check-out",
    request_body(content = CheckOutRequest, description = "Location, optional"),
    responses(
        (status = 200, description = "Checked out successfully", body = AttendanceActionResponse),
        (status = 400, description = "No check-in, ongoing break or out time already set", body = Object, example = json!({
            "message": "Out Time already set"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: Option<web::Json<CheckOutRequest>>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.require_employee()?;
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();

    let date = today_in(&config.org_timezone);
    let now = minute_now_in(&config.org_timezone);

    let record = attendance_repo::fetch_day(pool.get_ref(), employee_id, date)
        .await?
        .filter(|r| r.in_time.is_some())
        .ok_or_else(|| AppError::bad_request("No check-in found for today"))?;
    record.ensure_can_check_out()?;

    let updated =
        attendance_repo::set_check_out(pool.get_ref(), record.id, now, payload.location.as_ref())
            .await?;
    if !updated {
        // lost a race with another check-out or a break start
        let current = attendance_repo::fetch_day(pool.get_ref(), employee_id, date).await?;
        if let Some(current) = current {
            current.ensure_can_check_out()?;
        }
        return Err(AppError::bad_request("Out Time already set"));
    }

    info!(employee_id, %date, "Checked out");
    action_response(pool.get_ref(), &config, employee_id, "Checked out successfully").await
}

/// Start a break
#[utoipa::path(
    post,
    path = "/api/attendance/break/start",
    responses(
        (status = 200, description = "Break started", body = AttendanceActionResponse),
        (status = 400, description = "No check-in, already checked out or a break is ongoing", body = Object, example = json!({
            "message": "Only one active break is allowed. End the current break first."
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn start_break(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.require_employee()?;
    let date = today_in(&config.org_timezone);
    let now = minute_now_in(&config.org_timezone);

    attendance_repo::start_break(pool.get_ref(), employee_id, date, now).await?;

    info!(employee_id, %date, "Break started");
    action_response(pool.get_ref(), &config, employee_id, "Break started").await
}

/// End the ongoing break
#[utoipa::path(
    put,
    path = "/api/attendance/break/end",
    responses(
        (status = 200, description = "Break ended", body = AttendanceActionResponse),
        (status = 400, description = "No ongoing break", body = Object, example = json!({
            "message": "No active break to end"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn end_break(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.require_employee()?;
    let date = today_in(&config.org_timezone);
    let now = minute_now_in(&config.org_timezone);

    attendance_repo::end_break(pool.get_ref(), employee_id, date, now).await?;

    info!(employee_id, %date, "Break ended");
    action_response(pool.get_ref(), &config, employee_id, "Break ended").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameters_are_bad_requests() {
        assert!(matches!(required_date(None, "date"), Err(AppError::BadRequest(m)) if m == "date is required"));
        assert!(matches!(required_month(None), Err(AppError::BadRequest(m)) if m == "month is required"));
    }

    #[test]
    fn malformed_parameters_are_bad_requests() {
        assert!(required_date(Some("02-03-2026"), "date").is_err());
        assert!(required_month(Some("2026-13")).is_err());
        assert_eq!(required_month(Some("2026-02")).unwrap(), (2026, 2));
        assert_eq!(
            required_date(Some("2026-02-28"), "from").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
    }

    #[test]
    fn leaves_are_grouped_per_employee() {
        let leave = |id: u64, employee_id: u64| LeaveRequest {
            id,
            employee_id,
            leave_type: "Casual".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            status: "Approved".into(),
            reason: None,
            created_at: None,
        };
        let grouped = leaves_by_employee(vec![leave(1, 10), leave(2, 11), leave(3, 10)]);
        assert_eq!(grouped[&10].iter().map(|l| l.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(grouped[&11].len(), 1);
    }
}
