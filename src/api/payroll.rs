use std::collections::HashSet;

use actix_web::{HttpResponse, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::attendance::{monthly_report, required_month},
    auth::auth::AuthUser,
    config::Config,
    engine::monthly::days_in_month,
    error::{AppError, is_duplicate_key},
    model::{
        employee::Employee,
        payroll::{Payroll, PayrollFigures},
    },
    repository::employee as employee_repo,
    utils::time::today_in,
};

const PAYROLL_COLUMNS: &str = "id, employee_id, month, base_salary, bonus, deductions, \
     lop_days, lop_deduction, net_salary";

#[derive(Deserialize, ToSchema)]
pub struct CreatePayroll {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = "2026-01")]
    pub month: String,

    /// Defaults to the employee's base salary.
    #[schema(example = 50000.0)]
    pub base_salary: Option<f64>,

    #[schema(example = 5000.0)]
    pub bonus: Option<f64>,

    #[schema(example = 2000.0)]
    pub deductions: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayroll {
    #[schema(example = 52000.0)]
    pub base_salary: Option<f64>,

    #[schema(example = 6000.0)]
    pub bonus: Option<f64>,

    #[schema(example = 2500.0)]
    pub deductions: Option<f64>,
}

#[derive(Deserialize, ToSchema)]
pub struct GeneratePayroll {
    #[schema(example = "2026-01")]
    pub month: String,
}

#[derive(Serialize, ToSchema, Default, Debug, PartialEq)]
pub struct GenerateSummary {
    #[schema(example = "2026-01")]
    pub month: String,
    #[schema(example = 42)]
    pub generated: u32,
    #[schema(example = 3)]
    pub skipped: u32,
    #[schema(example = 0)]
    pub failed: u32,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayrollQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    #[schema(example = 1001)]
    pub employee_id: Option<u64>,

    /// `YYYY-MM`
    #[schema(example = "2026-01")]
    pub month: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedPayrollResponse {
    pub data: Vec<Payroll>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

fn first_of_month((year, month): (i32, u32)) -> Result<NaiveDate, AppError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| AppError::bad_request("Invalid month"))
}

fn validate_amounts(values: &[Option<f64>]) -> Result<(), AppError> {
    if values.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(AppError::bad_request("Amounts must be non-negative numbers"));
    }
    Ok(())
}

async fn find_payroll(pool: &MySqlPool, payroll_id: u64) -> Result<Option<Payroll>, sqlx::Error> {
    sqlx::query_as::<_, Payroll>(&format!(
        "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE id = ?"
    ))
    .bind(payroll_id)
    .fetch_optional(pool)
    .await
}

/// Computes the month's figures from attendance and stores the payslip.
async fn create_for(
    pool: &MySqlPool,
    config: &Config,
    employee: &Employee,
    month: (i32, u32),
    base_salary: f64,
    bonus: f64,
    deductions: f64,
) -> Result<u64, AppError> {
    let today = today_in(&config.org_timezone);
    let report = monthly_report(pool, employee.id, month, today).await?;
    let summary = PayrollFigures::employed_summary(&report, employee.hire_date);
    let figures = PayrollFigures::compute(base_salary, bonus, deductions, &summary);

    let result = sqlx::query(
        r#"
        INSERT INTO payroll
        (employee_id, month, base_salary, bonus, deductions, lop_days, lop_deduction, net_salary)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(first_of_month(month)?)
    .bind(figures.base_salary)
    .bind(figures.bonus)
    .bind(figures.deductions)
    .bind(figures.lop_days)
    .bind(figures.lop_deduction)
    .bind(figures.net_salary)
    .execute(pool)
    .await;

    match result {
        Ok(res) => Ok(res.last_insert_id()),
        Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(
            "Payroll already exists for this month".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/api/payroll",
    request_body = CreatePayroll,
    responses(
        (status = 201, description = "Payroll created", body = Object, example = json!({
            "message": "Payroll created successfully",
            "id": 1
        })),
        (status = 400, description = "Invalid month or amount"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Payroll already exists for this month")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn create_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreatePayroll>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let month = required_month(Some(&payload.month))?;
    validate_amounts(&[payload.base_salary, payload.bonus, payload.deductions])?;

    let employee = employee_repo::find(pool.get_ref(), payload.employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    let id = create_for(
        pool.get_ref(),
        &config,
        &employee,
        month,
        payload.base_salary.unwrap_or(employee.base_salary),
        payload.bonus.unwrap_or(0.0),
        payload.deductions.unwrap_or(0.0),
    )
    .await?;

    info!(payroll_id = id, employee_id = employee.id, "Payroll created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Payroll created successfully",
        "id": id
    })))
}

#[utoipa::path(
    put,
    path = "/api/payroll/{payroll_id}",
    request_body = UpdatePayroll,
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, description = "Payroll updated", body = Payroll),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayroll>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    validate_amounts(&[body.base_salary, body.bonus, body.deductions])?;

    let payroll_id = path.into_inner();

    let current = find_payroll(pool.get_ref(), payroll_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payroll record not found"))?;

    let days = days_in_month(current.month.year(), current.month.month()).unwrap_or(30);

    // LOP days stay as computed at creation; only the money is edited.
    let figures = PayrollFigures::with_lop(
        body.base_salary.unwrap_or(current.base_salary),
        body.bonus.unwrap_or(current.bonus),
        body.deductions.unwrap_or(current.deductions),
        current.lop_days,
        days,
    );

    sqlx::query(
        r#"
        UPDATE payroll
        SET base_salary = ?, bonus = ?, deductions = ?, lop_deduction = ?, net_salary = ?
        WHERE id = ?
        "#,
    )
    .bind(figures.base_salary)
    .bind(figures.bonus)
    .bind(figures.deductions)
    .bind(figures.lop_deduction)
    .bind(figures.net_salary)
    .bind(payroll_id)
    .execute(pool.get_ref())
    .await?;

    info!(payroll_id, "Payroll updated");

    Ok(HttpResponse::Ok().json(Payroll {
        base_salary: figures.base_salary,
        bonus: figures.bonus,
        deductions: figures.deductions,
        lop_deduction: figures.lop_deduction,
        net_salary: figures.net_salary,
        ..current
    }))
}

#[utoipa::path(
    get,
    path = "/api/payroll/{payroll_id}",
    params(
        ("payroll_id" = u64, Path, description = "Payroll ID")
    ),
    responses(
        (status = 200, body = Payroll),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Payroll not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let payroll_id = path.into_inner();

    let payroll = find_payroll(pool.get_ref(), payroll_id)
        .await?
        .ok_or_else(|| AppError::not_found("Payroll not found"))?;

    // employees may read their own payslips
    if auth.employee_id != Some(payroll.employee_id) {
        auth.require_hr_or_admin()?;
    }

    Ok(HttpResponse::Ok().json(payroll))
}

#[utoipa::path(
    get,
    path = "/api/payroll/me",
    responses(
        (status = 200, description = "Own payslips, newest first", body = [Payroll]),
        (status = 404, description = "Employee profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn my_payslips(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<HttpResponse, AppError> {
    let employee_id = auth.require_employee()?;

    let data = sqlx::query_as::<_, Payroll>(&format!(
        "SELECT {PAYROLL_COLUMNS} FROM payroll WHERE employee_id = ? ORDER BY month DESC"
    ))
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(data))
}

#[utoipa::path(
    get,
    path = "/api/payroll",
    params(PayrollQuery),
    responses(
        (status = 200, body = PaginatedPayrollResponse),
        (status = 400, description = "Invalid month filter"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_payrolls(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PayrollQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_hr_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let month = match query.month.as_deref() {
        Some(raw) => Some(first_of_month(required_month(Some(raw))?)?),
        None => None,
    };

    let mut where_sql = String::from(" WHERE 1=1");
    if query.employee_id.is_some() {
        where_sql.push_str(" AND employee_id = ?");
    }
    if month.is_some() {
        where_sql.push_str(" AND month = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM payroll{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(id) = query.employee_id {
        count_q = count_q.bind(id);
    }
    if let Some(m) = month {
        count_q = count_q.bind(m);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {PAYROLL_COLUMNS} FROM payroll{where_sql} ORDER BY month DESC, id DESC LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, Payroll>(&data_sql);
    if let Some(id) = query.employee_id {
        data_q = data_q.bind(id);
    }
    if let Some(m) = month {
        data_q = data_q.bind(m);
    }
    let data = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(PaginatedPayrollResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Generates payslips for every active employee that has none for the month.
#[utoipa::path(
    post,
    path = "/api/payroll/generate",
    request_body = GeneratePayroll,
    responses(
        (status = 200, description = "Batch finished", body = GenerateSummary),
        (status = 400, description = "Invalid month"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
#[instrument(name = "payroll_generate", skip(auth, pool, config, payload), fields(month = %payload.month))]
pub async fn generate_payroll(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<GeneratePayroll>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let month = required_month(Some(&payload.month))?;
    let first = first_of_month(month)?;
    let pool = pool.get_ref();

    let existing: HashSet<u64> =
        sqlx::query_scalar::<_, u64>("SELECT employee_id FROM payroll WHERE month = ?")
            .bind(first)
            .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

    let mut summary = GenerateSummary {
        month: first.format("%Y-%m").to_string(),
        ..Default::default()
    };

    // Loaded up front so no connection is held while each payslip runs its own reads.
    let employees = employee_repo::find_active(pool).await?;

    for employee in employees {
        if existing.contains(&employee.id) {
            summary.skipped += 1;
            continue;
        }

        match create_for(pool, &config, &employee, month, employee.base_salary, 0.0, 0.0).await {
            Ok(_) => summary.generated += 1,
            Err(AppError::Conflict(_)) => {
                warn!(employee_id = employee.id, "Payslip created concurrently, skipping");
                summary.skipped += 1;
            }
            Err(e) => {
                error!(employee_id = employee.id, error = %e, "Payslip generation failed");
                summary.failed += 1;
            }
        }
    }

    info!(
        generated = summary.generated,
        skipped = summary.skipped,
        failed = summary.failed,
        "Payroll batch finished"
    );

    Ok(HttpResponse::Ok().json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_maps_to_first_day() {
        assert_eq!(
            first_of_month((2026, 2)).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert!(first_of_month((2026, 13)).is_err());
    }

    #[test]
    fn negative_or_non_finite_amounts_are_rejected() {
        assert!(validate_amounts(&[Some(1.0), None, Some(0.0)]).is_ok());
        assert!(validate_amounts(&[Some(-1.0)]).is_err());
        assert!(validate_amounts(&[None, Some(f64::NAN)]).is_err());
    }
}
