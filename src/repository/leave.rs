use chrono::NaiveDate;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::model::leave_request::{LeaveRequest, LeaveStatus};

pub const LEAVE_COLUMNS: &str =
    "id, employee_id, leave_type, start_date, end_date, status, reason, created_at";

/// Approved leaves overlapping `from..=to`, earliest start first.
pub async fn approved_overlapping(
    pool: &MySqlPool,
    employee_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<LeaveRequest>, sqlx::Error> {
    let mut q: QueryBuilder<MySql> =
        QueryBuilder::new(format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE status = "));
    q.push_bind(LeaveStatus::Approved.to_string())
        .push(" AND start_date <= ")
        .push_bind(to)
        .push(" AND end_date >= ")
        .push_bind(from);
    if let Some(id) = employee_id {
        q.push(" AND employee_id = ").push_bind(id);
    }
    q.push(" ORDER BY start_date, id");

    q.build_query_as().fetch_all(pool).await
}
