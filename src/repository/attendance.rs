use chrono::{NaiveDate, NaiveTime};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use std::collections::HashMap;

use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, AttendanceRow, BreakRow, Location, WorkMode};

const ATTENDANCE_COLUMNS: &str = "a.id, a.employee_id, a.date, a.in_time, a.out_time, a.work_mode, \
     a.in_latitude, a.in_longitude, a.in_area, a.out_latitude, a.out_longitude, a.out_area";

/// Attendance records (breaks included) for `from..=to`, optionally for one employee.
pub async fn fetch_range(
    pool: &MySqlPool,
    employee_id: Option<u64>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let mut rows_q: QueryBuilder<MySql> = QueryBuilder::new(format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance a WHERE a.date BETWEEN "
    ));
    rows_q.push_bind(from).push(" AND ").push_bind(to);
    if let Some(id) = employee_id {
        rows_q.push(" AND a.employee_id = ").push_bind(id);
    }
    rows_q.push(" ORDER BY a.employee_id, a.date");

    let rows: Vec<AttendanceRow> = rows_q.build_query_as().fetch_all(pool).await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut breaks_q: QueryBuilder<MySql> = QueryBuilder::new(
        "SELECT b.id, b.attendance_id, b.start_time, b.end_time \
         FROM attendance_breaks b JOIN attendance a ON a.id = b.attendance_id \
         WHERE a.date BETWEEN ",
    );
    breaks_q.push_bind(from).push(" AND ").push_bind(to);
    if let Some(id) = employee_id {
        breaks_q.push(" AND a.employee_id = ").push_bind(id);
    }
    breaks_q.push(" ORDER BY b.attendance_id, b.start_time, b.id");

    let breaks: Vec<BreakRow> = breaks_q.build_query_as().fetch_all(pool).await?;

    Ok(assemble(rows, breaks))
}

pub async fn fetch_day(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    Ok(fetch_range(pool, Some(employee_id), date, date)
        .await?
        .into_iter()
        .next())
}

fn assemble(rows: Vec<AttendanceRow>, breaks: Vec<BreakRow>) -> Vec<AttendanceRecord> {
    let mut by_attendance: HashMap<u64, Vec<BreakRow>> = HashMap::new();
    for b in breaks {
        by_attendance.entry(b.attendance_id).or_default().push(b);
    }

    rows.into_iter()
        .map(|row| {
            let own = by_attendance.remove(&row.id).unwrap_or_default();
            AttendanceRecord::from_parts(row, own)
        })
        .collect()
}

/// Creates today's record. Duplicate (employee, date) surfaces as a unique-key error.
pub async fn insert_check_in(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    in_time: NaiveTime,
    work_mode: WorkMode,
    location: Option<&Location>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO attendance
            (employee_id, date, in_time, work_mode, in_latitude, in_longitude, in_area)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(date)
    .bind(in_time)
    .bind(work_mode.to_string())
    .bind(location.map(|l| l.latitude))
    .bind(location.map(|l| l.longitude))
    .bind(location.and_then(|l| l.area.clone()))
    .execute(pool)
    .await?;

    Ok(())
}

/// Sets the out time unless it is already set. Returns whether a row changed.
pub async fn set_check_out(
    pool: &MySqlPool,
    attendance_id: u64,
    out_time: NaiveTime,
    location: Option<&Location>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET out_time = ?, out_latitude = ?, out_longitude = ?, out_area = ?
        WHERE id = ?
        AND out_time IS NULL
        AND NOT EXISTS (
            SELECT 1 FROM attendance_breaks b
            WHERE b.attendance_id = attendance.id AND b.end_time IS NULL
        )
        "#,
    )
    .bind(out_time)
    .bind(location.map(|l| l.latitude))
    .bind(location.map(|l| l.longitude))
    .bind(location.and_then(|l| l.area.clone()))
    .bind(attendance_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Loads today's record with its row locked for the rest of the transaction.
async fn lock_day(
    tx: &mut sqlx::Transaction<'_, MySql>,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    let row: Option<AttendanceRow> = sqlx::query_as(&format!(
        "SELECT {ATTENDANCE_COLUMNS} FROM attendance a \
         WHERE a.employee_id = ? AND a.date = ? FOR UPDATE"
    ))
    .bind(employee_id)
    .bind(date)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let breaks: Vec<BreakRow> = sqlx::query_as(
        "SELECT id, attendance_id, start_time, end_time FROM attendance_breaks \
         WHERE attendance_id = ? ORDER BY start_time, id",
    )
    .bind(row.id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(Some(AttendanceRecord::from_parts(row, breaks)))
}

pub async fn start_break(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    start: NaiveTime,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let record = lock_day(&mut tx, employee_id, date)
        .await?
        .ok_or_else(|| AppError::bad_request("No check-in found for today"))?;
    record.ensure_can_start_break()?;

    sqlx::query("INSERT INTO attendance_breaks (attendance_id, start_time) VALUES (?, ?)")
        .bind(record.id)
        .bind(start)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn end_break(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
    end: NaiveTime,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let record = lock_day(&mut tx, employee_id, date)
        .await?
        .ok_or_else(|| AppError::bad_request("No check-in found for today"))?;
    let ongoing = record.ensure_can_end_break()?;

    sqlx::query("UPDATE attendance_breaks SET end_time = ? WHERE id = ? AND end_time IS NULL")
        .bind(end)
        .bind(ongoing.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64) -> AttendanceRow {
        AttendanceRow {
            id,
            employee_id: 1000,
            date: NaiveDate::from_ymd_opt(2026, 3, id as u32).unwrap(),
            in_time: NaiveTime::from_hms_opt(9, 0, 0),
            out_time: None,
            work_mode: "office".into(),
            in_latitude: None,
            in_longitude: None,
            in_area: None,
            out_latitude: None,
            out_longitude: None,
            out_area: None,
        }
    }

    fn break_row(id: u64, attendance_id: u64) -> BreakRow {
        BreakRow {
            id,
            attendance_id,
            start_time: NaiveTime::from_hms_opt(13, id as u32, 0).unwrap(),
            end_time: None,
        }
    }

    #[test]
    fn assemble_routes_breaks_to_their_day() {
        let records = assemble(
            vec![row(1), row(2), row(3)],
            vec![break_row(10, 1), break_row(11, 3), break_row(12, 1)],
        );
        assert_eq!(records.len(), 3);
        let ids: Vec<Vec<u64>> = records
            .iter()
            .map(|r| r.breaks.iter().map(|b| b.id).collect())
            .collect();
        assert_eq!(ids, vec![vec![10, 12], vec![], vec![11]]);
    }
}
