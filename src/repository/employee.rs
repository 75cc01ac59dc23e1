use sqlx::MySqlPool;

use crate::model::employee::Employee;

pub const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, designation, \
     department_id, job_title_id, hire_date, base_salary, status";

pub async fn find(pool: &MySqlPool, employee_id: u64) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
    ))
    .bind(employee_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_active(pool: &MySqlPool) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE status = 'active' ORDER BY id"
    ))
    .fetch_all(pool)
    .await
}
