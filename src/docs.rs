use crate::api::attendance::{
    AttendanceActionResponse, CheckInRequest, CheckOutRequest, DailyReport, EmployeeDay,
};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::leave_request::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::payroll::{
    CreatePayroll, GeneratePayroll, GenerateSummary, PaginatedPayrollResponse, PayrollQuery,
    UpdatePayroll,
};
use crate::engine::DayView;
use crate::engine::monthly::{MonthlyReport, MonthlySummary};
use crate::model::attendance::{BreakInterval, Location, WorkMode};
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::payroll::Payroll;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

/// Registers the `bearer_auth` scheme referenced by the protected paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRMS Attendance API",
        version = "1.0.0",
        description = r#"
## HRMS Attendance Service

Attendance tracking for an HR management system: punches, breaks, derived
daily statuses, monthly rollups, spreadsheet export, plus the leave, employee
and payroll records they depend on.

### 🔹 Key Features
- **Attendance**
  - Check-in / check-out with work mode and location, one active break at a time
  - Daily status per employee (`Present`, `Half-Day`, `Work from Home - Present`, ...)
  - Monthly summary with attendance percentage, Excel export
- **Leave Management**
  - Apply for leave, approve/reject requests; approved leave shapes the daily status
- **Employee Management**
  - Create, update, list, and view employee profiles
- **Payroll**
  - Payslips with loss-of-pay derived from the monthly attendance summary

### 🔐 Security
Endpoints under `/api` require a **JWT Bearer** access token from `/auth/login`.
HR/Admin roles are required for organization-wide views.

### 🕘 Time
Dates and times are in the organization timezone; times are `HH:MM`.
"#,
    ),
    paths(
        crate::api::attendance::my_day,
        crate::api::attendance::daily_report,
        crate::api::attendance::my_month,
        crate::api::attendance::employee_month,
        crate::api::attendance::export_attendance,
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::start_break,
        crate::api::attendance::end_break,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::my_profile,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::payroll::create_payroll,
        crate::api::payroll::update_payroll,
        crate::api::payroll::get_payroll,
        crate::api::payroll::my_payslips,
        crate::api::payroll::list_payrolls,
        crate::api::payroll::generate_payroll
    ),
    components(
        schemas(
            DayView,
            BreakInterval,
            Location,
            WorkMode,
            MonthlyReport,
            MonthlySummary,
            DailyReport,
            EmployeeDay,
            CheckInRequest,
            CheckOutRequest,
            AttendanceActionResponse,
            LeaveRequest,
            LeaveStatus,
            LeaveFilter,
            CreateLeave,
            LeaveListResponse,
            CreateEmployee,
            UpdateEmployee,
            Employee,
            EmployeeListResponse,
            Payroll,
            PaginatedPayrollResponse,
            CreatePayroll,
            UpdatePayroll,
            GeneratePayroll,
            GenerateSummary,
            PayrollQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance tracking and reports"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Payroll", description = "Payroll management APIs"),
    )
)]
pub struct ApiDoc;
