use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::engine::hours::round2;
use crate::engine::monthly::{MonthlyReport, MonthlySummary};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payroll {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    /// First day of the payroll month.
    #[schema(example = "2026-03-01", value_type = String, format = "date")]
    pub month: NaiveDate,
    #[schema(example = 60000.0)]
    pub base_salary: f64,
    #[schema(example = 5000.0)]
    pub bonus: f64,
    #[schema(example = 2000.0)]
    pub deductions: f64,
    #[schema(example = 1.5)]
    pub lop_days: f64,
    #[schema(example = 2903.23)]
    pub lop_deduction: f64,
    #[schema(example = 60096.77)]
    pub net_salary: f64,
}

/// Salary figures for one payslip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayrollFigures {
    pub base_salary: f64,
    pub bonus: f64,
    pub deductions: f64,
    pub lop_days: f64,
    pub lop_deduction: f64,
    pub net_salary: f64,
}

impl PayrollFigures {
    /// Loss-of-pay days: every absent day, half of every half day.
    /// Approved leave and work from home are paid.
    pub fn lop_days(summary: &MonthlySummary) -> f64 {
        summary.absent_days as f64 + 0.5 * summary.half_days as f64
    }

    /// The month's summary restricted to days on or after `hire_date`.
    /// `total_days` keeps the full month length, so the daily rate is unchanged.
    pub fn employed_summary(report: &MonthlyReport, hire_date: NaiveDate) -> MonthlySummary {
        let summary = &report.summary;
        MonthlySummary::tally(
            summary.year,
            summary.month,
            summary.total_days,
            report
                .days
                .iter()
                .filter(|day| day.date >= hire_date)
                .map(|day| day.status),
        )
    }

    pub fn compute(base_salary: f64, bonus: f64, deductions: f64, summary: &MonthlySummary) -> Self {
        Self::with_lop(base_salary, bonus, deductions, Self::lop_days(summary), summary.total_days)
    }

    /// Recomputes with an already known LOP figure, e.g. when a payslip is edited.
    pub fn with_lop(base_salary: f64, bonus: f64, deductions: f64, lop_days: f64, days_in_month: u32) -> Self {
        let lop_deduction = if days_in_month == 0 {
            0.0
        } else {
            round2(base_salary / days_in_month as f64 * lop_days)
        };

        PayrollFigures {
            base_salary,
            bonus,
            deductions,
            lop_days,
            lop_deduction,
            net_salary: round2(base_salary + bonus - deductions - lop_deduction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::monthly::aggregate_month;
    use crate::engine::status::AttendanceStatus::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn full_attendance_has_no_lop() {
        let summary = MonthlySummary::tally(2026, 4, 30, vec![Present; 30]);
        let figures = PayrollFigures::compute(30000.0, 1000.0, 500.0, &summary);
        assert_eq!(figures.lop_days, 0.0);
        assert_eq!(figures.lop_deduction, 0.0);
        assert_eq!(figures.net_salary, 30500.0);
    }

    #[test]
    fn absences_and_half_days_reduce_pay() {
        // 2 absent + 2 half days = 3 LOP days out of 30
        let statuses = [vec![Present; 24], vec![Absent; 2], vec![HalfDay; 2], vec![Leave; 2]].concat();
        let summary = MonthlySummary::tally(2026, 4, 30, statuses);
        let figures = PayrollFigures::compute(30000.0, 0.0, 0.0, &summary);
        assert_eq!(figures.lop_days, 3.0);
        assert_eq!(figures.lop_deduction, 3000.0);
        assert_eq!(figures.net_salary, 27000.0);
    }

    #[test]
    fn wfh_and_not_yet_days_are_not_lop() {
        let statuses = [vec![WfhPresent; 10], vec![WfhNotMarked; 2], vec![NotYet; 19]].concat();
        let summary = MonthlySummary::tally(2026, 3, 31, statuses);
        assert_eq!(PayrollFigures::lop_days(&summary), 0.0);
    }

    #[test]
    fn days_before_joining_are_not_lop() {
        // No punches at all in April; joined on the 21st.
        let report = aggregate_month(7, 2026, 4, &[], &[], date(2026, 5, 10)).unwrap();
        assert_eq!(report.summary.absent_days, 30);

        let summary = PayrollFigures::employed_summary(&report, date(2026, 4, 21));
        assert_eq!(summary.total_days, 30);
        assert_eq!(summary.absent_days, 10);

        let figures = PayrollFigures::compute(30000.0, 0.0, 0.0, &summary);
        assert_eq!(figures.lop_days, 10.0);
        assert_eq!(figures.lop_deduction, 10000.0);
    }

    #[test]
    fn joining_before_the_month_keeps_every_day() {
        let report = aggregate_month(7, 2026, 4, &[], &[], date(2026, 5, 10)).unwrap();
        let summary = PayrollFigures::employed_summary(&report, date(2024, 1, 1));
        assert_eq!(summary, report.summary);
    }

    #[test]
    fn deduction_is_rounded_to_cents() {
        let figures = PayrollFigures::with_lop(50000.0, 0.0, 0.0, 1.0, 31);
        assert_eq!(figures.lop_deduction, 1612.9);
        assert_eq!(figures.net_salary, 48387.1);
    }
}
