use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::lifecycle::RequestStatus;

/// One named amount inside a salary record (`allowances` / `deductions`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LineItem {
    pub label: String,
    pub amount: f64,
}

/// Salary source row. Salary has no approval concept and is always included.
#[derive(Debug, Clone)]
pub struct SalaryRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub month: String,
    pub year: i32,
    pub basic_salary: f64,
    pub allowances: Vec<LineItem>,
    pub deductions: Vec<LineItem>,
}

/// Variable or fixed allowance source row. Only `approved` rows contribute.
#[derive(Debug, Clone)]
pub struct AllowanceRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub month: String,
    pub year: i32,
    pub amount: f64,
    pub status: RequestStatus,
}

/// One reporting row per (employee, month, year). Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CtcRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub month: String,
    pub year: i32,
    pub basic_salary: f64,
    pub salary_allowances: f64,
    pub salary_deductions: f64,
    pub variable_allowances: f64,
    pub fixed_allowances: f64,
    pub total_ctc: f64,
}

static MONTH_ORDER: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        "january", "february", "march", "april", "may", "june",
        "july", "august", "september", "october", "november", "december",
    ]
    .iter()
    .enumerate()
    .map(|(i, name)| (*name, i as u32 + 1))
    .collect()
});

/// Calendar position of an English month name, 1-based. Unknown names sort
/// before January instead of failing the whole report.
pub fn month_index(name: &str) -> u32 {
    MONTH_ORDER
        .get(name.trim().to_lowercase().as_str())
        .copied()
        .unwrap_or(0)
}

fn row_key(employee_id: u64, month: &str, year: i32) -> (u64, i32, u32) {
    (employee_id, year, month_index(month))
}

/// Fold the three source collections into one row per key.
///
/// The map is open: an approved allowance with no matching salary record
/// still produces a row. Pure summation, so the fold order of the three
/// sources cannot change the result, and repeated calls over unchanged
/// inputs return identical rows.
pub fn aggregate(
    salaries: &[SalaryRow],
    variable: &[AllowanceRow],
    fixed: &[AllowanceRow],
) -> Vec<CtcRow> {
    let mut rows: HashMap<(u64, i32, u32), CtcRow> = HashMap::new();

    for s in salaries {
        let row = entry(&mut rows, s.employee_id, &s.employee_name, &s.month, s.year);
        row.basic_salary += s.basic_salary;
        row.salary_allowances += s.allowances.iter().map(|i| i.amount).sum::<f64>();
        row.salary_deductions += s.deductions.iter().map(|i| i.amount).sum::<f64>();
    }

    for a in variable.iter().filter(|a| a.status == RequestStatus::Approved) {
        let row = entry(&mut rows, a.employee_id, &a.employee_name, &a.month, a.year);
        row.variable_allowances += a.amount;
    }

    for a in fixed.iter().filter(|a| a.status == RequestStatus::Approved) {
        let row = entry(&mut rows, a.employee_id, &a.employee_name, &a.month, a.year);
        row.fixed_allowances += a.amount;
    }

    let mut out: Vec<CtcRow> = rows
        .into_values()
        .map(|mut row| {
            row.total_ctc = row.basic_salary + row.salary_allowances - row.salary_deductions
                + row.variable_allowances
                + row.fixed_allowances;
            row
        })
        .collect();

    // year desc, calendar month desc, employee name asc
    out.sort_by(|a, b| {
        b.year
            .cmp(&a.year)
            .then(month_index(&b.month).cmp(&month_index(&a.month)))
            .then(a.employee_name.cmp(&b.employee_name))
    });

    out
}

fn entry<'a>(
    rows: &'a mut HashMap<(u64, i32, u32), CtcRow>,
    employee_id: u64,
    employee_name: &str,
    month: &str,
    year: i32,
) -> &'a mut CtcRow {
    rows.entry(row_key(employee_id, month, year))
        .or_insert_with(|| CtcRow {
            employee_id,
            employee_name: employee_name.to_string(),
            month: month.to_string(),
            year,
            basic_salary: 0.0,
            salary_allowances: 0.0,
            salary_deductions: 0.0,
            variable_allowances: 0.0,
            fixed_allowances: 0.0,
            total_ctc: 0.0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salary(employee_id: u64, name: &str, month: &str, year: i32, basic: f64, allow: f64, deduct: f64) -> SalaryRow {
        SalaryRow {
            employee_id,
            employee_name: name.to_string(),
            month: month.to_string(),
            year,
            basic_salary: basic,
            allowances: vec![LineItem { label: "hra".into(), amount: allow }],
            deductions: vec![LineItem { label: "pf".into(), amount: deduct }],
        }
    }

    fn allowance(employee_id: u64, name: &str, month: &str, year: i32, amount: f64, status: RequestStatus) -> AllowanceRow {
        AllowanceRow {
            employee_id,
            employee_name: name.to_string(),
            month: month.to_string(),
            year,
            amount,
            status,
        }
    }

    #[test]
    fn month_index_is_calendar_order() {
        assert_eq!(month_index("January"), 1);
        assert_eq!(month_index("march"), 3);
        assert_eq!(month_index(" DECEMBER "), 12);
        assert_eq!(month_index("smarch"), 0);
    }

    #[test]
    fn pending_and_rejected_allowances_are_excluded() {
        let salaries = vec![salary(1, "Asha", "March", 2024, 30000.0, 2000.0, 500.0)];
        let variable = vec![allowance(1, "Asha", "March", 2024, 1000.0, RequestStatus::Approved)];
        let fixed = vec![allowance(1, "Asha", "March", 2024, 2000.0, RequestStatus::Pending)];

        let rows = aggregate(&salaries, &variable, &fixed);
        assert_eq!(rows.len(), 1);
        // 30000 + 2000 - 500 + 1000, pending fixed allowance excluded
        assert_eq!(rows[0].total_ctc, 32500.0);
        assert_eq!(rows[0].fixed_allowances, 0.0);

        let rejected = vec![allowance(1, "Asha", "March", 2024, 2000.0, RequestStatus::Rejected)];
        let rows = aggregate(&salaries, &variable, &rejected);
        assert_eq!(rows[0].total_ctc, 32500.0);
    }

    #[test]
    fn flipping_to_approved_adds_exactly_the_amount() {
        let salaries = vec![salary(1, "Asha", "March", 2024, 30000.0, 2000.0, 500.0)];
        let variable = vec![allowance(1, "Asha", "March", 2024, 1000.0, RequestStatus::Approved)];
        let mut fixed = vec![allowance(1, "Asha", "March", 2024, 2000.0, RequestStatus::Pending)];

        let before = aggregate(&salaries, &variable, &fixed)[0].total_ctc;
        fixed[0].status = RequestStatus::Approved;
        let after = aggregate(&salaries, &variable, &fixed)[0].total_ctc;

        assert_eq!(after - before, 2000.0);
    }

    #[test]
    fn allowance_without_salary_still_creates_a_row() {
        let variable = vec![allowance(7, "Binod", "June", 2024, 750.0, RequestStatus::Approved)];

        let rows = aggregate(&[], &variable, &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_id, 7);
        assert_eq!(rows[0].basic_salary, 0.0);
        assert_eq!(rows[0].total_ctc, 750.0);
    }

    #[test]
    fn repeated_aggregation_is_identical() {
        let salaries = vec![
            salary(1, "Asha", "March", 2024, 30000.0, 2000.0, 500.0),
            salary(2, "Binod", "March", 2024, 25000.0, 1000.0, 0.0),
        ];
        let variable = vec![allowance(1, "Asha", "March", 2024, 400.0, RequestStatus::Approved)];
        let fixed = vec![allowance(2, "Binod", "March", 2024, 600.0, RequestStatus::Approved)];

        let first = aggregate(&salaries, &variable, &fixed);
        let second = aggregate(&salaries, &variable, &fixed);
        assert_eq!(first, second);
    }

    #[test]
    fn rows_sort_year_desc_month_desc_name_asc() {
        let salaries = vec![
            salary(1, "Asha", "January", 2024, 1.0, 0.0, 0.0),
            salary(2, "Binod", "December", 2023, 1.0, 0.0, 0.0),
            salary(3, "Chitra", "March", 2024, 1.0, 0.0, 0.0),
            salary(4, "Anil", "March", 2024, 1.0, 0.0, 0.0),
        ];

        let rows = aggregate(&salaries, &[], &[]);
        let order: Vec<&str> = rows.iter().map(|r| r.employee_name.as_str()).collect();
        assert_eq!(order, vec!["Anil", "Chitra", "Asha", "Binod"]);
    }

    #[test]
    fn duplicate_salary_keys_accumulate() {
        let salaries = vec![
            salary(1, "Asha", "March", 2024, 10000.0, 0.0, 0.0),
            salary(1, "Asha", "march", 2024, 5000.0, 0.0, 0.0),
        ];

        let rows = aggregate(&salaries, &[], &[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].basic_salary, 15000.0);
    }
}
