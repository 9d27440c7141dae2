//! Cost-to-Company reporting. The aggregate is computed fresh on every
//! request from three read-only queries; nothing is persisted or cached.

use actix_web::{HttpResponse, Responder, web};
use futures::try_join;
use serde::Deserialize;
use sqlx::{MySqlPool, types::Json};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::core::ctc::{AllowanceRow, CtcRow, LineItem, SalaryRow, aggregate};
use crate::core::error::HrError;
use crate::core::lifecycle::RequestStatus;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    #[schema(example = "March")]
    pub month: String,
    #[schema(example = 2024)]
    pub year: i32,
}

#[derive(sqlx::FromRow)]
struct SalarySql {
    employee_id: u64,
    employee_name: String,
    month: String,
    year: i32,
    basic_salary: f64,
    allowances: Json<Vec<LineItem>>,
    deductions: Json<Vec<LineItem>>,
}

#[derive(sqlx::FromRow)]
struct AllowanceSql {
    employee_id: u64,
    employee_name: String,
    month: String,
    year: i32,
    amount: f64,
    status: String,
}

impl From<SalarySql> for SalaryRow {
    fn from(r: SalarySql) -> Self {
        SalaryRow {
            employee_id: r.employee_id,
            employee_name: r.employee_name,
            month: r.month,
            year: r.year,
            basic_salary: r.basic_salary,
            allowances: r.allowances.0,
            deductions: r.deductions.0,
        }
    }
}

impl From<AllowanceSql> for AllowanceRow {
    fn from(r: AllowanceSql) -> Self {
        AllowanceRow {
            employee_id: r.employee_id,
            employee_name: r.employee_name,
            month: r.month,
            year: r.year,
            amount: r.amount,
            // rows reach here pre-filtered to approved; the fold filters
            // again, so an unparseable status just drops the row
            status: r.status.parse().unwrap_or(RequestStatus::Pending),
        }
    }
}

enum Scope<'a> {
    Month { month: &'a str, year: i32 },
    Employee(u64),
}

fn scoped(sql_base: &str, scope: &Scope<'_>, qualifier: &str) -> String {
    match scope {
        Scope::Month { .. } => {
            format!("{sql_base} AND {qualifier}.month = ? AND {qualifier}.year = ?")
        }
        Scope::Employee(_) => format!("{sql_base} AND {qualifier}.employee_id = ?"),
    }
}

fn bind_scope<'q, O>(
    query: sqlx::query::QueryAs<'q, sqlx::MySql, O, sqlx::mysql::MySqlArguments>,
    scope: &Scope<'_>,
) -> sqlx::query::QueryAs<'q, sqlx::MySql, O, sqlx::mysql::MySqlArguments> {
    match scope {
        Scope::Month { month, year } => query.bind(month.to_string()).bind(*year),
        Scope::Employee(id) => query.bind(*id),
    }
}

async fn fetch_rows(pool: &MySqlPool, scope: &Scope<'_>) -> Result<Vec<CtcRow>, HrError> {
    let salary_sql = scoped(
        r#"
        SELECT s.employee_id, CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
               s.month, s.year, s.basic_salary, s.allowances, s.deductions
        FROM salaries s
        JOIN employees e ON e.id = s.employee_id
        WHERE 1=1"#,
        scope,
        "s",
    );
    let variable_sql = scoped(
        r#"
        SELECT a.employee_id, CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
               a.month, a.year, a.amount, a.status
        FROM allowances a
        JOIN employees e ON e.id = a.employee_id
        WHERE a.status = 'approved'"#,
        scope,
        "a",
    );
    let fixed_sql = scoped(
        r#"
        SELECT a.employee_id, CONCAT(e.first_name, ' ', e.last_name) AS employee_name,
               a.month, a.year, a.amount, a.status
        FROM fixed_allowances a
        JOIN employees e ON e.id = a.employee_id
        WHERE a.status = 'approved'"#,
        scope,
        "a",
    );

    // three independent reads; summation makes their order irrelevant
    let (salaries, variable, fixed) = try_join!(
        bind_scope(sqlx::query_as::<_, SalarySql>(&salary_sql), scope).fetch_all(pool),
        bind_scope(sqlx::query_as::<_, AllowanceSql>(&variable_sql), scope).fetch_all(pool),
        bind_scope(sqlx::query_as::<_, AllowanceSql>(&fixed_sql), scope).fetch_all(pool),
    )?;

    let salaries: Vec<SalaryRow> = salaries.into_iter().map(Into::into).collect();
    let variable: Vec<AllowanceRow> = variable.into_iter().map(Into::into).collect();
    let fixed: Vec<AllowanceRow> = fixed.into_iter().map(Into::into).collect();

    Ok(aggregate(&salaries, &variable, &fixed))
}

#[utoipa::path(
    get,
    path = "/api/v1/ctc/month",
    params(MonthQuery),
    responses(
        (status = 200, description = "One CTC row per employee for the month", body = [CtcRow]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin/HR/Accounts only")
    ),
    security(("bearer_auth" = [])),
    tag = "CTC"
)]
pub async fn month_wise_ctc(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MonthQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_reporting_role()?;

    if query.month.trim().is_empty() {
        return Err(HrError::Validation("month is required".to_string()).into());
    }

    let scope = Scope::Month {
        month: query.month.trim(),
        year: query.year,
    };
    let rows = fetch_rows(pool.get_ref(), &scope).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/ctc/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "CTC rows for the employee across all recorded months", body = [CtcRow]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin/HR/Accounts only")
    ),
    security(("bearer_auth" = [])),
    tag = "CTC"
)]
pub async fn employee_wise_ctc(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_reporting_role()?;

    let scope = Scope::Employee(path.into_inner());
    let rows = fetch_rows(pool.get_ref(), &scope).await?;
    Ok(HttpResponse::Ok().json(rows))
}
