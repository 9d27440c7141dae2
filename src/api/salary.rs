use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{MySqlPool, types::Json};
use utoipa::{IntoParams, ToSchema};

use crate::api::financial::ensure_employee_exists;
use crate::auth::auth::AuthUser;
use crate::core::ctc::LineItem;
use crate::core::error::HrError;
use crate::model::salary::Salary;

#[derive(Deserialize, ToSchema)]
pub struct CreateSalary {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "March")]
    pub month: String,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = 30000.0)]
    pub basic_salary: f64,
    /// Salary-embedded allowance lines, array of {label, amount}
    #[schema(example = json!([{"label": "hra", "amount": 2000.0}]))]
    pub allowances: Option<Value>,
    /// Salary-embedded deduction lines, array of {label, amount}
    #[schema(example = json!([{"label": "pf", "amount": 500.0}]))]
    pub deductions: Option<Value>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SalaryFilter {
    pub employee_id: Option<u64>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
#[derive(Debug, PartialEq)]
enum FilterValue<'a> {
    U64(u64),
    I32(i32),
    Str(&'a str),
}

fn filter_clause(query: &SalaryFilter) -> (String, Vec<FilterValue<'_>>) {
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }
    if let Some(month) = query.month.as_deref() {
        where_sql.push_str(" AND month = ?");
        args.push(FilterValue::Str(month));
    }
    if let Some(year) = query.year {
        where_sql.push_str(" AND year = ?");
        args.push(FilterValue::I32(year));
    }

    (where_sql, args)
}

fn parse_line_items(value: Option<&Value>, field: &str) -> Result<Vec<LineItem>, HrError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| HrError::Validation(format!("{field} is not a valid line-item list: {e}"))),
        other => serde_json::from_value(other.clone())
            .map_err(|e| HrError::Validation(format!("{field} is not a valid line-item list: {e}"))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/salaries",
    request_body = CreateSalary,
    responses(
        (status = 201, description = "Salary record created"),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn create_salary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSalary>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.basic_salary < 0.0 {
        return Err(HrError::Validation("basic_salary cannot be negative".to_string()).into());
    }
    if payload.month.trim().is_empty() {
        return Err(HrError::Validation("month is required".to_string()).into());
    }
    let allowances = parse_line_items(payload.allowances.as_ref(), "allowances")?;
    let deductions = parse_line_items(payload.deductions.as_ref(), "deductions")?;

    ensure_employee_exists(pool.get_ref(), payload.employee_id).await?;

    sqlx::query(
        r#"
        INSERT INTO salaries (employee_id, month, year, basic_salary, allowances, deductions)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.month.trim())
    .bind(payload.year)
    .bind(payload.basic_salary)
    .bind(Json(&allowances))
    .bind(Json(&deductions))
    .execute(pool.get_ref())
    .await
    .map_err(HrError::from)?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Salary record created"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/salaries",
    params(SalaryFilter),
    responses((status = 200, description = "Paginated salary list", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Salary"
)]
pub async fn list_salaries(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SalaryFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_reporting_role()?;

    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let (where_sql, args) = filter_clause(&query);

    let count_sql = format!("SELECT COUNT(*) FROM salaries{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::I32(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(HrError::from)?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, month, year, basic_salary, allowances, deductions, created_at
        FROM salaries
        {where_sql}
        ORDER BY year DESC, id DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut data_q = sqlx::query_as::<_, Salary>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::I32(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }
    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "data": data,
        "page": page,
        "per_page": per_page,
        "total": total
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_items_default_to_empty() {
        assert!(parse_line_items(None, "allowances").unwrap().is_empty());
        assert!(parse_line_items(Some(&Value::Null), "allowances").unwrap().is_empty());
    }

    #[test]
    fn line_items_parse_array_and_string_forms() {
        let items =
            parse_line_items(Some(&json!([{"label": "hra", "amount": 2000.0}])), "allowances")
                .unwrap();
        assert_eq!(items[0].amount, 2000.0);

        let items = parse_line_items(
            Some(&json!("[{\"label\": \"pf\", \"amount\": 500.0}]")),
            "deductions",
        )
        .unwrap();
        assert_eq!(items[0].label, "pf");
    }

    #[test]
    fn malformed_line_items_are_validation_errors() {
        let err = parse_line_items(Some(&json!("{broken")), "allowances").unwrap_err();
        assert!(matches!(err, HrError::Validation(_)));
    }

    #[test]
    fn month_filter_binds_a_plain_string() {
        let query = SalaryFilter {
            employee_id: Some(3),
            month: Some("March".to_string()),
            year: Some(2024),
            page: None,
            per_page: None,
        };
        let (where_sql, args) = filter_clause(&query);
        assert_eq!(
            where_sql,
            " WHERE 1=1 AND employee_id = ? AND month = ? AND year = ?"
        );
        assert_eq!(
            args,
            vec![FilterValue::U64(3), FilterValue::Str("March"), FilterValue::I32(2024)]
        );
    }
}
