use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::core::error::HrError;
use crate::core::ledger::LeaveBalance;
use crate::model::employee::Employee;
use crate::utils::db_utils::{build_update_sql, execute_update};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub email: String,
    #[schema(example = "+8801712345678")]
    pub phone: Option<String>,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub hire_date: chrono::NaiveDate,
    /// Opening leave balances. Categories left out start at zero.
    #[serde(flatten)]
    #[schema(inline)]
    pub balance: Option<LeaveBalance>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Columns the generic update path may touch. Everything else,
/// notably request status columns, is rejected up front. The balance
/// columns are here on purpose: direct ledger edits are an admin tool.
/// Filters on the employee list are all string-valued (status equality and
/// the LIKE search patterns), so the binds are plain owned strings.
fn filter_clause(query: &EmployeeQuery) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        bindings.push(status.clone());
    }
    if let Some(search) = &query.search {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)");
        let like = format!("%{search}%");
        bindings.push(like.clone());
        bindings.push(like.clone());
        bindings.push(like);
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (where_clause, bindings)
}

const UPDATABLE: &[&str] = &[
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "phone",
    "status",
    "hire_date",
    "el",
    "sl",
    "cl",
    "od",
    "lwp",
    "lhd",
    "others",
];

#[utoipa::path(
    post,
    path = "/api/v1/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "success": true,
            "message": "Employee created"
        })),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "HR/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    if payload.employee_code.trim().is_empty() {
        return Err(HrError::Validation("employee_code is required".to_string()).into());
    }
    if payload.first_name.trim().is_empty() {
        return Err(HrError::Validation("first_name is required".to_string()).into());
    }
    if !payload.email.contains('@') {
        return Err(HrError::Validation("email is not valid".to_string()).into());
    }

    let balance = payload.balance.unwrap_or_default();
    if let Some((category, value)) = balance.negative_category() {
        return Err(HrError::Validation(format!(
            "opening balance for {category} cannot be negative (got {value})"
        ))
        .into());
    }

    sqlx::query(
        r#"
        INSERT INTO employees
            (employee_code, first_name, last_name, email, phone, hire_date, status,
             el, sl, cl, od, lwp, lhd, others)
        VALUES (?, ?, ?, ?, ?, ?, 'active', ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim())
    .bind(payload.phone.as_deref())
    .bind(payload.hire_date)
    .bind(balance.el)
    .bind(balance.sl)
    .bind(balance.cl)
    .bind(balance.od)
    .bind(balance.lwp)
    .bind(balance.lhd)
    .bind(balance.others)
    .execute(pool.get_ref())
    .await
    .map_err(HrError::from)?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Employee created"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn list_employees(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let (where_clause, bindings) = filter_clause(&query);

    let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b.as_str());
    }
    let total = count_query
        .fetch_one(pool.get_ref())
        .await
        .map_err(HrError::from)?;

    let data_sql = format!(
        "SELECT * FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in bindings {
        data_query = data_query.bind(b);
    }
    let employees = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await
        .map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee with current leave balances", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn get_employee(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(path.into_inner())
        .fetch_optional(pool.get_ref())
        .await
        .map_err(HrError::from)?
        .ok_or(HrError::NotFound("employee"))?;

    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Employee updated"),
        (status = 400, description = "Unknown or disallowed column in payload"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    let update = build_update_sql("employees", &body, UPDATABLE, "id", employee_id as i64)?;
    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(HrError::from)?;

    if affected == 0 {
        return Err(HrError::NotFound("employee").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee updated"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deleted"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Employee"
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(HrError::from)?;

    if result.rows_affected() == 0 {
        return Err(HrError::NotFound("employee").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Employee deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_expands_to_like_patterns() {
        let query = EmployeeQuery {
            page: None,
            per_page: None,
            status: Some("active".to_string()),
            search: Some("doe".to_string()),
        };
        let (where_clause, bindings) = filter_clause(&query);

        assert_eq!(
            where_clause,
            "WHERE status = ? AND (first_name LIKE ? OR last_name LIKE ? OR email LIKE ?)"
        );
        // raw strings, one per placeholder
        assert_eq!(bindings, vec!["active", "%doe%", "%doe%", "%doe%"]);
    }

    #[test]
    fn no_filters_means_no_where_clause() {
        let query = EmployeeQuery { page: None, per_page: None, status: None, search: None };
        let (where_clause, bindings) = filter_clause(&query);
        assert!(where_clause.is_empty());
        assert!(bindings.is_empty());
    }
}
