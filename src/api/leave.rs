use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{MySql, MySqlPool, Row, Transaction, types::Json};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::core::error::HrError;
use crate::core::ledger::LeaveCategory;
use crate::core::lifecycle::{
    LedgerEffect, RequestKind, RequestStatus, deletion_effect, parse_action, plan_transition,
};
use crate::core::router::{ApprovalPolicy, authorize};
use crate::model::leave::LeaveRequest;
use crate::notify::{ApprovalMail, send_approval_notification};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// One of el, sl, cl, od, lwp, lhd, others (case-insensitive)
    #[schema(example = "el")]
    pub category: String,
    #[schema(example = 3.0)]
    pub days: f64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: chrono::NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: chrono::NaiveDate,
    #[schema(example = "family function")]
    pub reason: Option<String>,
    /// Approver employee ids; a JSON array, or the same array as a JSON
    /// string (legacy clients submit it that way)
    #[schema(example = json!([1001, 1002]))]
    pub applied_to: Value,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// `applied_to` arrives either as a JSON array or as a string holding JSON.
fn parse_id_list(value: &Value) -> Result<Vec<u64>, HrError> {
    let ids: Vec<u64> = match value {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| HrError::Validation(format!("applied_to is not a valid id list: {e}")))?,
        other => serde_json::from_value(other.clone())
            .map_err(|e| HrError::Validation(format!("applied_to is not a valid id list: {e}")))?,
    };

    if ids.is_empty() {
        return Err(HrError::Validation(
            "applied_to must name at least one approver".to_string(),
        ));
    }
    Ok(ids)
}

struct ResolvedApprover {
    email: String,
}

/// Every requested approver id must resolve; partial resolution is an
/// error, not a partial success.
async fn resolve_approvers(
    pool: &MySqlPool,
    ids: &[u64],
) -> Result<Vec<ResolvedApprover>, HrError> {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT id, email FROM employees WHERE id IN ({placeholders})");

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(pool).await?;

    if rows.len() != ids.len() {
        return Err(HrError::ApproverResolutionMismatch {
            requested: ids.len(),
            resolved: rows.len(),
        });
    }

    Ok(rows
        .into_iter()
        .map(|r| ResolvedApprover { email: r.get("email") })
        .collect())
}

/// Apply a signed ledger delta inside the surrounding transaction.
///
/// Deductions are conditional on the *current* stored balance (`col >= days`),
/// not on a balance read at validation time, so a race with a concurrent
/// approval fails here instead of driving the counter negative.
async fn apply_ledger_effect(
    tx: &mut Transaction<'_, MySql>,
    employee_id: u64,
    effect: LedgerEffect,
) -> Result<(), HrError> {
    let LedgerEffect::Adjust { category, days } = effect else {
        return Ok(());
    };
    let col = category.column();

    let affected = if days < 0.0 {
        sqlx::query(&format!(
            "UPDATE employees SET {col} = {col} + ? WHERE id = ? AND {col} >= ?"
        ))
        .bind(days)
        .bind(employee_id)
        .bind(-days)
        .execute(&mut **tx)
        .await?
        .rows_affected()
    } else {
        sqlx::query(&format!("UPDATE employees SET {col} = {col} + ? WHERE id = ?"))
            .bind(days)
            .bind(employee_id)
            .execute(&mut **tx)
            .await?
            .rows_affected()
    };

    if affected == 0 {
        let available: Option<f64> =
            sqlx::query_scalar(&format!("SELECT {col} FROM employees WHERE id = ?"))
                .bind(employee_id)
                .fetch_optional(&mut **tx)
                .await?;

        return match available {
            None => Err(HrError::NotFound("employee")),
            Some(available) => Err(HrError::InsufficientBalance {
                category: category.to_string(),
                available,
                requested: -days,
            }),
        };
    }
    Ok(())
}

async fn load_leave(pool: &MySqlPool, id: u64) -> Result<LeaveRequest, HrError> {
    sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(HrError::NotFound("leave request"))
}

fn stored_status(leave: &LeaveRequest) -> Result<RequestStatus, HrError> {
    leave.status().ok_or_else(|| {
        HrError::Validation(format!("stored status `{}` is not a known status", leave.status))
    })
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "success": true,
            "message": "Leave request submitted",
            "status": "pending"
         })
        ),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;

    // 1. validate payload before touching storage
    let category = LeaveCategory::parse(&payload.category)?;
    if !(payload.days > 0.0) {
        return Err(HrError::Validation("days must be a positive number".to_string()).into());
    }
    if payload.start_date > payload.end_date {
        return Err(
            HrError::Validation("start_date cannot be after end_date".to_string()).into(),
        );
    }
    let applied_to = parse_id_list(&payload.applied_to)?;

    // 2. the whole approver list must resolve
    let approvers = resolve_approvers(pool.get_ref(), &applied_to).await?;

    // 3. submitter must exist; deduction categories need covering balance
    let row = sqlx::query(&format!(
        "SELECT {}, CONCAT(first_name, ' ', last_name) AS name FROM employees WHERE id = ?",
        category.column()
    ))
    .bind(employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(HrError::from)?
    .ok_or(HrError::NotFound("employee"))?;

    let available: f64 = row.get(category.column());
    let employee_name: String = row.get("name");

    if category.is_deduction() && available < payload.days {
        return Err(HrError::InsufficientBalance {
            category: category.to_string(),
            available,
            requested: payload.days,
        }
        .into());
    }

    // 4. persist as pending
    sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, category, days, start_date, end_date, reason, applied_to, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(employee_id)
    .bind(category.to_string())
    .bind(payload.days)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.reason)
    .bind(Json(&applied_to))
    .execute(pool.get_ref())
    .await
    .map_err(HrError::from)?;

    // 5. notify approvers; best-effort, never rolls back the request
    let mail = ApprovalMail {
        employee_name,
        category: category.to_string(),
        days: payload.days,
        start_date: payload.start_date.to_string(),
        end_date: payload.end_date.to_string(),
    };
    let emails: Vec<String> = approvers.into_iter().map(|a| a.email).collect();
    actix_web::rt::spawn(async move {
        if let Err(e) = send_approval_notification(emails, mail).await {
            warn!(error = %e, "approval notification failed");
        }
    });

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Leave request submitted",
        "status": "pending"
    })))
}

/* =========================
Approve / reject leave
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}/review",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to decide")
    ),
    request_body = crate::api::financial::ReviewPayload,
    responses(
        (status = 200, description = "Decision applied", body = Object, example = json!({
            "success": true,
            "message": "Leave approved"
        })),
        (status = 400, description = "Invalid action, already decided, or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller is not on the approver list"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn review_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<crate::api::financial::ReviewPayload>,
) -> actix_web::Result<impl Responder> {
    // action guard runs before any lookup
    let action = parse_action(&body.action)?;

    let leave_id = path.into_inner();
    let leave = load_leave(pool.get_ref(), leave_id).await?;

    // only the approvers named at submission may decide
    authorize(auth.actor(), &ApprovalPolicy::Listed(leave.applied_to.0.clone()))?;

    let current = stored_status(&leave)?;
    let category = LeaveCategory::parse(&leave.category)?;
    let transition = plan_transition(
        RequestKind::Leave,
        current,
        action,
        Some((category, leave.days)),
    )?;

    // status flip and ledger delta commit or fail together
    let mut tx = pool.begin().await.map_err(HrError::from)?;

    let sql = if transition.to == RequestStatus::Approved {
        "UPDATE leave_requests SET status = ?, approved_by = ? WHERE id = ? AND status = ?"
    } else {
        "UPDATE leave_requests SET status = ?, rejected_by = ? WHERE id = ? AND status = ?"
    };
    let affected = sqlx::query(sql)
        .bind(transition.to.to_string())
        .bind(auth.employee_id)
        .bind(leave_id)
        .bind(current.to_string())
        .execute(&mut *tx)
        .await
        .map_err(HrError::from)?
        .rows_affected();

    if affected == 0 {
        tx.rollback().await.map_err(HrError::from)?;
        return Err(HrError::InvalidAction(
            "request was decided concurrently, reload and retry".to_string(),
        )
        .into());
    }

    if let Err(e) = apply_ledger_effect(&mut tx, leave.employee_id, transition.effect).await {
        tx.rollback().await.map_err(HrError::from)?;
        return Err(e.into());
    }

    tx.commit().await.map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("Leave {}", transition.to)
    })))
}

/* =========================
Delete leave (Admin)
========================= */
#[utoipa::path(
    delete,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to delete")
    ),
    responses(
        (status = 200, description = "Deleted; an approved request's ledger effect is reversed", body = Object, example = json!({
            "success": true,
            "message": "Leave request deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn delete_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let leave_id = path.into_inner();
    let leave = load_leave(pool.get_ref(), leave_id).await?;

    let current = stored_status(&leave)?;
    let category = LeaveCategory::parse(&leave.category)?;
    let effect = deletion_effect(RequestKind::Leave, current, Some((category, leave.days)));

    let mut tx = pool.begin().await.map_err(HrError::from)?;

    if let Err(e) = apply_ledger_effect(&mut tx, leave.employee_id, effect).await {
        tx.rollback().await.map_err(HrError::from)?;
        return Err(e.into());
    }

    let affected = sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(leave_id)
        .execute(&mut *tx)
        .await
        .map_err(HrError::from)?
        .rows_affected();

    if affected == 0 {
        tx.rollback().await.map_err(HrError::from)?;
        return Err(HrError::NotFound("leave request").into());
    }

    tx.commit().await.map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Leave request deleted"
    })))
}

/* =========================
Read endpoints
========================= */
#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave = load_leave(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(emp_id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q
        .fetch_one(pool.get_ref())
        .await
        .map_err(HrError::from)?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT *
        FROM leave_requests
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "data": leaves,
        "page": page,
        "per_page": per_page,
        "total": total
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_accepts_array_and_json_string() {
        assert_eq!(parse_id_list(&json!([1, 2, 3])).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list(&json!("[7, 8]")).unwrap(), vec![7, 8]);
    }

    #[test]
    fn id_list_rejects_garbage_and_empty() {
        assert!(parse_id_list(&json!([])).is_err());
        assert!(parse_id_list(&json!("[]")).is_err());
        assert!(parse_id_list(&json!("not json")).is_err());
        assert!(parse_id_list(&json!({"a": 1})).is_err());
        assert!(parse_id_list(&json!([1, "x"])).is_err());
    }
}
