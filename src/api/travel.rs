use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::{MySqlPool, types::Json};
use utoipa::{IntoParams, ToSchema};

use crate::api::financial::{
    self, AttachmentUpload, ReviewPayload, VoucherPayload, decode_attachment,
    ensure_employee_exists,
};
use crate::auth::auth::AuthUser;
use crate::core::ctc::LineItem;
use crate::core::error::HrError;
use crate::core::lifecycle::RequestKind;
use crate::model::travel::TravelExpenditure;

const TABLE: &str = "travel_expenditures";

#[derive(Deserialize, ToSchema)]
pub struct CreateTravel {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "client site visit")]
    pub purpose: String,
    #[schema(example = "2024-03-04", format = "date", value_type = String)]
    pub from_date: chrono::NaiveDate,
    #[schema(example = "2024-03-06", format = "date", value_type = String)]
    pub to_date: chrono::NaiveDate,
    /// Expense line items; a JSON array of {label, amount}, or the same
    /// array as a JSON string
    #[schema(example = json!([{"label": "taxi", "amount": 450.0}]))]
    pub expenses: Value,
    pub attachment: Option<AttachmentUpload>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct TravelFilter {
    pub employee_id: Option<u64>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

// Helper enum for typed SQLx binding
#[derive(Debug, PartialEq)]
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

fn filter_clause(query: &TravelFilter) -> (String, Vec<FilterValue<'_>>) {
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

    (where_sql, args)
}

/// Expense lines arrive either as a JSON array or a string holding JSON.
fn parse_expenses(value: &Value) -> Result<Vec<LineItem>, HrError> {
    let items: Vec<LineItem> = match value {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| HrError::Validation(format!("expenses is not a valid line-item list: {e}")))?,
        other => serde_json::from_value(other.clone())
            .map_err(|e| HrError::Validation(format!("expenses is not a valid line-item list: {e}")))?,
    };

    if items.is_empty() {
        return Err(HrError::Validation(
            "expenses must contain at least one line item".to_string(),
        ));
    }
    if let Some(bad) = items.iter().find(|i| !(i.amount > 0.0)) {
        return Err(HrError::Validation(format!(
            "expense line `{}` must have a positive amount",
            bad.label
        )));
    }
    Ok(items)
}

#[utoipa::path(
    post,
    path = "/api/v1/travel",
    request_body = CreateTravel,
    responses(
        (status = 200, description = "Travel expenditure submitted", body = Object, example = json!({
            "success": true,
            "message": "Travel expenditure submitted",
            "status": "pending"
        })),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn create_travel(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateTravel>,
) -> actix_web::Result<impl Responder> {
    if payload.from_date > payload.to_date {
        return Err(HrError::Validation("from_date cannot be after to_date".to_string()).into());
    }
    let expenses = parse_expenses(&payload.expenses)?;
    let total: f64 = expenses.iter().map(|i| i.amount).sum();

    ensure_employee_exists(pool.get_ref(), payload.employee_id).await?;

    let attachment = payload.attachment.as_ref().map(decode_attachment).transpose()?;
    let (bytes, name, mime) = match attachment {
        Some(a) => (Some(a.bytes), Some(a.filename), Some(a.mimetype)),
        None => (None, None, None),
    };

    sqlx::query(
        r#"
        INSERT INTO travel_expenditures
            (employee_id, purpose, from_date, to_date, expenses, amount,
             status, attachment, attachment_name, attachment_mime)
        VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.purpose.trim())
    .bind(payload.from_date)
    .bind(payload.to_date)
    .bind(Json(&expenses))
    .bind(total)
    .bind(bytes)
    .bind(name)
    .bind(mime)
    .execute(pool.get_ref())
    .await
    .map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Travel expenditure submitted",
        "status": "pending"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/travel",
    params(TravelFilter),
    responses((status = 200, description = "Paginated travel expenditure list", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn list_travel(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TravelFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let (where_sql, args) = filter_clause(&query);

    let count_sql = format!("SELECT COUNT(*) FROM travel_expenditures{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(HrError::from)?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, purpose, from_date, to_date, expenses, amount,
               status, voucher_no, remarks, approved_by, rejected_by,
               attachment_name, attachment_mime, created_at
        FROM travel_expenditures
        {where_sql}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut data_q = sqlx::query_as::<_, TravelExpenditure>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
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

#[utoipa::path(
    get,
    path = "/api/v1/travel/{id}",
    params(("id" = u64, Path, description = "Travel expenditure ID")),
    responses((status = 200, body = Object), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn get_travel(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let row = sqlx::query_as::<_, TravelExpenditure>(
        r#"
        SELECT id, employee_id, purpose, from_date, to_date, expenses, amount,
               status, voucher_no, remarks, approved_by, rejected_by,
               attachment_name, attachment_mime, created_at
        FROM travel_expenditures
        WHERE id = ?
        "#,
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(HrError::from)?
    .ok_or(HrError::NotFound("travel expenditure"))?;

    Ok(HttpResponse::Ok().json(row))
}

#[utoipa::path(
    put,
    path = "/api/v1/travel/{id}/review",
    params(("id" = u64, Path, description = "Travel expenditure ID")),
    request_body = ReviewPayload,
    responses(
        (status = 200, description = "Decision applied"),
        (status = 400, description = "Invalid action or already decided"),
        (status = 403, description = "Approval-capable role required"),
        (status = 404, description = "Travel expenditure not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn review_travel(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewPayload>,
) -> actix_web::Result<impl Responder> {
    let status = financial::review(
        pool.get_ref(),
        TABLE,
        RequestKind::TravelExpenditure,
        path.into_inner(),
        &body.action,
        auth.actor(),
        auth.employee_id,
    )
    .await?;
    Ok(financial::decided_response(status, "Travel expenditure"))
}

#[utoipa::path(
    put,
    path = "/api/v1/travel/{id}/voucher",
    params(("id" = u64, Path, description = "Travel expenditure ID")),
    request_body = VoucherPayload,
    responses((status = 200), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn annotate_travel(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<VoucherPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_reporting_role()?;
    financial::annotate(pool.get_ref(), TABLE, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Travel expenditure annotated"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/travel/{id}/attachment",
    params(("id" = u64, Path, description = "Travel expenditure ID")),
    responses((status = 200, description = "Attachment bytes"), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn travel_attachment(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(financial::fetch_attachment(pool.get_ref(), TABLE, path.into_inner()).await?)
}

#[utoipa::path(
    delete,
    path = "/api/v1/travel/{id}",
    params(("id" = u64, Path, description = "Travel expenditure ID")),
    responses((status = 200), (status = 403), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Travel"
)]
pub async fn delete_travel(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    financial::delete(pool.get_ref(), TABLE, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Travel expenditure deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expenses_accept_array_and_json_string() {
        let items = parse_expenses(&json!([{"label": "taxi", "amount": 450.0}])).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "taxi");

        let items =
            parse_expenses(&json!("[{\"label\": \"hotel\", \"amount\": 3200.0}]")).unwrap();
        assert_eq!(items[0].amount, 3200.0);
    }

    #[test]
    fn expenses_reject_empty_garbage_and_nonpositive() {
        assert!(parse_expenses(&json!([])).is_err());
        assert!(parse_expenses(&json!("nope")).is_err());
        assert!(parse_expenses(&json!([{"label": "taxi"}])).is_err());
        assert!(parse_expenses(&json!([{"label": "taxi", "amount": -1.0}])).is_err());
        assert!(parse_expenses(&json!([{"label": "taxi", "amount": 0.0}])).is_err());
    }

    #[test]
    fn status_filter_binds_a_plain_string() {
        let query = TravelFilter {
            employee_id: Some(9),
            status: Some("pending".to_string()),
            page: None,
            per_page: None,
        };
        let (where_sql, args) = filter_clause(&query);
        assert_eq!(where_sql, " WHERE 1=1 AND employee_id = ? AND status = ?");
        assert_eq!(args, vec![FilterValue::U64(9), FilterValue::Str("pending")]);
    }
}
