//! Variable (`allowances`) and fixed (`fixed_allowances`) allowance
//! endpoints. Identical shape and lifecycle; only the table differs, so
//! each handler pair delegates to one implementation.

use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::financial::{
    self, AttachmentUpload, ReviewPayload, VoucherPayload, decode_attachment,
    ensure_employee_exists,
};
use crate::auth::auth::AuthUser;
use crate::core::error::HrError;
use crate::core::lifecycle::RequestKind;
use crate::model::allowance::Allowance;

const VARIABLE: &str = "allowances";
const FIXED: &str = "fixed_allowances";

#[derive(Deserialize, ToSchema)]
pub struct CreateAllowance {
    #[schema(example = 1001)]
    pub employee_id: u64,
    #[schema(example = "Acme Corp")]
    pub client: String,
    #[schema(example = "PRJ-17")]
    pub project_no: String,
    #[schema(example = "March")]
    pub month: String,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(example = "mobile")]
    pub allowance_type: String,
    #[schema(example = 500.0)]
    pub amount: f64,
    pub attachment: Option<AttachmentUpload>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AllowanceFilter {
    pub employee_id: Option<u64>,
    pub status: Option<String>,
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

fn filter_clause(query: &AllowanceFilter) -> (String, Vec<FilterValue<'_>>) {
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

/// Allowance types are matched case-insensitively: "Mobile" and "mobile"
/// must land on the same composite key.
fn canonical_allowance_type(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn upsert_sql(table: &str) -> String {
    format!(
        r#"
        INSERT INTO {table}
            (employee_id, client, project_no, month, year, allowance_type, amount,
             status, attachment, attachment_name, attachment_mime)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            amount = amount + VALUES(amount),
            attachment = COALESCE(VALUES(attachment), attachment),
            attachment_name = COALESCE(VALUES(attachment_name), attachment_name),
            attachment_mime = COALESCE(VALUES(attachment_mime), attachment_mime)
        "#
    )
}

/// A second submission matching the same (employee, client, project, month,
/// year, type) tuple increments the stored amount and replaces the
/// attachment when a new one rides along. Explicit upsert policy, not an
/// error; the UNIQUE KEY on the table makes the merge atomic.
async fn upsert(
    pool: &MySqlPool,
    table: &'static str,
    payload: &CreateAllowance,
) -> Result<(), HrError> {
    if !(payload.amount > 0.0) {
        return Err(HrError::Validation("amount must be a positive number".to_string()));
    }
    if payload.month.trim().is_empty() {
        return Err(HrError::Validation("month is required".to_string()));
    }
    ensure_employee_exists(pool, payload.employee_id).await?;

    let attachment = payload.attachment.as_ref().map(decode_attachment).transpose()?;
    let (bytes, name, mime) = match attachment {
        Some(a) => (Some(a.bytes), Some(a.filename), Some(a.mimetype)),
        None => (None, None, None),
    };

    let sql = upsert_sql(table);

    sqlx::query(&sql)
        .bind(payload.employee_id)
        .bind(payload.client.trim())
        .bind(payload.project_no.trim())
        .bind(payload.month.trim())
        .bind(payload.year)
        .bind(canonical_allowance_type(&payload.allowance_type))
        .bind(payload.amount)
        .bind(bytes)
        .bind(name)
        .bind(mime)
        .execute(pool)
        .await?;

    Ok(())
}

async fn list(
    pool: &MySqlPool,
    table: &'static str,
    query: &AllowanceFilter,
) -> Result<HttpResponse, HrError> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let (where_sql, args) = filter_clause(query);

    let count_sql = format!("SELECT COUNT(*) FROM {table}{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::I32(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }
    let total = count_q.fetch_one(pool).await?;

    let data_sql = format!(
        r#"
        SELECT id, employee_id, client, project_no, month, year, allowance_type,
               amount, status, voucher_no, remarks, approved_by, rejected_by,
               attachment_name, attachment_mime, created_at
        FROM {table}
        {where_sql}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut data_q = sqlx::query_as::<_, Allowance>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::I32(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }
    let data = data_q.bind(per_page).bind(offset).fetch_all(pool).await?;

    Ok(HttpResponse::Ok().json(json!({
        "data": data,
        "page": page,
        "per_page": per_page,
        "total": total
    })))
}

async fn get_one(
    pool: &MySqlPool,
    table: &'static str,
    id: u64,
) -> Result<HttpResponse, HrError> {
    let sql = format!(
        r#"
        SELECT id, employee_id, client, project_no, month, year, allowance_type,
               amount, status, voucher_no, remarks, approved_by, rejected_by,
               attachment_name, attachment_mime, created_at
        FROM {table}
        WHERE id = ?
        "#
    );
    let row = sqlx::query_as::<_, Allowance>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(HrError::NotFound("request"))?;

    Ok(HttpResponse::Ok().json(row))
}

/* =========================
Variable allowances
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/allowances",
    request_body = CreateAllowance,
    responses(
        (status = 200, description = "Created, or merged into the matching record", body = Object, example = json!({
            "success": true,
            "message": "Allowance request recorded"
        })),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn create_allowance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAllowance>,
) -> actix_web::Result<impl Responder> {
    upsert(pool.get_ref(), VARIABLE, &payload).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Allowance request recorded"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/allowances",
    params(AllowanceFilter),
    responses((status = 200, description = "Paginated allowance list", body = Object)),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn list_allowances(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AllowanceFilter>,
) -> actix_web::Result<impl Responder> {
    Ok(list(pool.get_ref(), VARIABLE, &query).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/allowances/{id}",
    params(("id" = u64, Path, description = "Allowance ID")),
    responses((status = 200, body = Object), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn get_allowance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(get_one(pool.get_ref(), VARIABLE, path.into_inner()).await?)
}

#[utoipa::path(
    put,
    path = "/api/v1/allowances/{id}/review",
    params(("id" = u64, Path, description = "Allowance ID")),
    request_body = ReviewPayload,
    responses(
        (status = 200, description = "Decision applied"),
        (status = 400, description = "Invalid action or already decided"),
        (status = 403, description = "Approval-capable role required"),
        (status = 404, description = "Allowance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn review_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewPayload>,
) -> actix_web::Result<impl Responder> {
    let status = financial::review(
        pool.get_ref(),
        VARIABLE,
        RequestKind::Allowance,
        path.into_inner(),
        &body.action,
        auth.actor(),
        auth.employee_id,
    )
    .await?;
    Ok(financial::decided_response(status, "Allowance"))
}

#[utoipa::path(
    put,
    path = "/api/v1/allowances/{id}/voucher",
    params(("id" = u64, Path, description = "Allowance ID")),
    request_body = VoucherPayload,
    responses((status = 200), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn annotate_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<VoucherPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_reporting_role()?;
    financial::annotate(pool.get_ref(), VARIABLE, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Allowance annotated"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/allowances/{id}/attachment",
    params(("id" = u64, Path, description = "Allowance ID")),
    responses((status = 200, description = "Attachment bytes"), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn allowance_attachment(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(financial::fetch_attachment(pool.get_ref(), VARIABLE, path.into_inner()).await?)
}

#[utoipa::path(
    delete,
    path = "/api/v1/allowances/{id}",
    params(("id" = u64, Path, description = "Allowance ID")),
    responses((status = 200), (status = 403), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Allowance"
)]
pub async fn delete_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    financial::delete(pool.get_ref(), VARIABLE, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Allowance deleted"
    })))
}

/* =========================
Fixed allowances
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/fixed-allowances",
    request_body = CreateAllowance,
    responses(
        (status = 200, description = "Created, or merged into the matching record", body = Object),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "FixedAllowance"
)]
pub async fn create_fixed_allowance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAllowance>,
) -> actix_web::Result<impl Responder> {
    upsert(pool.get_ref(), FIXED, &payload).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Fixed allowance request recorded"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/fixed-allowances",
    params(AllowanceFilter),
    responses((status = 200, description = "Paginated fixed allowance list", body = Object)),
    security(("bearer_auth" = [])),
    tag = "FixedAllowance"
)]
pub async fn list_fixed_allowances(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AllowanceFilter>,
) -> actix_web::Result<impl Responder> {
    Ok(list(pool.get_ref(), FIXED, &query).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/fixed-allowances/{id}",
    params(("id" = u64, Path, description = "Fixed allowance ID")),
    responses((status = 200, body = Object), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "FixedAllowance"
)]
pub async fn get_fixed_allowance(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(get_one(pool.get_ref(), FIXED, path.into_inner()).await?)
}

#[utoipa::path(
    put,
    path = "/api/v1/fixed-allowances/{id}/review",
    params(("id" = u64, Path, description = "Fixed allowance ID")),
    request_body = ReviewPayload,
    responses(
        (status = 200, description = "Decision applied"),
        (status = 400, description = "Invalid action or already decided"),
        (status = 403, description = "Approval-capable role required"),
        (status = 404, description = "Fixed allowance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "FixedAllowance"
)]
pub async fn review_fixed_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewPayload>,
) -> actix_web::Result<impl Responder> {
    let status = financial::review(
        pool.get_ref(),
        FIXED,
        RequestKind::FixedAllowance,
        path.into_inner(),
        &body.action,
        auth.actor(),
        auth.employee_id,
    )
    .await?;
    Ok(financial::decided_response(status, "Fixed allowance"))
}

#[utoipa::path(
    put,
    path = "/api/v1/fixed-allowances/{id}/voucher",
    params(("id" = u64, Path, description = "Fixed allowance ID")),
    request_body = VoucherPayload,
    responses((status = 200), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "FixedAllowance"
)]
pub async fn annotate_fixed_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<VoucherPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_reporting_role()?;
    financial::annotate(pool.get_ref(), FIXED, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Fixed allowance annotated"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/fixed-allowances/{id}/attachment",
    params(("id" = u64, Path, description = "Fixed allowance ID")),
    responses((status = 200, description = "Attachment bytes"), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "FixedAllowance"
)]
pub async fn fixed_allowance_attachment(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(financial::fetch_attachment(pool.get_ref(), FIXED, path.into_inner()).await?)
}

#[utoipa::path(
    delete,
    path = "/api/v1/fixed-allowances/{id}",
    params(("id" = u64, Path, description = "Fixed allowance ID")),
    responses((status = 200), (status = 403), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "FixedAllowance"
)]
pub async fn delete_fixed_allowance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    financial::delete(pool.get_ref(), FIXED, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Fixed allowance deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(
        employee_id: Option<u64>,
        status: Option<&str>,
        month: Option<&str>,
        year: Option<i32>,
    ) -> AllowanceFilter {
        AllowanceFilter {
            employee_id,
            status: status.map(str::to_string),
            month: month.map(str::to_string),
            year,
            page: None,
            per_page: None,
        }
    }

    #[test]
    fn filters_bind_as_plain_sql_values() {
        let query = filter(Some(7), Some("pending"), Some("March"), Some(2024));
        let (where_sql, args) = filter_clause(&query);

        assert_eq!(
            where_sql,
            " WHERE 1=1 AND employee_id = ? AND status = ? AND month = ? AND year = ?"
        );
        // strings stay strings: `status = ?` must receive `pending`,
        // never a JSON-encoded `"pending"`
        assert_eq!(
            args,
            vec![
                FilterValue::U64(7),
                FilterValue::Str("pending"),
                FilterValue::Str("March"),
                FilterValue::I32(2024),
            ]
        );
    }

    #[test]
    fn empty_filter_produces_no_binds() {
        let query = filter(None, None, None, None);
        let (where_sql, args) = filter_clause(&query);
        assert_eq!(where_sql, " WHERE 1=1");
        assert!(args.is_empty());
    }

    #[test]
    fn allowance_type_is_normalized_onto_one_key() {
        assert_eq!(canonical_allowance_type("Mobile"), "mobile");
        assert_eq!(canonical_allowance_type("  MOBILE  "), "mobile");
        assert_eq!(canonical_allowance_type("mobile"), "mobile");
    }

    #[test]
    fn duplicate_key_merges_amount_and_keeps_old_attachment() {
        let sql = upsert_sql(VARIABLE);

        assert!(sql.contains("INSERT INTO allowances"));
        assert!(sql.contains("ON DUPLICATE KEY UPDATE"));
        // resubmission accumulates, never overwrites
        assert!(sql.contains("amount = amount + VALUES(amount)"));
        // a resubmission without an attachment keeps the stored one
        assert!(sql.contains("attachment = COALESCE(VALUES(attachment), attachment)"));
        assert!(sql.contains("attachment_name = COALESCE(VALUES(attachment_name), attachment_name)"));

        assert!(upsert_sql(FIXED).contains("INSERT INTO fixed_allowances"));
    }
}
