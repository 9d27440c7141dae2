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
use crate::model::ltc::LtcClaim;

const TABLE: &str = "ltc_claims";

#[derive(Deserialize, ToSchema)]
pub struct CreateLtc {
    #[schema(example = 1001)]
    pub employee_id: u64,
    /// Block period the claim belongs to, e.g. "2022-2025"
    #[schema(example = "2022-2025")]
    pub block_period: String,
    #[schema(example = 25000.0)]
    pub amount: f64,
    pub attachment: Option<AttachmentUpload>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LtcFilter {
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

fn filter_clause(query: &LtcFilter) -> (String, Vec<FilterValue<'_>>) {
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

#[utoipa::path(
    post,
    path = "/api/v1/ltc",
    request_body = CreateLtc,
    responses(
        (status = 200, description = "LTC claim submitted", body = Object, example = json!({
            "success": true,
            "message": "LTC claim submitted",
            "status": "pending"
        })),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "LTC"
)]
pub async fn create_ltc(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLtc>,
) -> actix_web::Result<impl Responder> {
    if !(payload.amount > 0.0) {
        return Err(HrError::Validation("amount must be a positive number".to_string()).into());
    }
    if payload.block_period.trim().is_empty() {
        return Err(HrError::Validation("block_period is required".to_string()).into());
    }
    ensure_employee_exists(pool.get_ref(), payload.employee_id).await?;

    let attachment = payload.attachment.as_ref().map(decode_attachment).transpose()?;
    let (bytes, name, mime) = match attachment {
        Some(a) => (Some(a.bytes), Some(a.filename), Some(a.mimetype)),
        None => (None, None, None),
    };

    sqlx::query(
        r#"
        INSERT INTO ltc_claims
            (employee_id, block_period, amount, status, attachment, attachment_name, attachment_mime)
        VALUES (?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.block_period.trim())
    .bind(payload.amount)
    .bind(bytes)
    .bind(name)
    .bind(mime)
    .execute(pool.get_ref())
    .await
    .map_err(HrError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "LTC claim submitted",
        "status": "pending"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/ltc",
    params(LtcFilter),
    responses((status = 200, description = "Paginated LTC claim list", body = Object)),
    security(("bearer_auth" = [])),
    tag = "LTC"
)]
pub async fn list_ltc(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LtcFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let (where_sql, args) = filter_clause(&query);

    let count_sql = format!("SELECT COUNT(*) FROM ltc_claims{where_sql}");
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
        SELECT id, employee_id, block_period, amount, status, voucher_no, remarks,
               approved_by, rejected_by, attachment_name, attachment_mime, created_at
        FROM ltc_claims
        {where_sql}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#
    );
    let mut data_q = sqlx::query_as::<_, LtcClaim>(&data_sql);
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
    path = "/api/v1/ltc/{id}",
    params(("id" = u64, Path, description = "LTC claim ID")),
    responses((status = 200, body = Object), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "LTC"
)]
pub async fn get_ltc(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let row = sqlx::query_as::<_, LtcClaim>(
        r#"
        SELECT id, employee_id, block_period, amount, status, voucher_no, remarks,
               approved_by, rejected_by, attachment_name, attachment_mime, created_at
        FROM ltc_claims
        WHERE id = ?
        "#,
    )
    .bind(path.into_inner())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(HrError::from)?
    .ok_or(HrError::NotFound("LTC claim"))?;

    Ok(HttpResponse::Ok().json(row))
}

#[utoipa::path(
    put,
    path = "/api/v1/ltc/{id}/review",
    params(("id" = u64, Path, description = "LTC claim ID")),
    request_body = ReviewPayload,
    responses(
        (status = 200, description = "Decision applied"),
        (status = 400, description = "Invalid action or already decided"),
        (status = 403, description = "Approval-capable role required"),
        (status = 404, description = "LTC claim not found")
    ),
    security(("bearer_auth" = [])),
    tag = "LTC"
)]
pub async fn review_ltc(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ReviewPayload>,
) -> actix_web::Result<impl Responder> {
    let status = financial::review(
        pool.get_ref(),
        TABLE,
        RequestKind::Ltc,
        path.into_inner(),
        &body.action,
        auth.actor(),
        auth.employee_id,
    )
    .await?;
    Ok(financial::decided_response(status, "LTC claim"))
}

#[utoipa::path(
    put,
    path = "/api/v1/ltc/{id}/voucher",
    params(("id" = u64, Path, description = "LTC claim ID")),
    request_body = VoucherPayload,
    responses((status = 200), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "LTC"
)]
pub async fn annotate_ltc(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<VoucherPayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_reporting_role()?;
    financial::annotate(pool.get_ref(), TABLE, path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "LTC claim annotated"
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/ltc/{id}/attachment",
    params(("id" = u64, Path, description = "LTC claim ID")),
    responses((status = 200, description = "Attachment bytes"), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "LTC"
)]
pub async fn ltc_attachment(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    Ok(financial::fetch_attachment(pool.get_ref(), TABLE, path.into_inner()).await?)
}

#[utoipa::path(
    delete,
    path = "/api/v1/ltc/{id}",
    params(("id" = u64, Path, description = "LTC claim ID")),
    responses((status = 200), (status = 403), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "LTC"
)]
pub async fn delete_ltc(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    financial::delete(pool.get_ref(), TABLE, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "LTC claim deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_binds_a_plain_string() {
        let query = LtcFilter {
            employee_id: None,
            status: Some("approved".to_string()),
            page: None,
            per_page: None,
        };
        let (where_sql, args) = filter_clause(&query);
        assert_eq!(where_sql, " WHERE 1=1 AND status = ?");
        assert_eq!(args, vec![FilterValue::Str("approved")]);
    }

    #[test]
    fn empty_filter_produces_no_binds() {
        let query = LtcFilter { employee_id: None, status: None, page: None, per_page: None };
        let (where_sql, args) = filter_clause(&query);
        assert_eq!(where_sql, " WHERE 1=1");
        assert!(args.is_empty());
    }
}
