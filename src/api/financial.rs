//! Shared plumbing for the four financial request kinds (Allowance,
//! FixedAllowance, TravelExpenditure, LTC). They run the same lifecycle:
//! pending -> approved/rejected, decided by any approval-capable role, no
//! ledger effect, annotatable with voucher/remarks afterwards. Table names
//! are fixed `&'static str` passed by the kind modules, never user input.

use actix_web::HttpResponse;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use sqlx::{MySqlPool, Row};
use tracing::info;
use utoipa::ToSchema;

use crate::core::error::HrError;
use crate::core::lifecycle::{
    ApprovalAction, RequestKind, RequestStatus, parse_action, plan_transition,
};
use crate::core::router::{Actor, ApprovalPolicy, authorize};

#[derive(Deserialize, ToSchema)]
pub struct ReviewPayload {
    /// `approved` or `rejected`
    #[schema(example = "approved")]
    pub action: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VoucherPayload {
    #[schema(example = "V-2024-0042")]
    pub voucher_no: Option<String>,
    #[schema(example = "paid via bank transfer")]
    pub remarks: Option<String>,
}

/// Attachment as submitted: base64 payload plus metadata. Owned by the
/// request row; replaced only by resubmission.
#[derive(Deserialize, ToSchema)]
pub struct AttachmentUpload {
    #[schema(example = "bill.pdf")]
    pub filename: String,
    #[schema(example = "application/pdf")]
    pub mimetype: String,
    /// base64-encoded file content
    pub data: String,
}

pub struct Attachment {
    pub filename: String,
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

pub fn decode_attachment(upload: &AttachmentUpload) -> Result<Attachment, HrError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(upload.data.as_bytes())
        .map_err(|e| HrError::Validation(format!("attachment is not valid base64: {e}")))?;

    Ok(Attachment {
        filename: upload.filename.clone(),
        mimetype: upload.mimetype.clone(),
        bytes,
    })
}

pub async fn ensure_employee_exists(pool: &MySqlPool, employee_id: u64) -> Result<(), HrError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
        .bind(employee_id)
        .fetch_one(pool)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(HrError::NotFound("employee"))
    }
}

/// Apply an approve/reject decision to a financial request.
///
/// The action string is parsed before any lookup; authorization is a pure
/// role gate (no stored ACL). The status flip is a conditional update
/// guarded on `status = 'pending'`, so two racing deciders cannot both win:
/// the loser's update matches zero rows and surfaces `InvalidAction`.
pub async fn review(
    pool: &MySqlPool,
    table: &'static str,
    kind: RequestKind,
    id: u64,
    raw_action: &str,
    actor: Actor,
    decided_by: Option<u64>,
) -> Result<RequestStatus, HrError> {
    let action = parse_action(raw_action)?;
    authorize(actor, &ApprovalPolicy::ApprovalRole)?;

    let transition = plan_transition(kind, RequestStatus::Pending, action, None)?;

    let decider_col = match action {
        ApprovalAction::Approved => "approved_by",
        ApprovalAction::Rejected => "rejected_by",
    };
    let sql = format!(
        "UPDATE {table} SET status = ?, {decider_col} = ? WHERE id = ? AND status = 'pending'"
    );

    let affected = sqlx::query(&sql)
        .bind(transition.to.to_string())
        .bind(decided_by)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        let stored: Option<String> =
            sqlx::query_scalar(&format!("SELECT status FROM {table} WHERE id = ?"))
                .bind(id)
                .fetch_optional(pool)
                .await?;

        return match stored {
            None => Err(HrError::NotFound("request")),
            Some(s) => {
                let current: RequestStatus = s.parse().map_err(|_| {
                    HrError::Validation(format!("stored status `{s}` is not a known status"))
                })?;
                // yields the duplicate-action error for decided requests
                plan_transition(kind, current, action, None)?;
                Err(HrError::InvalidAction(format!("request already {current}")))
            }
        };
    }

    info!(table, id, status = %transition.to, "financial request decided");
    Ok(transition.to)
}

/// Post-hoc annotation. Settable any time after creation, never validated
/// against lifecycle state and never changing it.
pub async fn annotate(
    pool: &MySqlPool,
    table: &'static str,
    id: u64,
    payload: &VoucherPayload,
) -> Result<(), HrError> {
    let exists: bool =
        sqlx::query_scalar(&format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?)"))
            .bind(id)
            .fetch_one(pool)
            .await?;
    if !exists {
        return Err(HrError::NotFound("request"));
    }

    sqlx::query(&format!(
        "UPDATE {table} SET voucher_no = COALESCE(?, voucher_no), remarks = COALESCE(?, remarks) WHERE id = ?"
    ))
    .bind(&payload.voucher_no)
    .bind(&payload.remarks)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_attachment(
    pool: &MySqlPool,
    table: &'static str,
    id: u64,
) -> Result<HttpResponse, HrError> {
    let row = sqlx::query(&format!(
        "SELECT attachment, attachment_name, attachment_mime FROM {table} WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(HrError::NotFound("request"))?;

    let bytes: Option<Vec<u8>> = row.get("attachment");
    let bytes = bytes.ok_or(HrError::NotFound("attachment"))?;
    let name: Option<String> = row.get("attachment_name");
    let mime: Option<String> = row.get("attachment_mime");

    Ok(HttpResponse::Ok()
        .content_type(mime.unwrap_or_else(|| "application/octet-stream".to_string()))
        .insert_header((
            "Content-Disposition",
            format!(
                "attachment; filename=\"{}\"",
                name.unwrap_or_else(|| "attachment".to_string())
            ),
        ))
        .body(bytes))
}

/// Admin deletion. Financial requests never touched the ledger, so the row
/// disappears with nothing to reverse.
pub async fn delete(pool: &MySqlPool, table: &'static str, id: u64) -> Result<(), HrError> {
    let affected = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if affected == 0 {
        return Err(HrError::NotFound("request"));
    }
    Ok(())
}

pub fn decided_response(status: RequestStatus, noun: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("{noun} {status}")
    }))
}
