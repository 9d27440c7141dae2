use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Leave Travel Concession claim for a block period (e.g. "2022-2025").
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LtcClaim {
    pub id: u64,
    pub employee_id: u64,
    pub block_period: String,
    pub amount: f64,
    pub status: String,
    pub voucher_no: Option<String>,
    pub remarks: Option<String>,
    pub approved_by: Option<u64>,
    pub rejected_by: Option<u64>,
    pub attachment_name: Option<String>,
    pub attachment_mime: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
