use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variable and fixed allowances share one row shape; they live in separate
/// tables (`allowances`, `fixed_allowances`) with identical columns and a
/// UNIQUE KEY over (employee_id, client, project_no, month, year,
/// allowance_type) backing the upsert-by-composite-key policy.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Allowance {
    pub id: u64,
    pub employee_id: u64,
    pub client: String,
    pub project_no: String,
    pub month: String,
    pub year: i32,
    pub allowance_type: String,
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
