use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::core::ctc::LineItem;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct TravelExpenditure {
    pub id: u64,
    pub employee_id: u64,
    pub purpose: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    /// Itemised expense lines, stored as a JSON document on the row.
    pub expenses: Json<Vec<LineItem>>,
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
