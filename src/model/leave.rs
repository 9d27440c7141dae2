use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::core::lifecycle::RequestStatus;

/// A leave application as stored. `applied_to` is the explicit approver set
/// captured at submission; it is never re-derived later.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub category: String,
    pub days: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub applied_to: Json<Vec<u64>>,
    pub status: String,
    pub approved_by: Option<u64>,
    pub rejected_by: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl LeaveRequest {
    pub fn status(&self) -> Option<RequestStatus> {
        self.status.parse().ok()
    }
}
