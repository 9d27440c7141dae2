use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::core::ctc::LineItem;

/// Monthly salary record. No approval concept: always included in CTC.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct Salary {
    pub id: u64,
    pub employee_id: u64,
    pub month: String,
    pub year: i32,
    pub basic_salary: f64,
    pub allowances: Json<Vec<LineItem>>,
    pub deductions: Json<Vec<LineItem>>,
    pub created_at: Option<DateTime<Utc>>,
}
