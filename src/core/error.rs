use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error taxonomy shared by every request-lifecycle endpoint.
///
/// Validation and authorization variants are raised before any mutation;
/// `Storage` means the whole operation failed and no partial state was
/// written (ledger + status writes share one transaction).
#[derive(Debug, Error)]
pub enum HrError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid action `{0}`: allowed actions are `approved` and `rejected`")]
    InvalidAction(String),

    #[error("insufficient {category} balance: {available} day(s) available, {requested} requested")]
    InsufficientBalance {
        category: String,
        available: f64,
        requested: f64,
    },

    #[error("only {resolved} of {requested} approver id(s) resolve to existing employees")]
    ApproverResolutionMismatch { requested: usize, resolved: usize },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("storage failure")]
    Storage(#[from] sqlx::Error),
}

impl actix_web::ResponseError for HrError {
    fn status_code(&self) -> StatusCode {
        match self {
            HrError::NotFound(_) => StatusCode::NOT_FOUND,
            HrError::InvalidAction(_)
            | HrError::InsufficientBalance { .. }
            | HrError::ApproverResolutionMismatch { .. }
            | HrError::Validation(_) => StatusCode::BAD_REQUEST,
            HrError::Forbidden(_) => StatusCode::FORBIDDEN,
            HrError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            HrError::Storage(e) => {
                error!(error = %e, "storage failure");
                "Something went wrong, contact the system admin".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "message": message
        }))
    }
}
