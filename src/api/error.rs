//! One error type for every handler, mapped onto the HTTP status
//! taxonomy. Bodies are `{"message": ...}`; the quota error additionally
//! reports the remaining balance and the requested day count.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::accounting;

#[derive(Debug, Display)]
pub enum ApiError {
    /// Malformed input, bad date ranges, duplicate email, quota-adjacent
    /// conflicts the interface reports as 400.
    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    /// Decision on an already-terminal leave request.
    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(
        fmt = "Leave limit exceeded. You have {} days pending/approved this month. Maximum allowed: {} days. Requested: {} days.",
        used,
        quota,
        requested
    )]
    QuotaExceeded { used: i64, requested: i64, quota: i64 },

    /// Storage or other unexpected failures. Details go to the log, not
    /// the client.
    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::QuotaExceeded { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::QuotaExceeded {
                used, requested, ..
            } => json!({
                "message": self.to_string(),
                "leaveBalance": accounting::leave_balance(*used),
                "requested": requested,
            }),
            _ => json!({ "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
