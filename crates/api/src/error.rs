//! Error responses.
//!
//! Every failed request answers with `{ "error", "message", "id" }`. The id is
//! fresh per failure and is logged next to the failure so that a client report
//! can be matched with the server log.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use paystore_core::ledger::LedgerError;
use paystore_shared::AppError;
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    retryable: bool,
}

impl ApiError {
    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self {
            status: StatusCode::from_u16(err.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.error_code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self {
            status: StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.error_code(),
            message: err.to_string(),
            retryable: false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let id = Uuid::new_v4();

        if self.status.is_server_error() {
            error!(
                error_id = %id,
                code = self.code,
                retryable = self.retryable,
                message = %self.message,
                "Request failed"
            );
        } else {
            warn!(error_id = %id, code = self.code, message = %self.message, "Request rejected");
        }

        (
            self.status,
            Json(json!({
                "error": self.code,
                "message": self.message,
                "id": id
            })),
        )
            .into_response()
    }
}
