//! API route definitions.

use axum::Router;
use axum::http::Uri;
use paystore_shared::{AppError, AppResult};

use crate::{ApiError, AppState};

pub mod accounts;
pub mod health;
pub mod organizations;
pub mod payments;
pub mod withdrawals;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(organizations::routes())
        .merge(accounts::routes())
        .merge(payments::routes())
        .merge(withdrawals::routes())
}

/// Rejects blank vendor references before they reach the ledger.
pub(crate) fn require_vendor_record_id(vendor_record_id: &str) -> AppResult<()> {
    if vendor_record_id.trim().is_empty() {
        return Err(AppError::Validation(
            "vendor_record_id must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Answers requests that match no route.
pub async fn not_found(uri: Uri) -> ApiError {
    AppError::NotFound(uri.path().to_string()).into()
}
