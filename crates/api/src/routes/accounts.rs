//! Account routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use paystore_core::ledger::LedgerAccount;
use paystore_shared::types::AccountId;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{ApiResult, AppState};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/{account_id}", get(get_account))
        .route("/accounts/{account_id}/deactivate", post(deactivate_account))
        .route("/accounts/{account_id}/pin", put(set_pin))
}

/// Request body for opening an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Slug of the owning organization.
    pub organization_slug: String,
    /// Caller's identifier for the owner, unique within the organization.
    pub external_id: String,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Request body for setting the withdrawal PIN.
#[derive(Deserialize)]
pub struct SetPinRequest {
    /// Plaintext PIN, 4 to 8 digits.
    pub pin: String,
}

/// POST /accounts - Open an account.
async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .service
        .create_account(
            &payload.organization_slug,
            &payload.external_id,
            &payload.currency,
        )
        .await?;

    info!(account_id = %account.id, org_id = %account.organization_id, "Account opened");
    Ok((StatusCode::CREATED, Json(account)))
}

/// GET `/accounts/{account_id}` - Balance snapshot.
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<LedgerAccount>> {
    let account = state
        .service
        .account(AccountId::from_uuid(account_id))
        .await?;
    Ok(Json(account))
}

/// POST `/accounts/{account_id}/deactivate` - Stop accepting new records.
async fn deactivate_account(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<LedgerAccount>> {
    let account = state
        .service
        .deactivate_account(AccountId::from_uuid(account_id))
        .await?;
    Ok(Json(account))
}

/// PUT `/accounts/{account_id}/pin` - Set or replace the withdrawal PIN.
async fn set_pin(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<SetPinRequest>,
) -> ApiResult<StatusCode> {
    state
        .service
        .set_pin(AccountId::from_uuid(account_id), &payload.pin)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
