//! Withdrawal routes.
//!
//! Creating a withdrawal is gated by the account PIN and checks the balance;
//! finalizing it as `success` debits the account after checking again.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use paystore_core::ledger::{ChainReport, LedgerError, Withdrawal, WithdrawalStatus};
use paystore_shared::types::{AccountId, CursorPage, CursorRequest, RecordId};
use serde::Deserialize;
use uuid::Uuid;

use super::require_vendor_record_id;
use crate::{ApiResult, AppState};

/// Creates the withdrawal routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/{account_id}/withdrawals",
            post(create_withdrawal).get(list_withdrawals),
        )
        .route("/accounts/{account_id}/withdrawals/verify", get(verify_chain))
        .route(
            "/accounts/{account_id}/withdrawals/{withdrawal_id}",
            get(get_withdrawal),
        )
        .route(
            "/accounts/{account_id}/withdrawals/{withdrawal_id}/finalize",
            post(finalize_withdrawal),
        )
}

/// Request body for creating a withdrawal.
#[derive(Deserialize)]
pub struct CreateWithdrawalRequest {
    /// Gross amount in minor units.
    pub amount: i64,
    /// Reference assigned by the payout vendor.
    pub vendor_record_id: String,
    /// Account PIN.
    pub pin: String,
}

/// Request body for finalizing a withdrawal.
#[derive(Debug, Deserialize)]
pub struct FinalizeWithdrawalRequest {
    /// `success` or `failed`.
    pub status: WithdrawalStatus,
}

/// POST `/accounts/{account_id}/withdrawals` - Create a pending withdrawal.
async fn create_withdrawal(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<CreateWithdrawalRequest>,
) -> ApiResult<impl IntoResponse> {
    require_vendor_record_id(&payload.vendor_record_id)?;

    let withdrawal = state
        .service
        .create_withdrawal(
            AccountId::from_uuid(account_id),
            payload.amount,
            &payload.vendor_record_id,
            &payload.pin,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}

/// POST `/accounts/{account_id}/withdrawals/{withdrawal_id}/finalize` - Settle or fail.
async fn finalize_withdrawal(
    State(state): State<AppState>,
    Path((account_id, withdrawal_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<FinalizeWithdrawalRequest>,
) -> ApiResult<Json<Withdrawal>> {
    let withdrawal = state
        .service
        .finalize_withdrawal(
            AccountId::from_uuid(account_id),
            RecordId::from_uuid(withdrawal_id),
            payload.status,
        )
        .await?;
    Ok(Json(withdrawal))
}

/// GET `/accounts/{account_id}/withdrawals/{withdrawal_id}` - One withdrawal.
async fn get_withdrawal(
    State(state): State<AppState>,
    Path((account_id, withdrawal_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Withdrawal>> {
    let withdrawal_id = RecordId::from_uuid(withdrawal_id);
    let withdrawal = state.service.withdrawal(withdrawal_id).await?;
    if withdrawal.account_id != AccountId::from_uuid(account_id) {
        return Err(LedgerError::WithdrawalNotFound(withdrawal_id).into());
    }
    Ok(Json(withdrawal))
}

/// GET `/accounts/{account_id}/withdrawals` - Newest-first withdrawal history.
async fn list_withdrawals(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<CursorRequest>,
) -> ApiResult<Json<CursorPage<Withdrawal>>> {
    let scope = state
        .service
        .account_scope(AccountId::from_uuid(account_id))
        .await?;
    let page = state
        .service
        .withdrawal_history(scope, query.cursor())
        .await?;
    Ok(Json(page))
}

/// GET `/accounts/{account_id}/withdrawals/verify` - Walk the withdrawal hash chain.
async fn verify_chain(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<ChainReport>> {
    let report = state
        .service
        .verify_withdrawal_chain(AccountId::from_uuid(account_id))
        .await?;
    Ok(Json(report))
}
