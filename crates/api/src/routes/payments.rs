//! Payment routes.
//!
//! A payment is created `pending` and finalized once to `paid`, which credits
//! the account, or `failed`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use paystore_core::ledger::{ChainReport, LedgerError, Payment, PaymentStatus};
use paystore_shared::types::{AccountId, CursorPage, CursorRequest, RecordId};
use serde::Deserialize;
use uuid::Uuid;

use super::require_vendor_record_id;
use crate::{ApiResult, AppState};

/// Creates the payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/{account_id}/payments",
            post(create_payment).get(list_payments),
        )
        .route("/accounts/{account_id}/payments/verify", get(verify_chain))
        .route(
            "/accounts/{account_id}/payments/{payment_id}",
            get(get_payment),
        )
        .route(
            "/accounts/{account_id}/payments/{payment_id}/finalize",
            post(finalize_payment),
        )
}

/// Request body for creating a payment.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Gross amount in minor units.
    pub amount: i64,
    /// Reference assigned by the payment vendor.
    pub vendor_record_id: String,
}

/// Request body for finalizing a payment.
#[derive(Debug, Deserialize)]
pub struct FinalizePaymentRequest {
    /// `paid` or `failed`.
    pub status: PaymentStatus,
}

/// POST `/accounts/{account_id}/payments` - Create a pending payment.
async fn create_payment(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<CreatePaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    require_vendor_record_id(&payload.vendor_record_id)?;

    let payment = state
        .service
        .create_payment(
            AccountId::from_uuid(account_id),
            payload.amount,
            &payload.vendor_record_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// POST `/accounts/{account_id}/payments/{payment_id}/finalize` - Settle or fail.
async fn finalize_payment(
    State(state): State<AppState>,
    Path((account_id, payment_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<FinalizePaymentRequest>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .service
        .finalize_payment(
            AccountId::from_uuid(account_id),
            RecordId::from_uuid(payment_id),
            payload.status,
        )
        .await?;
    Ok(Json(payment))
}

/// GET `/accounts/{account_id}/payments/{payment_id}` - One payment.
async fn get_payment(
    State(state): State<AppState>,
    Path((account_id, payment_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Payment>> {
    let payment_id = RecordId::from_uuid(payment_id);
    let payment = state.service.payment(payment_id).await?;
    if payment.account_id != AccountId::from_uuid(account_id) {
        return Err(LedgerError::PaymentNotFound(payment_id).into());
    }
    Ok(Json(payment))
}

/// GET `/accounts/{account_id}/payments` - Newest-first payment history.
async fn list_payments(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<CursorRequest>,
) -> ApiResult<Json<CursorPage<Payment>>> {
    let scope = state
        .service
        .account_scope(AccountId::from_uuid(account_id))
        .await?;
    let page = state
        .service
        .payment_history(scope, query.cursor())
        .await?;
    Ok(Json(page))
}

/// GET `/accounts/{account_id}/payments/verify` - Walk the payment hash chain.
async fn verify_chain(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> ApiResult<Json<ChainReport>> {
    let report = state
        .service
        .verify_payment_chain(AccountId::from_uuid(account_id))
        .await?;
    Ok(Json(report))
}
