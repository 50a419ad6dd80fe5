//! Organization routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use paystore_core::ledger::{FeePolicy, Organization, Payment, Withdrawal};
use paystore_shared::types::{CursorPage, CursorRequest};
use serde::Deserialize;
use tracing::info;

use crate::{ApiResult, AppState};

/// Creates the organization routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations", post(create_organization))
        .route("/organizations/{slug}", get(get_organization))
        .route("/organizations/{slug}/fee-policy", put(update_fee_policy))
        .route("/organizations/{slug}/payments", get(list_payments))
        .route("/organizations/{slug}/withdrawals", get(list_withdrawals))
}

/// Request body for creating an organization.
#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    /// Display name, unique across tenants.
    pub name: String,
    /// URL slug, unique across tenants.
    pub slug: String,
    /// Fee policy applied to new records.
    pub fee_policy: FeePolicy,
}

/// POST /organizations - Register an organization.
async fn create_organization(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrganizationRequest>,
) -> ApiResult<impl IntoResponse> {
    let organization = state
        .service
        .create_organization(&payload.name, &payload.slug, payload.fee_policy)
        .await?;

    info!(org_id = %organization.id, slug = %organization.slug, "Organization registered");
    Ok((StatusCode::CREATED, Json(organization)))
}

/// GET `/organizations/{slug}` - Organization details.
async fn get_organization(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(state.service.organization_by_slug(&slug).await?))
}

/// PUT `/organizations/{slug}/fee-policy` - Replace the fee policy.
async fn update_fee_policy(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(policy): Json<FeePolicy>,
) -> ApiResult<Json<Organization>> {
    Ok(Json(state.service.update_fee_policy(&slug, policy).await?))
}

/// GET `/organizations/{slug}/payments` - Payment history of every account.
async fn list_payments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<CursorRequest>,
) -> ApiResult<Json<CursorPage<Payment>>> {
    let scope = state.service.organization_scope(&slug).await?;
    let page = state
        .service
        .payment_history(scope, query.cursor())
        .await?;
    Ok(Json(page))
}

/// GET `/organizations/{slug}/withdrawals` - Withdrawal history of every account.
async fn list_withdrawals(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<CursorRequest>,
) -> ApiResult<Json<CursorPage<Withdrawal>>> {
    let scope = state.service.organization_scope(&slug).await?;
    let page = state
        .service
        .withdrawal_history(scope, query.cursor())
        .await?;
    Ok(Json(page))
}
