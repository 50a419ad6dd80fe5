//! Router tests over the in-memory ledger.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::CONTENT_TYPE},
};
use http_body_util::BodyExt;
use paystore_core::ledger::{
    LedgerCaches, LedgerService, LedgerSettings, LedgerStores, MemoryLedger,
};
use paystore_shared::config::CacheConfig;
use paystore_shared::types::RecordId;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::*;

struct TestApp {
    router: Router,
    store: MemoryLedger,
}

fn app_with(settings: LedgerSettings) -> TestApp {
    let store = MemoryLedger::new();
    let service = LedgerService::new(
        LedgerStores::from_backend(Arc::new(store.clone())),
        LedgerCaches::in_memory(&CacheConfig::default()),
        settings,
    );
    TestApp {
        router: create_router(AppState::new(service)),
        store,
    }
}

fn app() -> TestApp {
    app_with(LedgerSettings::default())
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Registers an organization and opens one account in it; returns the account id.
    async fn account(&self, slug: &str, fee_policy: Value) -> String {
        let (status, _) = self
            .send(
                "POST",
                "/api/v1/organizations",
                Some(json!({ "name": slug, "slug": slug, "fee_policy": fee_policy })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, account) = self
            .send(
                "POST",
                "/api/v1/accounts",
                Some(json!({
                    "organization_slug": slug,
                    "external_id": "owner-1",
                    "currency": "IDR"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        account["id"].as_str().unwrap().to_string()
    }

    async fn paid_payment(&self, account_id: &str, amount: i64) -> Value {
        let (status, payment) = self
            .send(
                "POST",
                &format!("/api/v1/accounts/{account_id}/payments"),
                Some(json!({ "amount": amount, "vendor_record_id": "inv-1" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, payment) = self
            .send(
                "POST",
                &format!(
                    "/api/v1/accounts/{account_id}/payments/{}/finalize",
                    payment["id"].as_str().unwrap()
                ),
                Some(json!({ "status": "paid" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        payment
    }
}

fn fixed(constant: i64) -> Value {
    json!({ "type": "fixed", "constant": constant })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = app.send("GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_response_carries_request_id() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_fixed_fee_payment_flow() {
    let app = app();
    let account_id = app.account("acme", fixed(100)).await;

    let (status, pending) = app
        .send(
            "POST",
            &format!("/api/v1/accounts/{account_id}/payments"),
            Some(json!({ "amount": 1000, "vendor_record_id": "inv-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(pending["amount"], 900);
    assert_eq!(pending["fees"], 100);
    assert_eq!(pending["status"], "pending");
    assert_eq!(pending["previous_hash"], "");

    let (status, paid) = app
        .send(
            "POST",
            &format!(
                "/api/v1/accounts/{account_id}/payments/{}/finalize",
                pending["id"].as_str().unwrap()
            ),
            Some(json!({ "status": "paid" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");
    assert_ne!(paid["hash"], pending["hash"]);

    let (status, account) = app
        .send("GET", &format!("/api/v1/accounts/{account_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["balance"], 900);
    assert_eq!(account["income_accumulation"], 900);

    let (status, report) = app
        .send(
            "GET",
            &format!("/api/v1/accounts/{account_id}/payments/verify"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["records"], 1);
    assert_eq!(report["kind"], "payment");
}

#[tokio::test]
async fn test_refinalize_is_rejected() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;
    let payment = app.paid_payment(&account_id, 100).await;

    let (status, body) = app
        .send(
            "POST",
            &format!(
                "/api/v1/accounts/{account_id}/payments/{}/finalize",
                payment["id"].as_str().unwrap()
            ),
            Some(json!({ "status": "failed" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_withdrawal_over_balance_is_rejected() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;
    app.paid_payment(&account_id, 500).await;

    let (status, _) = app
        .send(
            "PUT",
            &format!("/api/v1/accounts/{account_id}/pin"),
            Some(json!({ "pin": "1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/accounts/{account_id}/withdrawals"),
            Some(json!({ "amount": 600, "vendor_record_id": "payout-1", "pin": "1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INSUFFICIENT_FUNDS");
    assert_eq!(app.store.withdrawal_count(), 0);

    let (status, page) = app
        .send(
            "GET",
            &format!("/api/v1/accounts/{account_id}/withdrawals"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["data"], json!([]));
    assert_eq!(page["is_last_page"], true);
}

#[tokio::test]
async fn test_withdrawal_success_debits() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;
    app.paid_payment(&account_id, 1000).await;
    app.send(
        "PUT",
        &format!("/api/v1/accounts/{account_id}/pin"),
        Some(json!({ "pin": "1234" })),
    )
    .await;

    let (status, withdrawal) = app
        .send(
            "POST",
            &format!("/api/v1/accounts/{account_id}/withdrawals"),
            Some(json!({ "amount": 400, "vendor_record_id": "payout-1", "pin": "1234" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, settled) = app
        .send(
            "POST",
            &format!(
                "/api/v1/accounts/{account_id}/withdrawals/{}/finalize",
                withdrawal["id"].as_str().unwrap()
            ),
            Some(json!({ "status": "success" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["status"], "success");

    let (_, account) = app
        .send("GET", &format!("/api/v1/accounts/{account_id}"), None)
        .await;
    assert_eq!(account["balance"], 600);
    assert_eq!(account["withdraw_accumulation"], 400);
}

#[tokio::test]
async fn test_wrong_pin_is_forbidden() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;
    app.paid_payment(&account_id, 1000).await;
    app.send(
        "PUT",
        &format!("/api/v1/accounts/{account_id}/pin"),
        Some(json!({ "pin": "1234" })),
    )
    .await;

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/accounts/{account_id}/withdrawals"),
            Some(json!({ "amount": 100, "vendor_record_id": "payout-1", "pin": "0000" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PIN_MISMATCH");
}

#[tokio::test]
async fn test_duplicate_slug_conflicts() {
    let app = app();
    app.account("acme", fixed(0)).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/organizations",
            Some(json!({ "name": "Other", "slug": "acme", "fee_policy": fixed(0) })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "DUPLICATE_SLUG");
}

#[tokio::test]
async fn test_unknown_route_answers_with_error_body() {
    let app = app();
    let (status, body) = app.send("GET", "/api/v1/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Not found: /api/v1/nowhere");
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn test_unknown_account_is_not_found() {
    let app = app();
    let (status, body) = app
        .send(
            "GET",
            &format!("/api/v1/accounts/{}", uuid::Uuid::now_v7()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "ACCOUNT_NOT_FOUND");
    assert!(body["message"].is_string());
    assert!(body["id"].is_string());
}

#[tokio::test]
async fn test_blank_vendor_reference_is_rejected() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/accounts/{account_id}/payments"),
            Some(json!({ "amount": 100, "vendor_record_id": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(app.store.payment_count(), 0);
}

#[tokio::test]
async fn test_record_of_other_account_is_hidden() {
    let app = app();
    let owner = app.account("acme", fixed(0)).await;
    let other = app.account("globex", fixed(0)).await;
    let payment = app.paid_payment(&owner, 100).await;
    let payment_id = payment["id"].as_str().unwrap();

    let (status, _) = app
        .send(
            "GET",
            &format!("/api/v1/accounts/{owner}/payments/{payment_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/v1/accounts/{other}/payments/{payment_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "PAYMENT_NOT_FOUND");
}

#[tokio::test]
async fn test_history_pages_follow_cursor() {
    let app = app_with(LedgerSettings {
        page_size: 2,
        ..LedgerSettings::default()
    });
    let account_id = app.account("acme", fixed(0)).await;
    for amount in 1..=3 {
        app.paid_payment(&account_id, amount * 100).await;
    }

    let uri = format!("/api/v1/accounts/{account_id}/payments");
    let (status, first) = app.send("GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"].as_array().unwrap().len(), 2);
    assert_eq!(first["data"][0]["amount"], 300);
    assert_eq!(first["is_last_page"], false);

    let cursor = first["next_cursor"].as_str().unwrap();
    let (_, second) = app
        .send("GET", &format!("{uri}?cursor={cursor}"), None)
        .await;
    assert_eq!(second["data"].as_array().unwrap().len(), 1);
    assert_eq!(second["data"][0]["amount"], 100);
    assert_eq!(second["is_last_page"], true);
    assert!(second["next_cursor"].is_null());

    let (status, organization) = app
        .send("GET", "/api/v1/organizations/acme/payments", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(organization["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_fee_policy_update_applies_to_new_payments() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;

    let (status, organization) = app
        .send(
            "PUT",
            "/api/v1/organizations/acme/fee-policy",
            Some(json!({ "type": "percent", "constant": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(organization["fee_policy"]["type"], "percent");

    let payment = app.paid_payment(&account_id, 1000).await;
    assert_eq!(payment["amount"], 1000);
    assert_eq!(payment["fees"], 100);
}

#[tokio::test]
async fn test_deactivated_account_rejects_payments() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;

    let (status, account) = app
        .send(
            "POST",
            &format!("/api/v1/accounts/{account_id}/deactivate"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["active"], false);

    let (status, body) = app
        .send(
            "POST",
            &format!("/api/v1/accounts/{account_id}/payments"),
            Some(json!({ "amount": 100, "vendor_record_id": "inv-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn test_tampered_chain_reports_integrity_violation() {
    let app = app();
    let account_id = app.account("acme", fixed(0)).await;
    let payment = app.paid_payment(&account_id, 100).await;

    let payment_id: RecordId = payment["id"].as_str().unwrap().parse().unwrap();
    app.store.tamper_payment(payment_id, |p| p.amount = 1_000_000);

    let (status, body) = app
        .send(
            "GET",
            &format!("/api/v1/accounts/{account_id}/payments/verify"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "INTEGRITY_VIOLATION");
}
