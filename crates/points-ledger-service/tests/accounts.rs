//! Account integration tests.

mod common;

use axum::http::{HeaderValue, StatusCode};
use common::{TestHarness, ADMIN_EMAIL, ISSUER};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use points_ledger_core::UserId;
use points_ledger_service::auth::JwtClaims;

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn create_account_starts_as_empty_trial() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(TestHarness::auth_name(), harness.user_auth_header())
        .json(&json!({ "email": "user@example.com" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], harness.test_user_id.to_string());
    assert_eq!(body["email"], "user@example.com");
    assert_eq!(body["balance"], 0);
    assert_eq!(body["account_type"], "trial");
    assert_eq!(body["plan_type"], "none");
    assert_eq!(body["limits"]["max_daily"], 2);
    assert_eq!(body["is_admin"], false);
}

#[tokio::test]
async fn create_account_is_idempotent() {
    let harness = TestHarness::new();
    let user_id = harness.seed_account(250, None);

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(TestHarness::auth_name(), TestHarness::bearer(&user_id, None))
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance"], 250);
}

#[tokio::test]
async fn bootstrap_admin_gets_flag_and_bonus() {
    let harness = TestHarness::new();
    let admin_id = UserId::generate();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(
            TestHarness::auth_name(),
            TestHarness::bearer(&admin_id, Some(ADMIN_EMAIL)),
        )
        .json(&json!({}))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_admin"], true);
    assert_eq!(body["balance"], 1000);

    let history = harness
        .server
        .get("/v1/points/transactions")
        .add_header(
            TestHarness::auth_name(),
            TestHarness::bearer(&admin_id, Some(ADMIN_EMAIL)),
        )
        .await;
    let history: serde_json::Value = history.json();
    assert_eq!(history["transactions"][0]["kind"], "credit");
    assert_eq!(history["transactions"][0]["balance_after"], 1000);
}

#[tokio::test]
async fn body_email_cannot_claim_admin() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header(TestHarness::auth_name(), harness.user_auth_header())
        .json(&json!({ "email": ADMIN_EMAIL }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["balance"], 0);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn create_account_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness.server.post("/v1/accounts").json(&json!({})).await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn token_with_wrong_secret_is_rejected() {
    let harness = TestHarness::new();
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: UserId::generate().to_string(),
        email: None,
        aud: Some(json!("points-ledger")),
        iss: ISSUER.into(),
        exp: now + 3600,
        iat: Some(now),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"not-the-secret"),
    )
    .unwrap();

    harness
        .server
        .get("/v1/accounts/me")
        .add_header(
            TestHarness::auth_name(),
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let harness = TestHarness::new();
    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: UserId::generate().to_string(),
        email: None,
        aud: Some(json!("points-ledger")),
        iss: ISSUER.into(),
        exp: now - 3600,
        iat: Some(now - 7200),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(common::JWT_SECRET.as_bytes()),
    )
    .unwrap();

    harness
        .server
        .get("/v1/accounts/me")
        .add_header(
            TestHarness::auth_name(),
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn user_endpoints_reject_all_tokens_without_secret() {
    let harness = TestHarness::with_config(|config| config.auth_jwt_secret = None);

    harness
        .server
        .get("/v1/accounts/me")
        .add_header(TestHarness::auth_name(), harness.user_auth_header())
        .await
        .assert_status_unauthorized();
}

// ============================================================================
// Read
// ============================================================================

#[tokio::test]
async fn get_account_reports_today_usage_and_limits() {
    let harness = TestHarness::new();
    let user_id = harness.seed_with(100, Some(points_ledger_core::PlanType::Pro), |account| {
        account.daily_usage_count = 9;
        account.last_reset_date = Some(chrono::Utc::now().date_naive());
    });

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header(TestHarness::auth_name(), TestHarness::bearer(&user_id, None))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["plan_type"], "pro");
    assert_eq!(body["daily_usage_count"], 9);
    assert_eq!(body["limits"]["max_daily"], 50);
    assert_eq!(body["limits"]["cooldown_minutes"], 10);
}

#[tokio::test]
async fn stale_usage_reads_as_zero() {
    let harness = TestHarness::new();
    let user_id = harness.seed_with(100, None, |account| {
        account.daily_usage_count = 2;
        account.last_reset_date = Some(chrono::Utc::now().date_naive() - chrono::Duration::days(1));
    });

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header(TestHarness::auth_name(), TestHarness::bearer(&user_id, None))
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["daily_usage_count"], 0);
}

#[tokio::test]
async fn get_account_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header(TestHarness::auth_name(), harness.user_auth_header())
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
}
