//! Common test utilities for points ledger integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;

use points_ledger_core::{AccountType, PlanType, UserAccount, UserId};
use points_ledger_service::auth::JwtClaims;
use points_ledger_service::{create_router, AppState, ServiceConfig, StoreBackend};
use points_ledger_store::{MemoryStore, Store};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const ISSUER: &str = "https://auth.test";
pub const AUDIENCE: &str = "points-ledger";
pub const SERVICE_API_KEY: &str = "test-service-key";
pub const ADMIN_EMAIL: &str = "owner@example.com";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct access to the backing store for seeding state.
    pub store: Arc<MemoryStore>,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh store.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a harness after adjusting the default test configuration.
    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let store = Arc::new(MemoryStore::new());

        let mut config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            store_backend: StoreBackend::Memory,
            auth_jwt_secret: Some(JWT_SECRET.into()),
            auth_issuer: ISSUER.into(),
            auth_audience: AUDIENCE.into(),
            service_api_key: Some(SERVICE_API_KEY.into()),
            bootstrap_admin_email: Some(ADMIN_EMAIL.into()),
            ..ServiceConfig::default()
        };
        adjust(&mut config);

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            store,
            test_user_id: UserId::generate(),
        }
    }

    /// Mint a token the service will accept.
    pub fn token_for(user_id: &UserId, email: Option<&str>) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            aud: Some(json!(AUDIENCE)),
            iss: ISSUER.into(),
            exp: now + 3600,
            iat: Some(now),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .expect("Failed to encode token")
    }

    /// Authorization header name.
    pub fn auth_name() -> HeaderName {
        header::AUTHORIZATION
    }

    /// Bearer header value for an arbitrary user.
    pub fn bearer(user_id: &UserId, email: Option<&str>) -> HeaderValue {
        HeaderValue::from_str(&format!("Bearer {}", Self::token_for(user_id, email)))
            .expect("valid header value")
    }

    /// Get the authorization header for the test user.
    pub fn user_auth_header(&self) -> HeaderValue {
        Self::bearer(&self.test_user_id, None)
    }

    /// Service API key header name.
    pub fn api_key_name() -> HeaderName {
        HeaderName::from_static("x-api-key")
    }

    /// Service API key header value.
    pub fn api_key() -> HeaderValue {
        HeaderValue::from_static(SERVICE_API_KEY)
    }

    /// Register the bootstrap admin and return their auth header.
    pub async fn admin_auth_header(&self) -> HeaderValue {
        let admin_id = UserId::generate();
        let header = Self::bearer(&admin_id, Some(ADMIN_EMAIL));
        self.server
            .post("/v1/accounts")
            .add_header(Self::auth_name(), header.clone())
            .json(&json!({}))
            .await
            .assert_status_ok();
        header
    }

    /// Insert an account directly into the store.
    pub fn seed_account(&self, balance: i64, plan: Option<PlanType>) -> UserId {
        self.seed_with(balance, plan, |_| {})
    }

    /// Insert an account after adjusting it.
    pub fn seed_with(
        &self,
        balance: i64,
        plan: Option<PlanType>,
        adjust: impl FnOnce(&mut UserAccount),
    ) -> UserId {
        let mut account = UserAccount::new(UserId::generate());
        account.balance = balance;
        if let Some(plan) = plan {
            account.account_type = AccountType::Paid;
            account.plan_type = plan;
        }
        adjust(&mut account);
        self.store
            .create_account_if_absent(&account, None)
            .expect("Failed to seed account");
        account.id
    }

    /// Current stored account.
    pub fn account(&self, user_id: &UserId) -> UserAccount {
        self.store
            .get_account(user_id)
            .expect("store read")
            .expect("account exists")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
