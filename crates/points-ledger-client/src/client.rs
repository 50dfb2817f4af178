//! Points ledger HTTP client implementation.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};

use crate::error::{ClientError, PaidActionError};
use crate::types::{
    AccountInfo, ApiErrorResponse, BalanceResponse, DeductRequest, DeductResponse, PaidAction,
    RefundRequest, RefundResponse, TransactionPage,
};

/// Points ledger API client.
///
/// Spends and refunds points with a service API key; reads balances and
/// history with a user's JWT.
#[derive(Debug, Clone)]
pub struct PointsClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl PointsClient {
    /// Create a new points ledger client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://points-ledger:8080"`)
    /// * `api_key` - Service API key for authentication
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
        })
    }

    fn service_post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
    }

    fn user_get(&self, path: &str, user_jwt: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header("authorization", format!("Bearer {user_jwt}"))
    }

    /// Deduct points before a paid action.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds`, `DailyLimitExceeded`, `CooldownActive` or
    /// `AccountDisabled` when the ledger refuses the charge, or a transport error.
    pub async fn deduct(&self, request: &DeductRequest) -> Result<DeductResponse, ClientError> {
        let response = self.service_post("/v1/points/deduct").json(request).send().await?;
        self.handle_response(response).await
    }

    /// Return points after a failed paid action.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn refund(&self, request: &RefundRequest) -> Result<RefundResponse, ClientError> {
        let response = self.service_post("/v1/points/refund").json(request).send().await?;
        self.handle_response(response).await
    }

    /// Charge for an action, run it, and refund the charge if it fails.
    ///
    /// The action only runs after a successful deduction. If it fails, the
    /// same amount is refunded with the description `"Refund: <description> Failed"`
    /// and the action's error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Charge` when nothing was charged, or `Action` when the action
    /// failed (with the refund error, if the refund also failed).
    pub async fn run_paid_action<T, E, F, Fut>(
        &self,
        action: &PaidAction,
        run: F,
    ) -> Result<T, PaidActionError<E>>
    where
        F: FnOnce(DeductResponse) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let charge = self
            .deduct(&action.deduct_request())
            .await
            .map_err(PaidActionError::Charge)?;

        tracing::debug!(
            user_id = %action.user_id,
            amount = action.amount,
            balance = charge.balance,
            "Points deducted for paid action"
        );

        match run(charge).await {
            Ok(value) => Ok(value),
            Err(source) => {
                tracing::info!(
                    user_id = %action.user_id,
                    amount = action.amount,
                    error = %source,
                    "Paid action failed, refunding"
                );

                let refund_error = match self.refund(&action.refund_request()).await {
                    Ok(_) => None,
                    Err(e) => {
                        tracing::error!(
                            user_id = %action.user_id,
                            amount = action.amount,
                            error = %e,
                            "Refund after failed paid action did not go through"
                        );
                        Some(e)
                    }
                };

                Err(PaidActionError::Action {
                    source,
                    refund_error,
                })
            }
        }
    }

    /// Get a user's current balance (requires user JWT, not service API key).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, user_jwt: &str) -> Result<BalanceResponse, ClientError> {
        let response = self.user_get("/v1/points/balance", user_jwt).send().await?;
        self.handle_response(response).await
    }

    /// Get the user's account and the limits in force.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the user never registered.
    pub async fn get_account(&self, user_jwt: &str) -> Result<AccountInfo, ClientError> {
        let response = self.user_get("/v1/accounts/me", user_jwt).send().await?;
        self.handle_response(response).await
    }

    /// List the user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_transactions(
        &self,
        user_jwt: &str,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage, ClientError> {
        let response = self
            .user_get("/v1/points/transactions", user_jwt)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        let Ok(api_error) = error_body else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };
        let body = api_error.error;

        // Map specific error codes to typed errors
        let err = match body.code.as_str() {
            "insufficient_funds" => ClientError::InsufficientFunds {
                balance: body.detail_i64("balance").unwrap_or(0),
                required: body.detail_i64("required").unwrap_or(0),
            },
            "daily_limit_exceeded" => ClientError::DailyLimitExceeded {
                max_daily: body.detail_u32("max_daily").unwrap_or(0),
            },
            "cooldown_active" => ClientError::CooldownActive {
                remaining_minutes: body.detail_u32("remaining_minutes").unwrap_or(0),
            },
            "account_disabled" => ClientError::AccountDisabled,
            "not_found" if status == StatusCode::NOT_FOUND => ClientError::AccountNotFound {
                message: body.message,
            },
            _ => ClientError::Api {
                code: body.code,
                message: body.message,
                status: status.as_u16(),
            },
        };
        Err(err)
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
