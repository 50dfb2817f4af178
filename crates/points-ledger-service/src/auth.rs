//! Authentication extractors.
//!
//! This module provides extractors for:
//! - `AuthUser` - End-user authentication via identity provider JWT
//! - `ServiceAuth` - Service-to-service authentication via API key
//! - `AdminAuth` - An authenticated user whose account carries the admin flag

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use points_ledger_core::{UserAccount, UserId};
use points_ledger_store::Store;

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated user extracted from an identity provider JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID (JWT subject).
    pub user_id: UserId,
    /// Email claim, if the provider sent one.
    pub email: Option<String>,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // Extract the Authorization header
            let auth_header = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            // Extract the Bearer token
            let token = auth_header
                .strip_prefix("Bearer ")
                .ok_or(ApiError::Unauthorized)?;

            let claims = validate_jwt(token, state)?;

            let user_id = claims
                .sub
                .parse::<UserId>()
                .map_err(|_| ApiError::Unauthorized)?;

            Ok(AuthUser {
                user_id,
                email: claims.email,
            })
        })
    }
}

/// Service authentication via API key.
///
/// Used for requests from the generation backends that spend points.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // Check for X-API-Key header
            let api_key = parts
                .headers
                .get("x-api-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            // Validate against configured service API key
            let expected_key = state
                .config
                .service_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if !constant_time_eq(api_key, expected_key) {
                return Err(ApiError::Unauthorized);
            }

            // Extract service name from header if provided
            let service_name = parts
                .headers
                .get("x-service-name")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}

/// An authenticated user with the admin flag set on their account.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// The admin's identity.
    pub user: AuthUser,
    /// The admin's own account record.
    pub account: UserAccount,
}

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user = AuthUser::from_request_parts(parts, state).await?;

            let account = state
                .store
                .get_account(&user.user_id)?
                .ok_or(ApiError::Forbidden)?;

            if !account.is_admin {
                tracing::warn!(user_id = %user.user_id, "Non-admin attempted admin operation");
                return Err(ApiError::Forbidden);
            }

            Ok(AdminAuth { user, account })
        })
    }
}

/// JWT claims issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Audience (can be string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Validate an HS256 token against the configured secret, issuer and audience.
fn validate_jwt(token: &str, state: &AppState) -> Result<JwtClaims, ApiError> {
    let Some(secret) = state.config.auth_jwt_secret.as_deref() else {
        tracing::warn!("AUTH_JWT_SECRET not configured, rejecting user token");
        return Err(ApiError::Unauthorized);
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[&state.config.auth_audience]);
    validation.set_issuer(&[&state.config.auth_issuer]);

    let token_data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        ApiError::Unauthorized
    })?;

    Ok(token_data.claims)
}
