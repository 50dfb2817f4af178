//! Points ledger HTTP API service.
//!
//! This crate provides the HTTP API for the points ledger, including:
//!
//! - Account registration and lookup
//! - Balance and transaction history
//! - Point deduction and refund for paid actions
//! - Admin adjustments and global plan limits
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **Identity provider JWTs** - For end-user and admin requests
//! 2. **Service API keys** - For the backends that spend points

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Store calls are synchronous

pub mod admin;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod routes;
pub mod state;

pub use admin::{AdjustOutcome, AdminFacade};
pub use config::{ServiceConfig, StoreBackend};
pub use error::ApiError;
pub use ledger::{Bootstrap, DeductOutcome, Ledger, RefundOutcome};
pub use routes::create_router;
pub use state::AppState;
