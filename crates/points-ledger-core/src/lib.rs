//! Core types and rules for the points ledger.
//!
//! This crate provides the foundational types used throughout the ledger:
//!
//! - **Identifiers**: `UserId`, `TransactionId`
//! - **Accounts**: `UserAccount`, `AccountType`, `PlanType`
//! - **Transactions**: `LedgerTransaction`, `TransactionKind`
//! - **Limits**: `PlanLimits`, `Limits`, `resolve_limits`
//! - **Usage**: the daily usage window and the deduct/refund state transitions
//!
//! # Points
//!
//! A point is the spendable unit consumed per generation action. Balances are
//! stored as `i64` so that admin corrections can drive an account below zero;
//! `deduct` itself never does.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod error;
pub mod ids;
pub mod limits;
pub mod transaction;
pub mod usage;

pub use account::{
    AccountType, PlanType, UserAccount, BASIC_PLAN_POINTS, DEFAULT_ADMIN_WELCOME_BONUS,
    ECOMMERCE_PLAN_POINTS, ELITE_PLAN_POINTS, PRO_PLAN_POINTS,
};
pub use error::{LedgerError, Result};
pub use ids::{IdError, TransactionId, UserId};
pub use limits::{default_limits, resolve_limits, LimitEntry, Limits, PlanLimits};
pub use transaction::{LedgerTransaction, TransactionKind};
pub use usage::{
    apply_adjustment, apply_deduct, apply_refund, cooldown_remaining, current_daily_count, today,
    Adjustment, DeductRequest, RefundRequest,
};
