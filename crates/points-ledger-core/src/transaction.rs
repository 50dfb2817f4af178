//! Ledger transaction types.
//!
//! Every change to an account's balance writes exactly one transaction record
//! in the same commit as the balance change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// An immutable audit record of a single balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Magnitude of the change in points. Never negative; the direction is
    /// given by `kind`.
    pub amount: i64,

    /// Direction and cause of the change.
    pub kind: TransactionKind,

    /// Balance after this transaction.
    pub balance_after: i64,

    /// Human-readable reason.
    pub description: String,

    /// Correlation id of the order or generation this belongs to.
    #[serde(default)]
    pub related_order_id: Option<String>,

    /// Whether the change was made through the admin operations.
    #[serde(default)]
    pub admin_adjustment: bool,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    fn new(
        user_id: UserId,
        amount: i64,
        kind: TransactionKind,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            amount: amount.saturating_abs(),
            kind,
            balance_after,
            description,
            related_order_id: None,
            admin_adjustment: false,
            created_at: Utc::now(),
        }
    }

    /// Create a debit for a deduction.
    #[must_use]
    pub fn debit(user_id: UserId, amount: i64, balance_after: i64, description: String) -> Self {
        Self::new(user_id, amount, TransactionKind::Debit, balance_after, description)
    }

    /// Create a refund record.
    #[must_use]
    pub fn refund(user_id: UserId, amount: i64, balance_after: i64, description: String) -> Self {
        Self::new(user_id, amount, TransactionKind::Refund, balance_after, description)
    }

    /// Create a credit record.
    #[must_use]
    pub fn credit(user_id: UserId, amount: i64, balance_after: i64, description: String) -> Self {
        Self::new(user_id, amount, TransactionKind::Credit, balance_after, description)
    }

    /// Create an admin balance adjustment. Negative deltas are debits.
    #[must_use]
    pub fn admin_adjustment(
        user_id: UserId,
        delta: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        let kind = if delta >= 0 {
            TransactionKind::Credit
        } else {
            TransactionKind::Debit
        };
        Self {
            admin_adjustment: true,
            ..Self::new(user_id, delta, kind, balance_after, description)
        }
    }

    /// Attach the correlation id of the related order.
    #[must_use]
    pub fn with_related_order(mut self, related_order_id: Option<String>) -> Self {
        self.related_order_id = related_order_id;
        self
    }

    /// Signed effect of this transaction on the balance.
    #[must_use]
    pub const fn signed_amount(&self) -> i64 {
        if self.kind.is_debit() {
            -self.amount
        } else {
            self.amount
        }
    }
}

/// Kind of ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Points added (plan grant, admin credit).
    Credit,

    /// Points removed (usage, admin debit).
    Debit,

    /// Points returned after a failed downstream action.
    Refund,
}

impl TransactionKind {
    /// Check if this kind removes points.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Debit)
    }

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Refund => "refund",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_amount_is_magnitude() {
        let tx = LedgerTransaction::debit(UserId::generate(), -30, 70, "Social post".into());
        assert_eq!(tx.amount, 30);
        assert_eq!(tx.kind, TransactionKind::Debit);
        assert_eq!(tx.signed_amount(), -30);
        assert!(!tx.admin_adjustment);
    }

    #[test]
    fn admin_adjustment_direction_follows_delta() {
        let user_id = UserId::generate();
        let credit = LedgerTransaction::admin_adjustment(user_id.clone(), 50, 80, "bonus".into());
        let debit = LedgerTransaction::admin_adjustment(user_id, -50, -20, "correction".into());

        assert_eq!(credit.kind, TransactionKind::Credit);
        assert_eq!(debit.kind, TransactionKind::Debit);
        assert_eq!(debit.amount, 50);
        assert!(credit.admin_adjustment && debit.admin_adjustment);
    }

    #[test]
    fn related_order_is_attached() {
        let tx = LedgerTransaction::refund(UserId::generate(), 10, 100, "Refund: Ad Failed".into())
            .with_related_order(Some("order-42".into()));
        assert_eq!(tx.related_order_id.as_deref(), Some("order-42"));
        assert_eq!(tx.signed_amount(), 10);
    }

    #[test]
    fn kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Refund).unwrap(),
            "\"refund\""
        );
        assert_eq!(TransactionKind::Credit.as_str(), "credit");
    }
}
