//! Application state.

use std::sync::Arc;

use points_ledger_store::Store;

use crate::admin::AdminFacade;
use crate::config::ServiceConfig;
use crate::ledger::{Bootstrap, Ledger};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Deduct/refund engine.
    pub ledger: Ledger,

    /// Privileged adjustments.
    pub admin: AdminFacade,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let attempts = config.max_transaction_attempts;

        if config.auth_jwt_secret.is_none() {
            tracing::warn!("AUTH_JWT_SECRET not configured - user endpoints will reject all tokens");
        }
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - deduct/refund endpoints are unreachable");
        }

        Self {
            ledger: Ledger::new(Arc::clone(&store), attempts),
            admin: AdminFacade::new(Arc::clone(&store), attempts),
            store,
            config,
        }
    }

    /// What a new account for this email starts with.
    #[must_use]
    pub fn bootstrap_for(&self, email: Option<&str>) -> Bootstrap {
        if self.config.is_bootstrap_admin(email) {
            Bootstrap {
                admin: true,
                welcome_bonus: self.config.admin_welcome_bonus,
            }
        } else {
            Bootstrap::default()
        }
    }
}
