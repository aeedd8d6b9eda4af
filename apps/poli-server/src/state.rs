//! Shared handler state.

use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use crate::config::{ConfigError, ServerConfig};
use poli_core::Caller;
use poli_db::{AuditAction, Database, LedgerEngine};

/// State cloned into every handler. Clones share the pool.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub ledger: LedgerEngine,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Result<Self, ConfigError> {
        let ledger = db.ledger(config.ledger_config()?);
        Ok(AppState {
            db,
            ledger,
            config: Arc::new(config),
        })
    }

    /// Records an audit entry for a committed change.
    ///
    /// A failure is logged and swallowed: the change itself already stands.
    pub async fn audit<T: Serialize>(
        &self,
        caller: &Caller,
        action: AuditAction,
        table_name: &str,
        record_id: &str,
        before: Option<&T>,
        after: Option<&T>,
    ) {
        let old_values = before.and_then(|v| serde_json::to_value(v).ok());
        let new_values = after.and_then(|v| serde_json::to_value(v).ok());

        if let Err(e) = self
            .db
            .audit()
            .record(&caller.user_id, action, table_name, record_id, old_values, new_values)
            .await
        {
            error!(
                action = action.as_str(),
                table_name,
                record_id,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}
