//! # Audit Repository
//!
//! Append-only trail of who changed what. Entries are written after the
//! change they describe has committed.

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use poli_core::AuditLog;

/// Audited actions, stored by their SCREAMING_SNAKE_CASE name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    OpenCashRegister,
    ExtractCash,
    CloseCashRegister,
    CreateSale,
    CreateProduct,
    UpdateProduct,
    DeactivateProduct,
    CreateProductAddon,
    CreateClient,
    CreateUser,
    CreateIngredient,
    InventoryMovement,
    UpdateConfig,
    CreateBackup,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::OpenCashRegister => "OPEN_CASH_REGISTER",
            AuditAction::ExtractCash => "EXTRACT_CASH",
            AuditAction::CloseCashRegister => "CLOSE_CASH_REGISTER",
            AuditAction::CreateSale => "CREATE_SALE",
            AuditAction::CreateProduct => "CREATE_PRODUCT",
            AuditAction::UpdateProduct => "UPDATE_PRODUCT",
            AuditAction::DeactivateProduct => "DEACTIVATE_PRODUCT",
            AuditAction::CreateProductAddon => "CREATE_PRODUCT_ADDON",
            AuditAction::CreateClient => "CREATE_CLIENT",
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::CreateIngredient => "CREATE_INGREDIENT",
            AuditAction::InventoryMovement => "INVENTORY_MOVEMENT",
            AuditAction::UpdateConfig => "UPDATE_CONFIG",
            AuditAction::CreateBackup => "CREATE_BACKUP",
        }
    }
}

/// Repository for the audit trail.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends an entry unless auditing is switched off in system config.
    ///
    /// Returns whether an entry was written.
    pub async fn record(
        &self,
        user_id: &str,
        action: AuditAction,
        table_name: &str,
        record_id: &str,
        old_values: Option<Value>,
        new_values: Option<Value>,
    ) -> DbResult<bool> {
        let enabled: Option<bool> =
            sqlx::query_scalar("SELECT enable_audit_log FROM system_config WHERE id = 'system'")
                .fetch_optional(&self.pool)
                .await?;
        if enabled == Some(false) {
            return Ok(false);
        }

        debug!(action = action.as_str(), table_name, record_id, "Recording audit entry");

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, user_id, action, table_name, record_id,
                old_values, new_values, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(action.as_str())
        .bind(table_name)
        .bind(record_id)
        .bind(old_values.map(|v| v.to_string()))
        .bind(new_values.map(|v| v.to_string()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    /// Entries for one record, oldest first.
    pub async fn for_record(&self, table_name: &str, record_id: &str) -> DbResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, action, table_name, record_id,
                   old_values, new_values, created_at
            FROM audit_logs
            WHERE table_name = ?1 AND record_id = ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(table_name)
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<AuditLog>> {
        let entries = sqlx::query_as::<_, AuditLog>(
            r#"
            SELECT id, user_id, action, table_name, record_id,
                   old_values, new_values, created_at
            FROM audit_logs
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
