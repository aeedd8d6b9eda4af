//! # System Config Repository
//!
//! The single `system_config` row. It is created with defaults the first
//! time anyone reads it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::Updated;
use crate::error::{DbResult, PosResult};
use poli_core::validation::validate_system_config;
use poli_core::{Caller, CoreError, SystemConfig};

const CONFIG_COLUMNS: &str = r#"
    restaurant_name, address, phone, ruc, iva_rate, printer_ip, printer_port,
    paper_width, logo_url, footer_message, password_expiry_days,
    max_failed_attempts, session_timeout_minutes, enable_audit_log,
    auto_backup, backup_frequency
"#;

#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ConfigRepository { pool }
    }

    /// Current settings, inserting the defaults on first use.
    pub async fn get(&self) -> DbResult<SystemConfig> {
        let mut conn = self.pool.acquire().await?;
        insert_defaults(&mut conn).await?;
        load(&mut conn).await
    }

    /// Replaces the settings. SYSADMIN only.
    ///
    /// ## User Workflow
    /// ```text
    /// PUT /api/config
    ///      │
    ///      ▼
    /// caller.role == SYSADMIN? ── no ──► Forbidden
    ///      │ yes
    ///      ▼
    /// validate_system_config ── bad ──► InvalidInput
    ///      │
    ///      ▼
    /// UPDATE system_config (one tx) ──► Updated { before, after } for the audit trail
    /// ```
    pub async fn update(&self, caller: &Caller, config: SystemConfig) -> PosResult<Updated<SystemConfig>> {
        if !caller.role.can_configure() {
            return Err(CoreError::Forbidden {
                role: caller.role.to_string(),
                action: "change system configuration".to_string(),
            }
            .into());
        }
        validate_system_config(&config)?;

        let mut tx = self.pool.begin().await?;
        insert_defaults(&mut tx).await?;
        let before = load(&mut tx).await?;

        sqlx::query(
            r#"
            UPDATE system_config SET
                restaurant_name = ?1, address = ?2, phone = ?3, ruc = ?4, iva_rate = ?5,
                printer_ip = ?6, printer_port = ?7, paper_width = ?8, logo_url = ?9,
                footer_message = ?10, password_expiry_days = ?11, max_failed_attempts = ?12,
                session_timeout_minutes = ?13, enable_audit_log = ?14, auto_backup = ?15,
                backup_frequency = ?16, updated_at = ?17
            WHERE id = 'system'
            "#,
        )
        .bind(&config.restaurant_name)
        .bind(&config.address)
        .bind(&config.phone)
        .bind(&config.ruc)
        .bind(config.iva_rate)
        .bind(&config.printer_ip)
        .bind(config.printer_port)
        .bind(config.paper_width)
        .bind(&config.logo_url)
        .bind(&config.footer_message)
        .bind(config.password_expiry_days)
        .bind(config.max_failed_attempts)
        .bind(config.session_timeout_minutes)
        .bind(config.enable_audit_log)
        .bind(config.auto_backup)
        .bind(&config.backup_frequency)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id = %caller.user_id, "System configuration updated");
        Ok(Updated {
            before,
            after: config,
        })
    }
}

async fn insert_defaults(conn: &mut SqliteConnection) -> DbResult<()> {
    let d = SystemConfig::default();
    sqlx::query(&format!(
        r#"
        INSERT OR IGNORE INTO system_config (id, {CONFIG_COLUMNS}, updated_at)
        VALUES ('system', ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        "#
    ))
    .bind(&d.restaurant_name)
    .bind(&d.address)
    .bind(&d.phone)
    .bind(&d.ruc)
    .bind(d.iva_rate)
    .bind(&d.printer_ip)
    .bind(d.printer_port)
    .bind(d.paper_width)
    .bind(&d.logo_url)
    .bind(&d.footer_message)
    .bind(d.password_expiry_days)
    .bind(d.max_failed_attempts)
    .bind(d.session_timeout_minutes)
    .bind(d.enable_audit_log)
    .bind(d.auto_backup)
    .bind(&d.backup_frequency)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn load(conn: &mut SqliteConnection) -> DbResult<SystemConfig> {
    let config = sqlx::query_as::<_, SystemConfig>(&format!(
        "SELECT {CONFIG_COLUMNS} FROM system_config WHERE id = 'system'"
    ))
    .fetch_one(&mut *conn)
    .await?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use poli_core::{ErrorKind, Role};

    #[tokio::test]
    async fn test_defaults_created_on_first_read() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = db.system_config().get().await.unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[tokio::test]
    async fn test_only_sysadmin_updates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.system_config();
        let mut wanted = SystemConfig::default();
        wanted.restaurant_name = "Poli Pizzería".to_string();
        wanted.paper_width = 80;

        let err = repo
            .update(&Caller::new("admin-1", Role::Admin), wanted.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let changed = repo
            .update(&Caller::new("root-1", Role::Sysadmin), wanted.clone())
            .await
            .unwrap();
        assert_eq!(changed.before, SystemConfig::default());
        assert_eq!(repo.get().await.unwrap(), wanted);
    }
}
