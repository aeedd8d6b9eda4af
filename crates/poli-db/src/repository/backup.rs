//! # Backup Repository
//!
//! Point-in-time copies of the whole database.
//!
//! ## How a Backup Is Taken
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller.role == SYSADMIN? ── no ──► Forbidden                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  VACUUM INTO '<dir>/poli-backup-<timestamp>-<id>.db'                   │
//! │       │   one consistent snapshot, even while the till keeps selling   │
//! │       ▼                                                                 │
//! │  open the copy read-only, count rows per table ──► BackupInfo          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, PosResult};
use poli_core::{BackupInfo, Caller, CoreError, TableRowCount};

/// Tables reported in the backup summary, in schema order.
pub const BACKUP_TABLES: [&str; 15] = [
    "users",
    "clients",
    "products",
    "product_addons",
    "ingredients",
    "inventory_movements",
    "cash_registers",
    "daily_order_counters",
    "sales",
    "sale_items",
    "sale_item_addons",
    "cash_movements",
    "cash_tickets",
    "audit_logs",
    "system_config",
];

#[derive(Debug, Clone)]
pub struct BackupRepository {
    pool: SqlitePool,
}

impl BackupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BackupRepository { pool }
    }

    /// Writes a full copy of the database into `dir`. SYSADMIN only.
    ///
    /// ## When This Fails
    /// - Caller is not SYSADMIN → `Forbidden`, nothing written
    /// - Directory cannot be created or the copy cannot be read back →
    ///   `DbError::BackupFailed`
    pub async fn create(&self, caller: &Caller, dir: &Path) -> PosResult<BackupInfo> {
        if !caller.role.can_configure() {
            return Err(CoreError::Forbidden {
                role: caller.role.to_string(),
                action: "create a backup".to_string(),
            }
            .into());
        }

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DbError::BackupFailed(format!("{}: {e}", dir.display())))?;

        let created_at = Utc::now();
        let file_name = format!(
            "poli-backup-{}-{}.db",
            created_at.format("%Y%m%d-%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let path = dir.join(&file_name);
        let path_text = path.to_string_lossy().into_owned();

        debug!(path = %path_text, "Writing database backup");
        sqlx::query("VACUUM INTO ?1")
            .bind(&path_text)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        let tables = count_rows(&path).await?;
        let size_bytes = tokio::fs::metadata(&path)
            .await
            .map_err(|e| DbError::BackupFailed(format!("{path_text}: {e}")))?
            .len() as i64;

        info!(
            path = %path_text,
            size_bytes,
            requested_by = %caller.user_id,
            "Database backup written"
        );

        Ok(BackupInfo {
            file_name,
            path: path_text,
            size_bytes,
            tables,
            created_at,
        })
    }
}

/// Opens the copy read-only and counts the rows of every table.
async fn count_rows(path: &Path) -> Result<Vec<TableRowCount>, DbError> {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .read_only(true)
        .connect()
        .await
        .map_err(|e| DbError::BackupFailed(format!("cannot open copy: {e}")))?;

    let mut tables = Vec::with_capacity(BACKUP_TABLES.len());
    for table in BACKUP_TABLES {
        let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&mut conn)
            .await?;
        tables.push(TableRowCount {
            table: table.to_string(),
            rows,
        });
    }

    conn.close().await?;
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use poli_core::{ErrorKind, Money, NewProduct, ProductStatus, Role};

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("poli-backups-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_backup_copies_every_table() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .create(NewProduct {
                name: "Muzzarella".to_string(),
                description: None,
                price: Money::new(45_000),
                category: "Pizzas".to_string(),
                status: ProductStatus::Active,
                stock: None,
            })
            .await
            .unwrap();

        let dir = temp_dir();
        let info = db
            .backups()
            .create(&Caller::new("root", Role::Sysadmin), &dir)
            .await
            .unwrap();

        assert!(info.file_name.starts_with("poli-backup-"));
        assert!(Path::new(&info.path).exists());
        assert!(info.size_bytes > 0);
        assert_eq!(info.tables.len(), BACKUP_TABLES.len());
        let products = info.tables.iter().find(|t| t.table == "products").unwrap();
        assert_eq!(products.rows, 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_only_sysadmin_can_back_up() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dir = temp_dir();

        let err = db
            .backups()
            .create(&Caller::new("admin", Role::Admin), &dir)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(!dir.exists());
    }
}
