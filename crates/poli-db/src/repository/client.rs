//! # Client Repository
//!
//! Customers that sales can be attributed to.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::like_pattern;
use crate::error::{DbResult, PosResult};
use poli_core::validation::validate_new_client;
use poli_core::{Client, NewClient, Page, PageRequest};

const CLIENT_COLUMNS: &str =
    "id, name, last_name, email, phone, cedula, ruc, requires_invoice, created_at";

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Registers a client. Blank optional fields are stored as NULL.
    pub async fn create(&self, new: NewClient) -> PosResult<Client> {
        validate_new_client(&new)?;

        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            email: non_blank(new.email),
            phone: non_blank(new.phone),
            cedula: non_blank(new.cedula),
            ruc: non_blank(new.ruc),
            requires_invoice: new.requires_invoice,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, name, last_name, email, phone, cedula, ruc, requires_invoice, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.cedula)
        .bind(&client.ruc)
        .bind(client.requires_invoice)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        info!(client_id = %client.id, "Client created");
        Ok(client)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Client>> {
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    /// Lists clients, optionally filtered by name, last name, cedula or RUC.
    pub async fn list(&self, search: Option<&str>, page: PageRequest) -> DbResult<Page<Client>> {
        let search = search.filter(|s| !s.trim().is_empty()).map(like_pattern);

        let filter = r#"
            WHERE ?1 IS NULL
               OR name LIKE ?1 ESCAPE '\'
               OR last_name LIKE ?1 ESCAPE '\'
               OR cedula LIKE ?1 ESCAPE '\'
               OR ruc LIKE ?1 ESCAPE '\'
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM clients {filter}"))
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients {filter} ORDER BY last_name, name LIMIT ?2 OFFSET ?3"
        );
        let items = sqlx::query_as::<_, Client>(&sql)
            .bind(&search)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }
}

/// Whether a client exists, on the given connection.
pub async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM clients WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
