//! # Cash Register Repository
//!
//! The till row, its append-only movement ledger and the tickets printed
//! at each close.
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    lock() - first statement of every ledger tx          │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT INTO cash_registers (...) VALUES (id, closed, 0, ...)        │
//! │    ON CONFLICT(id) DO UPDATE SET lock_version = lock_version + 1        │
//! │    RETURNING *                                                          │
//! │         │                                                               │
//! │         ├── takes the SQLite write lock; a second writer waits here    │
//! │         │   (busy_timeout) until the first one commits                  │
//! │         └── returns the row as this transaction will see it            │
//! │                                                                         │
//! │    ... read session totals, plan, write ...                            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here updates or deletes a movement or ticket; the schema
//! rejects it with a trigger.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use poli_core::register::SessionTotals;
use poli_core::{
    CashMovement, CashRegister, CashTicket, Money, Page, PageRequest, PaymentMethod,
};

const REGISTER_COLUMNS: &str = "id, is_open, current_balance, opening_amount, session_id, \
     last_opened_at, last_closed_at, lock_version, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, cash_register_id, session_id, user_id, movement_type, \
     amount, description, sale_id, created_at";

const TICKET_COLUMNS: &str = "id, cash_register_id, session_id, user_id, opened_at, closed_at, \
     hours_open, opening_amount, cash_total, card_total, transfer_total, total_sales, \
     sales_count, extractions_total, expected_balance, counted_amount, difference, created_at";

/// Read access to the till.
///
/// Writes go through [`crate::LedgerEngine`].
#[derive(Debug, Clone)]
pub struct CashRegisterRepository {
    pool: SqlitePool,
}

impl CashRegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterRepository { pool }
    }

    /// Returns the register row, creating it closed with a zero balance if
    /// it does not exist yet.
    pub async fn get_or_create(&self, id: &str) -> DbResult<CashRegister> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO cash_registers (
                id, is_open, current_balance, opening_amount, lock_version, created_at, updated_at
            ) VALUES (?1, 0, 0, 0, 0, ?2, ?2)
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {REGISTER_COLUMNS} FROM cash_registers WHERE id = ?1");
        let register = sqlx::query_as::<_, CashRegister>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(register)
    }

    /// Ledger lines of a register, newest first.
    pub async fn movements(&self, register_id: &str, page: PageRequest) -> DbResult<Page<CashMovement>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cash_movements WHERE cash_register_id = ?1")
                .bind(register_id)
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements WHERE cash_register_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
        );
        let items = sqlx::query_as::<_, CashMovement>(&sql)
            .bind(register_id)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }

    /// Movements of a register within `[from, to)`, oldest first.
    pub async fn movements_between(
        &self,
        register_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<CashMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements \
             WHERE cash_register_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
             ORDER BY created_at, rowid"
        );
        let movements = sqlx::query_as::<_, CashMovement>(&sql)
            .bind(register_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(movements)
    }

    /// Close tickets, most recent first.
    pub async fn tickets(&self, page: PageRequest) -> DbResult<Page<CashTicket>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cash_tickets")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM cash_tickets ORDER BY closed_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        );
        let items = sqlx::query_as::<_, CashTicket>(&sql)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn ticket(&self, id: &str) -> DbResult<Option<CashTicket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM cash_tickets WHERE id = ?1");
        let ticket = sqlx::query_as::<_, CashTicket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Locks the register row for the rest of the transaction and returns it.
///
/// Creates the row (closed, zero balance) on first use.
pub async fn lock(conn: &mut SqliteConnection, id: &str) -> DbResult<CashRegister> {
    let now = Utc::now();
    let sql = format!(
        r#"
        INSERT INTO cash_registers (
            id, is_open, current_balance, opening_amount, lock_version, created_at, updated_at
        ) VALUES (?1, 0, 0, 0, 0, ?2, ?2)
        ON CONFLICT(id) DO UPDATE SET lock_version = lock_version + 1
        RETURNING {REGISTER_COLUMNS}
        "#
    );
    let register = sqlx::query_as::<_, CashRegister>(&sql)
        .bind(id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    debug!(
        register_id = %register.id,
        lock_version = register.lock_version,
        is_open = register.is_open,
        "Cash register locked"
    );
    Ok(register)
}

/// Writes the register's mutable state back.
pub async fn save(conn: &mut SqliteConnection, register: &CashRegister) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE cash_registers
        SET is_open = ?2, current_balance = ?3, opening_amount = ?4, session_id = ?5,
            last_opened_at = ?6, last_closed_at = ?7, updated_at = ?8
        WHERE id = ?1
        "#,
    )
    .bind(&register.id)
    .bind(register.is_open)
    .bind(register.current_balance)
    .bind(register.opening_amount)
    .bind(&register.session_id)
    .bind(register.last_opened_at)
    .bind(register.last_closed_at)
    .bind(register.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("CashRegister", &register.id));
    }
    Ok(())
}

/// Appends a ledger line.
pub async fn insert_movement(conn: &mut SqliteConnection, movement: &CashMovement) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_movements (
            id, cash_register_id, session_id, user_id, movement_type,
            amount, description, sale_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.cash_register_id)
    .bind(&movement.session_id)
    .bind(&movement.user_id)
    .bind(movement.movement_type)
    .bind(movement.amount)
    .bind(&movement.description)
    .bind(&movement.sale_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Stores the reconciliation ticket of a closed session.
pub async fn insert_ticket(conn: &mut SqliteConnection, ticket: &CashTicket) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_tickets (
            id, cash_register_id, session_id, user_id, opened_at, closed_at, hours_open,
            opening_amount, cash_total, card_total, transfer_total, total_sales, sales_count,
            extractions_total, expected_balance, counted_amount, difference, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
        "#,
    )
    .bind(&ticket.id)
    .bind(&ticket.cash_register_id)
    .bind(&ticket.session_id)
    .bind(&ticket.user_id)
    .bind(ticket.opened_at)
    .bind(ticket.closed_at)
    .bind(ticket.hours_open)
    .bind(ticket.opening_amount)
    .bind(ticket.cash_total)
    .bind(ticket.card_total)
    .bind(ticket.transfer_total)
    .bind(ticket.total_sales)
    .bind(ticket.sales_count)
    .bind(ticket.extractions_total)
    .bind(ticket.expected_balance)
    .bind(ticket.counted_amount)
    .bind(ticket.difference)
    .bind(ticket.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Sales per payment method and extractions of one session.
pub async fn session_totals(conn: &mut SqliteConnection, session_id: &str) -> DbResult<SessionTotals> {
    let by_method: Vec<(PaymentMethod, i64, i64)> = sqlx::query_as(
        r#"
        SELECT payment_method, COALESCE(SUM(total), 0), COUNT(*)
        FROM sales
        WHERE session_id = ?1
        GROUP BY payment_method
        "#,
    )
    .bind(session_id)
    .fetch_all(&mut *conn)
    .await?;

    let extractions: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM cash_movements
        WHERE session_id = ?1 AND movement_type = 'EXTRACTION'
        "#,
    )
    .bind(session_id)
    .fetch_one(&mut *conn)
    .await?;

    let mut totals = SessionTotals::default();
    for (method, total, count) in by_method {
        totals.record_sale(method, Money::new(total), count);
    }
    totals.record_extraction(Money::new(extractions));
    Ok(totals)
}

/// Ledger lines of one session, oldest first.
pub async fn session_movements(conn: &mut SqliteConnection, session_id: &str) -> DbResult<Vec<CashMovement>> {
    let sql = format!(
        "SELECT {MOVEMENT_COLUMNS} FROM cash_movements WHERE session_id = ?1 ORDER BY created_at, rowid"
    );
    let movements = sqlx::query_as::<_, CashMovement>(&sql)
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(movements)
}
