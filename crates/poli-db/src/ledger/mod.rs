//! # Ledger Engine
//!
//! The only writer of money state: opening the till, taking cash out,
//! closing the till and booking sales. Each operation is one SQLite
//! transaction that either commits completely or leaves no trace.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Every ledger operation                                 │
//! │                                                                         │
//! │  validate input (no tx yet) ──── bad ───────────────► InvalidInput     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │  lock register row (upsert, lock_version + 1) ◄── writers queue here   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_* on the locked snapshot ── rejected ──► drop tx (ROLLBACK)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  writes: register, movement, sale rows, stock, ticket                  │
//! │       │          any store error ──────────► drop tx (ROLLBACK)        │
//! │       ▼                                                                 │
//! │  COMMIT                                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  audit entry (failure logged, operation stays committed)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inside a transaction every read goes through the transaction's own
//! connection. The in-memory pool has a single connection, so touching the
//! pool there would wait on itself.

#[cfg(test)]
mod tests;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DbError, PosError, PosResult};
use crate::repository::audit::{AuditAction, AuditRepository};
use crate::repository::cash_register::{self, CashRegisterRepository};
use crate::repository::{client, product, sale};
use crate::DbResult;
use poli_core::order_number::{business_day, business_day_key, business_offset, format_order_number};
use poli_core::register::{self, SessionTotals};
use poli_core::validation::{validate_new_sale, validate_optional_text};
use poli_core::{
    Caller, CashMovement, CashMovementType, CashRegister, CoreError, Money, NewSale, Page,
    PageRequest, RegisterClosure, RegisterUpdate, Sale, SaleItem, SaleItemAddon, SaleLine,
    SaleWithItems, SessionSummary, ValidationError, CLOSING_DESCRIPTION,
    DEFAULT_BUSINESS_UTC_OFFSET_MINUTES, DEFAULT_CASH_REGISTER_ID, DEFAULT_EXTRACTION_DESCRIPTION,
    MAX_MONEY, OPENING_DESCRIPTION,
};

// =============================================================================
// Configuration
// =============================================================================

/// Which till the engine drives and which day order numbers belong to.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub register_id: String,
    /// Restaurant local time, used for the business day of order numbers.
    pub business_offset: FixedOffset,
}

impl LedgerConfig {
    /// Builds a config from an offset in minutes east of UTC.
    pub fn new(register_id: impl Into<String>, offset_minutes: i32) -> Result<Self, ValidationError> {
        Ok(LedgerConfig {
            register_id: register_id.into(),
            business_offset: business_offset(offset_minutes)?,
        })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            register_id: DEFAULT_CASH_REGISTER_ID.to_string(),
            business_offset: business_offset(DEFAULT_BUSINESS_UTC_OFFSET_MINUTES)
                .unwrap_or_else(|_| Utc.fix()),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Atomic till operations.
///
/// Cloning is cheap; clones share the pool.
///
/// ## Usage
/// ```rust,ignore
/// let ledger = db.ledger(LedgerConfig::default());
///
/// ledger.open_register(&caller, Money::new(50_000)).await?;
/// let sale = ledger.create_sale(&caller, cart).await?;
/// println!("Order {}", sale.sale.order_number);   // 17102026-001
/// let closure = ledger.close_register(&caller, Money::new(64_000)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    pool: SqlitePool,
    config: LedgerConfig,
    registers: CashRegisterRepository,
    audit: AuditRepository,
}

impl LedgerEngine {
    pub fn new(pool: SqlitePool, config: LedgerConfig) -> Self {
        LedgerEngine {
            registers: CashRegisterRepository::new(pool.clone()),
            audit: AuditRepository::new(pool.clone()),
            pool,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Today's business day in restaurant local time.
    pub fn business_day(&self) -> NaiveDate {
        business_day(Utc::now(), self.config.business_offset)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current register row (created closed on first use).
    pub async fn status(&self) -> DbResult<CashRegister> {
        self.registers.get_or_create(&self.config.register_id).await
    }

    /// Ledger lines, newest first.
    pub async fn movements(&self, page: PageRequest) -> DbResult<Page<CashMovement>> {
        self.registers.movements(&self.config.register_id, page).await
    }

    /// Live totals of the open session; zeros (with the balance) when closed.
    ///
    /// Shows what the close ticket would contain if the till closed now.
    pub async fn session_summary(&self) -> DbResult<SessionSummary> {
        self.status().await?;

        // One read transaction so register and totals come from the same snapshot.
        let mut tx = self.pool.begin().await?;
        let register = self.read_register(&mut tx).await?;
        let summary = match &register.session_id {
            Some(session_id) => {
                let totals = cash_register::session_totals(&mut tx, session_id).await?;
                totals.summarize(&register)
            }
            None => SessionTotals::default().summarize(&register),
        };
        tx.commit().await?;
        Ok(summary)
    }

    /// Difference between the balance and what the open session's movements
    /// explain. Zero for a healthy ledger and for a closed till.
    pub async fn verify_session(&self) -> DbResult<Money> {
        self.status().await?;

        let mut tx = self.pool.begin().await?;
        let register = self.read_register(&mut tx).await?;
        let drift = match &register.session_id {
            Some(session_id) => {
                let movements = cash_register::session_movements(&mut tx, session_id).await?;
                register::ledger_drift(&register, &movements)
            }
            None => Money::zero(),
        };
        tx.commit().await?;

        if !drift.is_zero() {
            error!(register_id = %register.id, %drift, "Cash register ledger drift detected");
        }
        Ok(drift)
    }

    // =========================================================================
    // Open
    // =========================================================================

    /// Opens the till with a counted float.
    ///
    /// ## When This Fails
    /// - Till already open → `InvalidState`
    /// - Negative amount → `InvalidInput`
    pub async fn open_register(&self, caller: &Caller, initial_amount: Money) -> PosResult<RegisterUpdate> {
        let result = self.open_register_tx(caller, initial_amount).await;
        let update = observe("open_register", result)?;

        info!(
            register_id = %update.cash_register.id,
            session_id = %update.movement.session_id,
            user_id = %caller.user_id,
            amount = %initial_amount,
            "Cash register opened"
        );
        self.record_audit(
            caller,
            AuditAction::OpenCashRegister,
            &update.cash_register.id,
            json!({ "initialAmount": initial_amount, "sessionId": update.movement.session_id }),
        )
        .await;

        Ok(update)
    }

    async fn open_register_tx(&self, caller: &Caller, initial_amount: Money) -> PosResult<RegisterUpdate> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut register = cash_register::lock(&mut tx, &self.config.register_id).await?;
        register::plan_open(&register, initial_amount)?;

        let session_id = Uuid::new_v4().to_string();
        register.is_open = true;
        register.current_balance = initial_amount;
        register.opening_amount = initial_amount;
        register.session_id = Some(session_id.clone());
        register.last_opened_at = Some(now);
        register.updated_at = now;
        cash_register::save(&mut tx, &register).await?;

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            cash_register_id: register.id.clone(),
            session_id,
            user_id: caller.user_id.clone(),
            movement_type: CashMovementType::Opening,
            amount: initial_amount,
            description: Some(OPENING_DESCRIPTION.to_string()),
            sale_id: None,
            created_at: now,
        };
        cash_register::insert_movement(&mut tx, &movement).await?;

        tx.commit().await?;
        Ok(RegisterUpdate {
            cash_register: register,
            movement,
        })
    }

    // =========================================================================
    // Extract
    // =========================================================================

    /// Takes cash out of an open till. ADMIN and SYSADMIN only.
    ///
    /// ## When This Fails
    /// - Cashier role → `Forbidden` (checked before any transaction)
    /// - Amount not positive → `InvalidInput`
    /// - Till closed → `InvalidState`
    /// - Amount above the balance → `InsufficientFunds`, nothing written
    pub async fn extract_cash(
        &self,
        caller: &Caller,
        amount: Money,
        description: Option<String>,
    ) -> PosResult<RegisterUpdate> {
        let result = self.extract_cash_tx(caller, amount, description).await;
        let update = observe("extract_cash", result)?;

        info!(
            register_id = %update.cash_register.id,
            user_id = %caller.user_id,
            amount = %amount,
            balance = %update.cash_register.current_balance,
            "Cash extracted"
        );
        self.record_audit(
            caller,
            AuditAction::ExtractCash,
            &update.cash_register.id,
            json!({
                "amount": amount,
                "description": update.movement.description,
                "balance": update.cash_register.current_balance,
            }),
        )
        .await;

        Ok(update)
    }

    async fn extract_cash_tx(
        &self,
        caller: &Caller,
        amount: Money,
        description: Option<String>,
    ) -> PosResult<RegisterUpdate> {
        register::authorize_extraction(caller, amount)?;
        validate_optional_text("description", description.as_deref(), 500)?;
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_EXTRACTION_DESCRIPTION.to_string());

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut register = cash_register::lock(&mut tx, &self.config.register_id).await?;
        let new_balance = register::plan_extraction(&register, amount)?;
        let session_id = open_session(&register)?;

        register.current_balance = new_balance;
        register.updated_at = now;
        cash_register::save(&mut tx, &register).await?;

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            cash_register_id: register.id.clone(),
            session_id,
            user_id: caller.user_id.clone(),
            movement_type: CashMovementType::Extraction,
            amount,
            description: Some(description),
            sale_id: None,
            created_at: now,
        };
        cash_register::insert_movement(&mut tx, &movement).await?;

        tx.commit().await?;
        Ok(RegisterUpdate {
            cash_register: register,
            movement,
        })
    }

    // =========================================================================
    // Close
    // =========================================================================

    /// Closes the till and produces the reconciliation ticket.
    ///
    /// `final_amount` is what the cashier counted; it is recorded on the
    /// ticket next to the expected balance. The stored balance is left as is.
    ///
    /// ## When This Fails
    /// - Till not open → `InvalidState`
    /// - Negative count → `InvalidInput`
    pub async fn close_register(&self, caller: &Caller, final_amount: Money) -> PosResult<RegisterClosure> {
        let result = self.close_register_tx(caller, final_amount).await;
        let closure = observe("close_register", result)?;

        let ticket = &closure.cash_ticket;
        if ticket.difference.is_zero() {
            info!(
                register_id = %ticket.cash_register_id,
                session_id = %ticket.session_id,
                total_sales = %ticket.total_sales,
                "Cash register closed"
            );
        } else {
            warn!(
                register_id = %ticket.cash_register_id,
                session_id = %ticket.session_id,
                expected = %ticket.expected_balance,
                counted = %ticket.counted_amount,
                difference = %ticket.difference,
                "Cash register closed with a difference"
            );
        }
        self.record_audit(
            caller,
            AuditAction::CloseCashRegister,
            &ticket.cash_register_id,
            json!({
                "finalAmount": final_amount,
                "cashTicketId": ticket.id,
                "expectedBalance": ticket.expected_balance,
                "difference": ticket.difference,
            }),
        )
        .await;

        Ok(closure)
    }

    async fn close_register_tx(&self, caller: &Caller, final_amount: Money) -> PosResult<RegisterClosure> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut register = cash_register::lock(&mut tx, &self.config.register_id).await?;
        register::plan_close(&register, final_amount)?;
        let session_id = open_session(&register)?;

        let totals = cash_register::session_totals(&mut tx, &session_id).await?;
        let ticket = register::build_close_ticket(
            Uuid::new_v4().to_string(),
            &register,
            &totals,
            final_amount,
            &caller.user_id,
            now,
        );
        if ticket.expected_balance != register.current_balance {
            warn!(
                register_id = %register.id,
                expected = %ticket.expected_balance,
                balance = %register.current_balance,
                "Session totals do not match the register balance"
            );
        }

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            cash_register_id: register.id.clone(),
            session_id,
            user_id: caller.user_id.clone(),
            movement_type: CashMovementType::Closing,
            amount: register.current_balance,
            description: Some(CLOSING_DESCRIPTION.to_string()),
            sale_id: None,
            created_at: now,
        };
        cash_register::insert_movement(&mut tx, &movement).await?;
        cash_register::insert_ticket(&mut tx, &ticket).await?;

        register.is_open = false;
        register.session_id = None;
        register.last_closed_at = Some(now);
        register.updated_at = now;
        cash_register::save(&mut tx, &register).await?;

        tx.commit().await?;
        Ok(RegisterClosure {
            cash_register: register,
            movement,
            cash_ticket: ticket,
        })
    }

    // =========================================================================
    // Sale
    // =========================================================================

    /// Books a sale against the open till.
    ///
    /// ## What Happens (one transaction)
    /// 1. Lock the register; reject with `RegisterClosed` if it is not open
    /// 2. Resolve client, products, second flavors and addons (`NotFound`)
    /// 3. Allocate the order number from the per-day counter
    /// 4. Insert sale, lines and addons with name/price snapshots
    /// 5. Decrement tracked stock (may go negative, logged)
    /// 6. Add the total to the balance and append the SALE movement
    ///
    /// Unit prices already include addons and extras. Prices, line subtotals
    /// and total are stored as submitted.
    pub async fn create_sale(&self, caller: &Caller, new_sale: NewSale) -> PosResult<SaleWithItems> {
        let result = self.create_sale_tx(caller, new_sale).await;
        let created = observe("create_sale", result)?;

        info!(
            sale_id = %created.sale.id,
            order_number = %created.sale.order_number,
            total = %created.sale.total,
            payment_method = ?created.sale.payment_method,
            lines = created.items.len(),
            "Sale created"
        );
        self.record_audit(
            caller,
            AuditAction::CreateSale,
            &created.sale.id,
            json!({
                "orderNumber": created.sale.order_number,
                "total": created.sale.total,
                "paymentMethod": created.sale.payment_method,
                "items": created.items.len(),
            }),
        )
        .await;

        Ok(created)
    }

    async fn create_sale_tx(&self, caller: &Caller, new_sale: NewSale) -> PosResult<SaleWithItems> {
        validate_new_sale(&new_sale)?;

        let now = Utc::now();
        let day = business_day(now, self.config.business_offset);
        let mut tx = self.pool.begin().await?;

        let mut register = cash_register::lock(&mut tx, &self.config.register_id).await?;
        let new_balance = register::plan_sale(&register, new_sale.total)?;
        let session_id = open_session(&register)?;

        if let Some(client_id) = &new_sale.client_id {
            if !client::exists(&mut tx, client_id).await? {
                return Err(CoreError::not_found("Client", client_id).into());
            }
        }

        // Resolve every reference before writing anything.
        let sale_id = Uuid::new_v4().to_string();
        let mut lines = Vec::with_capacity(new_sale.items.len());

        for (index, item) in new_sale.items.iter().enumerate() {
            let product = product::fetch(&mut tx, &item.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &item.product_id))?;

            let second_flavor = match &item.second_flavor {
                Some(flavor) => Some(
                    product::fetch(&mut tx, &flavor.product_id)
                        .await?
                        .ok_or_else(|| CoreError::not_found("Product", &flavor.product_id))?,
                ),
                None => None,
            };

            let subtotal = item.subtotal().ok_or_else(|| ValidationError::OutOfRange {
                field: format!("items[{index}].subtotal"),
                min: 0,
                max: MAX_MONEY,
            })?;

            let item_id = Uuid::new_v4().to_string();
            let mut addons = Vec::with_capacity(item.addons.len());
            for requested in &item.addons {
                let addon = product::fetch_addon(&mut tx, &requested.addon_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("ProductAddon", &requested.addon_id))?;
                addons.push(SaleItemAddon {
                    id: Uuid::new_v4().to_string(),
                    sale_item_id: item_id.clone(),
                    addon_id: addon.id,
                    addon_name: addon.name,
                    quantity: requested.quantity,
                    price: addon.price,
                });
            }

            lines.push(SaleLine {
                item: SaleItem {
                    id: item_id,
                    sale_id: sale_id.clone(),
                    product_id: product.id,
                    product_name: product.name,
                    quantity: item.quantity,
                    price: item.price,
                    subtotal,
                    second_flavor_product_id: second_flavor.as_ref().map(|p| p.id.clone()),
                    second_flavor_product_name: second_flavor.map(|p| p.name),
                    comments: item.comments.clone(),
                    other_ingredient: item.other_ingredient.clone(),
                    line_number: index as i64 + 1,
                },
                addons,
            });
        }

        match register::expected_sale_total(&new_sale) {
            Some(expected) if expected == new_sale.total => {}
            Some(expected) => warn!(
                submitted = %new_sale.total,
                computed = %expected,
                "Sale total differs from its lines; charging the submitted total"
            ),
            None => warn!(
                submitted = %new_sale.total,
                "Sale lines overflow when summed; charging the submitted total"
            ),
        }

        let day_key = business_day_key(day);
        let sequence = sale::next_order_sequence(&mut tx, &day_key).await?;
        let order_number = format_order_number(day, sequence);
        debug!(%order_number, sequence, business_day = %day_key, "Order number allocated");

        let sale = Sale {
            id: sale_id,
            order_number,
            client_id: new_sale.client_id.clone(),
            user_id: caller.user_id.clone(),
            cash_register_id: register.id.clone(),
            session_id: session_id.clone(),
            total: new_sale.total,
            discount: new_sale.discount,
            delivery_cost: new_sale.delivery_cost,
            payment_method: new_sale.payment_method,
            order_type: new_sale.order_type,
            business_day: day_key,
            created_at: now,
        };
        sale::insert_sale(&mut tx, &sale).await?;

        for line in &lines {
            sale::insert_item(&mut tx, &line.item).await?;
            for addon in &line.addons {
                sale::insert_addon(&mut tx, addon).await?;
            }
            if let Some(remaining) =
                product::take_stock(&mut tx, &line.item.product_id, line.item.quantity).await?
            {
                if remaining < 0 {
                    warn!(
                        product_id = %line.item.product_id,
                        product = %line.item.product_name,
                        stock = remaining,
                        "Product sold past zero stock"
                    );
                }
            }
        }

        register.current_balance = new_balance;
        register.updated_at = now;
        cash_register::save(&mut tx, &register).await?;

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            cash_register_id: register.id.clone(),
            session_id,
            user_id: caller.user_id.clone(),
            movement_type: CashMovementType::Sale,
            amount: sale.total,
            description: Some(format!("Venta #{}", sale.order_number)),
            sale_id: Some(sale.id.clone()),
            created_at: now,
        };
        cash_register::insert_movement(&mut tx, &movement).await?;

        tx.commit().await?;
        Ok(SaleWithItems { sale, items: lines })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn read_register(&self, conn: &mut sqlx::SqliteConnection) -> DbResult<CashRegister> {
        let register = sqlx::query_as::<_, CashRegister>(
            r#"
            SELECT id, is_open, current_balance, opening_amount, session_id,
                   last_opened_at, last_closed_at, lock_version, created_at, updated_at
            FROM cash_registers WHERE id = ?1
            "#,
        )
        .bind(&self.config.register_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("CashRegister", &self.config.register_id))?;
        Ok(register)
    }

    async fn record_audit(
        &self,
        caller: &Caller,
        action: AuditAction,
        record_id: &str,
        new_values: serde_json::Value,
    ) {
        let table_name = match action {
            AuditAction::CreateSale => "sales",
            _ => "cash_registers",
        };
        if let Err(err) = self
            .audit
            .record(&caller.user_id, action, table_name, record_id, None, Some(new_values))
            .await
        {
            error!(
                action = action.as_str(),
                record_id,
                error = %err,
                "Audit entry not written; the operation itself is committed"
            );
        }
    }
}

/// Session id of a register already checked to be open.
fn open_session(register: &CashRegister) -> Result<String, DbError> {
    register
        .session_id
        .clone()
        .ok_or_else(|| DbError::Internal(format!("open register {} has no session", register.id)))
}

/// Logs a failed operation by cause. Rejections are expected traffic; store
/// failures are not.
fn observe<T>(operation: &'static str, result: PosResult<T>) -> PosResult<T> {
    match &result {
        Err(PosError::Rejected(reason)) => {
            warn!(operation, kind = ?reason.kind(), %reason, "Ledger operation rejected");
        }
        Err(PosError::Store(cause)) => {
            error!(operation, error = %cause, "Ledger operation failed and was rolled back");
        }
        Ok(_) => {}
    }
    result
}
