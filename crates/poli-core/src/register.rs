//! # Till Transition Rules
//!
//! Pure decisions for the four ledger operations. The engine loads the
//! locked register row, calls one of these, and only writes when the answer
//! is `Ok`.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   CLOSED ──plan_open(initial ≥ 0)──► OPEN                               │
//! │     ▲                                 │  plan_sale(total)      +total   │
//! │     │                                 │  plan_extraction(amt)  -amt     │
//! │     └──────plan_close(final ≥ 0)──────┘    (amt ≤ balance)              │
//! │                                                                         │
//! │   Every rejection happens here, before the engine writes anything.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    CashMovement, CashRegister, CashTicket, Caller, NewSale, PaymentMethod, SessionSummary,
};
use crate::error::ValidationError;
use crate::validation::{validate_non_negative, validate_positive};
use crate::MAX_MONEY;

// =============================================================================
// Transition Rules
// =============================================================================

/// Decides whether the till may be opened with `initial_amount`.
pub fn plan_open(register: &CashRegister, initial_amount: Money) -> CoreResult<()> {
    validate_non_negative("initialAmount", initial_amount)?;
    if register.is_open {
        return Err(CoreError::RegisterAlreadyOpen);
    }
    Ok(())
}

/// Checks role and amount of an extraction. Needs no register state, so the
/// engine runs it before opening a transaction.
pub fn authorize_extraction(caller: &Caller, amount: Money) -> CoreResult<()> {
    if !caller.role.can_manage_cash() {
        return Err(CoreError::Forbidden {
            role: caller.role.to_string(),
            action: "extract cash".to_string(),
        });
    }
    validate_positive("amount", amount)?;
    Ok(())
}

/// Decides an extraction against the locked register. Returns the new balance.
///
/// ## Example
/// ```rust
/// # use chrono::Utc;
/// # use poli_core::{CashRegister, Money, CoreError};
/// # use poli_core::register::plan_extraction;
/// # let now = Utc::now();
/// # let register = CashRegister {
/// #     id: "r".into(), is_open: true, current_balance: Money::new(30_000),
/// #     opening_amount: Money::new(50_000), session_id: Some("s".into()),
/// #     last_opened_at: Some(now), last_closed_at: None, lock_version: 1,
/// #     created_at: now, updated_at: now,
/// # };
/// assert_eq!(plan_extraction(&register, Money::new(20_000)).unwrap(), Money::new(10_000));
/// assert!(matches!(
///     plan_extraction(&register, Money::new(40_000)),
///     Err(CoreError::InsufficientFunds { .. })
/// ));
/// ```
pub fn plan_extraction(register: &CashRegister, amount: Money) -> CoreResult<Money> {
    if !register.is_open {
        return Err(CoreError::RegisterNotOpen {
            action: "extract cash".to_string(),
        });
    }
    register
        .current_balance
        .checked_withdraw(amount)
        .ok_or(CoreError::InsufficientFunds {
            available: register.current_balance,
            requested: amount,
        })
}

/// Decides a sale against the locked register. Returns the new balance.
///
/// Every payment method adds to the balance; the per-method split is
/// reported on the close ticket.
pub fn plan_sale(register: &CashRegister, total: Money) -> CoreResult<Money> {
    if !register.is_open {
        return Err(CoreError::RegisterClosed);
    }
    register
        .current_balance
        .checked_add(total)
        .filter(|balance| balance.amount() <= MAX_MONEY)
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: MAX_MONEY - register.current_balance.amount(),
            }
            .into()
        })
}

/// Decides whether the till may be closed with a counted `final_amount`.
pub fn plan_close(register: &CashRegister, final_amount: Money) -> CoreResult<()> {
    validate_non_negative("finalAmount", final_amount)?;
    if !register.is_open {
        return Err(CoreError::RegisterNotOpen {
            action: "close it".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Session Totals
// =============================================================================

/// Running totals of one till session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTotals {
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
    pub sales_count: i64,
    pub extractions: Money,
}

impl SessionTotals {
    pub fn record_sale(&mut self, method: PaymentMethod, total: Money, count: i64) {
        match method {
            PaymentMethod::Cash => self.cash += total,
            PaymentMethod::Card => self.card += total,
            PaymentMethod::Transfer => self.transfer += total,
        }
        self.sales_count += count;
    }

    pub fn record_extraction(&mut self, amount: Money) {
        self.extractions += amount;
    }

    pub fn total_sales(&self) -> Money {
        self.cash + self.card + self.transfer
    }

    /// What the balance should be: opening float plus sales minus withdrawals.
    pub fn expected_balance(&self, opening_amount: Money) -> Money {
        opening_amount + self.total_sales() - self.extractions
    }

    /// Live summary of the session the register is in.
    pub fn summarize(&self, register: &CashRegister) -> SessionSummary {
        SessionSummary {
            session_id: register.session_id.clone(),
            opened_at: register.last_opened_at,
            opening_amount: register.opening_amount,
            current_balance: register.current_balance,
            cash_total: self.cash,
            card_total: self.card,
            transfer_total: self.transfer,
            total_sales: self.total_sales(),
            sales_count: self.sales_count,
            extractions_total: self.extractions,
        }
    }
}

/// Hours between open and close, rounded to two decimals.
pub fn hours_open(opened_at: DateTime<Utc>, closed_at: DateTime<Utc>) -> f64 {
    let seconds = (closed_at - opened_at).num_seconds().max(0) as f64;
    (seconds / 3600.0 * 100.0).round() / 100.0
}

/// Builds the reconciliation ticket for the session being closed.
///
/// `register` is the locked row as it was before the close.
pub fn build_close_ticket(
    id: String,
    register: &CashRegister,
    totals: &SessionTotals,
    counted_amount: Money,
    user_id: &str,
    closed_at: DateTime<Utc>,
) -> CashTicket {
    let opened_at = register.last_opened_at.unwrap_or(closed_at);
    let expected_balance = totals.expected_balance(register.opening_amount);
    CashTicket {
        id,
        cash_register_id: register.id.clone(),
        session_id: register.session_id.clone().unwrap_or_default(),
        user_id: user_id.to_string(),
        opened_at,
        closed_at,
        hours_open: hours_open(opened_at, closed_at),
        opening_amount: register.opening_amount,
        cash_total: totals.cash,
        card_total: totals.card,
        transfer_total: totals.transfer,
        total_sales: totals.total_sales(),
        sales_count: totals.sales_count,
        extractions_total: totals.extractions,
        expected_balance,
        counted_amount,
        difference: counted_amount - expected_balance,
        created_at: closed_at,
    }
}

// =============================================================================
// Consistency Checks
// =============================================================================

/// Difference between the stored balance and what the session's movements
/// explain. Zero on a healthy ledger.
pub fn ledger_drift(register: &CashRegister, session_movements: &[CashMovement]) -> Money {
    let explained: Money = session_movements
        .iter()
        .map(|m| m.movement_type.signed(m.amount))
        .sum();
    register.current_balance - register.opening_amount - explained
}

/// Total the cart's lines add up to: line subtotals minus discount plus
/// delivery. `None` when the arithmetic overflows.
///
/// Line prices already include addons. The engine charges the total the
/// cashier submitted; this figure is only compared against it for logging.
pub fn expected_sale_total(sale: &NewSale) -> Option<Money> {
    let mut lines = Money::zero();
    for item in &sale.items {
        lines = lines.checked_add(item.subtotal()?)?;
    }
    lines.checked_sub(sale.discount)?.checked_add(sale.delivery_cost)
}

// =============================================================================
// Unit Tests
// =============================================================================
