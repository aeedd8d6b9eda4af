//! # Repository Module
//!
//! Database repository implementations for the Poli POS.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Repository methods (&self)            Free functions (&mut conn)       │
//! │  ──────────────────────────            ───────────────────────────      │
//! │  own a pool handle                     run on the caller's transaction  │
//! │  one statement or one short tx         composed by LedgerEngine         │
//! │                                                                         │
//! │  db.products().list(...)               product::fetch(&mut *tx, id)     │
//! │  db.sales().get_by_order_number(..)    sale::next_order_sequence(..)    │
//! │  db.cash_register().tickets(..)        cash_register::lock(&mut *tx)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`audit::AuditRepository`] - Append-only audit trail
//! - [`backup::BackupRepository`] - Full database copies
//! - [`cash_register::CashRegisterRepository`] - Register row, movements, tickets
//! - [`client::ClientRepository`] - Customers
//! - [`config::ConfigRepository`] - Restaurant settings
//! - [`ingredient::IngredientRepository`] - Kitchen inventory
//! - [`product::ProductRepository`] - Menu and addons
//! - [`report::ReportRepository`] - Cash, sales and inventory reports, dashboard
//! - [`sale::SaleRepository`] - Sale lookups
//! - [`user::UserRepository`] - Staff

pub mod audit;
pub mod backup;
pub mod cash_register;
pub mod client;
pub mod config;
pub mod ingredient;
pub mod product;
pub mod report;
pub mod sale;
pub mod user;

use serde::Serialize;

/// Before/after pair returned by updates, used for audit snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct Updated<T> {
    pub before: T,
    pub after: T,
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("muzza"), "%muzza%");
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }
}
