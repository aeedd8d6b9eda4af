//! # poli-core: Pure Business Logic for the Poli POS
//!
//! Every rule the till and the checkout follow lives here as a pure
//! function. The database crate loads state, asks this crate what the next
//! state is, and writes it back inside a transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Poli POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 poli-server (axum JSON API)                     │   │
//! │  │   /cash-register/open ─ /extract ─ /close ─ /sales ─ ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            poli-db (LedgerEngine + repositories)                │   │
//! │  │        BEGIN ─► lock register ─► ask core ─► write ─► COMMIT    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ poli-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐    │   │
//! │  │   │  types   │ │  money   │ │  register  │ │ order_number │    │   │
//! │  │   │ Sale     │ │  Money   │ │ plan_open  │ │ ddMMyyyy-NNN │    │   │
//! │  │   │ Register │ │          │ │ plan_close │ │ business day │    │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └──────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities, request DTOs, reports
//! - [`money`] - Integer money in the smallest currency unit
//! - [`error`] - Domain error types and error kinds
//! - [`validation`] - Input validation
//! - [`register`] - Till state-transition rules and session totals
//! - [`order_number`] - Business day and order number formatting
//!
//! ## Example Usage
//!
//! ```rust
//! use poli_core::money::Money;
//!
//! let pizza = Money::new(45_000);
//! let total = pizza.checked_multiply_quantity(2).unwrap() + Money::new(10_000);
//! assert_eq!(total.amount(), 100_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order_number;
pub mod register;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Identifier of the single cash register a restaurant runs.
///
/// The ledger engine takes its register id from configuration; this is the
/// value every deployment has used so far.
pub const DEFAULT_CASH_REGISTER_ID: &str = "default-cash-register";

/// Default restaurant UTC offset in minutes (Asunción, UTC-3).
pub const DEFAULT_BUSINESS_UTC_OFFSET_MINUTES: i32 = -180;

/// Maximum lines allowed in a single sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest amount accepted for any price, total, line subtotal or balance
/// (one trillion guaraníes).
pub const MAX_MONEY: i64 = 1_000_000_000_000;

/// Description recorded on an extraction when the caller gives none.
pub const DEFAULT_EXTRACTION_DESCRIPTION: &str = "Extracción de efectivo";

/// Description recorded on every OPENING movement.
pub const OPENING_DESCRIPTION: &str = "Apertura de caja";

/// Description recorded on every CLOSING movement.
pub const CLOSING_DESCRIPTION: &str = "Cierre de caja";
