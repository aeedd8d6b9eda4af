//! # poli-db: Database Layer and Ledger Engine
//!
//! SQLite storage for the Poli POS, plus the [`LedgerEngine`]: the one
//! component that changes money state, one atomic transaction per operation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Poli POS Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /api/sales)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     poli-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │ LedgerEngine  │   │  Repositories  │   │  Migrations  │   │   │
//! │  │   │ open / close  │   │ products       │   │  (embedded)  │   │   │
//! │  │   │ extract       │   │ clients, sales │   │              │   │   │
//! │  │   │ create_sale   │   │ reports, audit │   │ 001_init.sql │   │   │
//! │  │   └───────┬───────┘   └───────┬────────┘   └──────────────┘   │   │
//! │  │           └────────┬──────────┘                                │   │
//! │  │                    ▼                                           │   │
//! │  │             Database (pool.rs)                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poli_db::{Database, DbConfig, LedgerConfig};
//!
//! let db = Database::new(DbConfig::new("poli.db")).await?;
//! let ledger = db.ledger(LedgerConfig::default());
//! ledger.open_register(&caller, Money::new(50_000)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, PosError, PosResult};
pub use ledger::{LedgerConfig, LedgerEngine};
pub use pool::{Database, DbConfig};

pub use repository::audit::{AuditAction, AuditRepository};
pub use repository::backup::BackupRepository;
pub use repository::cash_register::CashRegisterRepository;
pub use repository::client::ClientRepository;
pub use repository::config::ConfigRepository;
pub use repository::ingredient::IngredientRepository;
pub use repository::product::{ProductQuery, ProductRepository};
pub use repository::report::ReportRepository;
pub use repository::sale::{SaleFilter, SaleRepository};
pub use repository::user::UserRepository;
