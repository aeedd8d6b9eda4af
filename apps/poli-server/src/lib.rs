//! # poli-server: HTTP API for the Poli POS
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  POST /api/sales  (x-user-id, x-user-role, JSON body)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Authenticated extractor ── missing headers ──► 401                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  handler ──► LedgerEngine::create_sale (one SQLite transaction)        │
//! │       │                                                                 │
//! │       ├── Ok  ──► 201 + SaleWithItems                                  │
//! │       └── Err ──► ApiError { code, message } + status                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Builds the complete application router.
pub fn build_router(state: AppState) -> Router {
    routes::api_routes().with_state(state)
}
