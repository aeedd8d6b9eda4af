//! # Error Types
//!
//! Domain-specific error types for poli-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  poli-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Stable classification shared by every layer    │
//! │                                                                         │
//! │  poli-db errors                                                        │
//! │  ├── DbError          - Store failures                                 │
//! │  └── LedgerError      - CoreError | DbError out of the engine          │
//! │                                                                         │
//! │  poli-server errors                                                    │
//! │  └── ApiError         - { code, message } + HTTP status                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → ApiError → client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// Classification of every failure the system reports.
///
/// The HTTP layer maps each kind to a status code; callers match on the kind
/// rather than on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorKind {
    /// Malformed or out-of-range input (400).
    InvalidInput,
    /// Operation not allowed in the till's current state (409).
    InvalidState,
    /// Extraction larger than the balance (422).
    InsufficientFunds,
    /// Sale attempted while the till is closed (409).
    RegisterClosed,
    /// Caller role lacks permission (403).
    Forbidden,
    /// Referenced record does not exist (404).
    NotFound,
    /// Store or unexpected failure (500).
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every variant is detected before any write is committed, so returning one
/// from inside a ledger transaction always means "nothing changed".
#[derive(Debug, Error)]
pub enum CoreError {
    /// Open requested while the till is already open.
    #[error("Cash register is already open")]
    RegisterAlreadyOpen,

    /// Extraction or close requested while the till is closed.
    ///
    /// ## When This Occurs
    /// - `extract_cash` before `open_register`
    /// - `close_register` twice in a row
    #[error("Cash register must be open to {action}")]
    RegisterNotOpen { action: String },

    /// Sale attempted while the till is closed.
    #[error("Cash register must be open to register sales")]
    RegisterClosed,

    /// Extraction larger than the current balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Balance: Gs. 30.000
    ///      │
    ///      ▼
    /// Extract Gs. 40.000
    ///      │
    ///      ▼
    /// InsufficientFunds { available: 30000, requested: 40000 }
    ///      │
    ///      ▼
    /// Balance unchanged, no movement written
    /// ```
    #[error("Insufficient balance in cash register: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    /// Caller role is not allowed to perform the action.
    #[error("Role {role} is not allowed to {action}")]
    Forbidden { role: String, action: String },

    /// Referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Inventory movement would leave a negative ingredient stock.
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: f64,
        requested: f64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Returns the stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::RegisterAlreadyOpen | CoreError::RegisterNotOpen { .. } => {
                ErrorKind::InvalidState
            }
            CoreError::RegisterClosed => ErrorKind::RegisterClosed,
            CoreError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            CoreError::Forbidden { .. } => ErrorKind::Forbidden,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } | CoreError::Validation(_) => {
                ErrorKind::InvalidInput
            }
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or positive.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed order number, non-finite number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection must contain at least one element.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientFunds {
            available: Money::new(30_000),
            requested: Money::new(40_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient balance in cash register: available Gs. 30.000, requested Gs. 40.000"
        );

        let err = CoreError::RegisterNotOpen {
            action: "extract cash".to_string(),
        };
        assert_eq!(err.to_string(), "Cash register must be open to extract cash");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CoreError::RegisterAlreadyOpen.kind(), ErrorKind::InvalidState);
        assert_eq!(CoreError::RegisterClosed.kind(), ErrorKind::RegisterClosed);
        assert_eq!(CoreError::not_found("Product", "p1").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::Forbidden {
                role: "USER".into(),
                action: "extract cash".into()
            }
            .kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Empty {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientFunds).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_FUNDS\"");
    }
}
