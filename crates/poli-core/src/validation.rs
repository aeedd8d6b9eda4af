//! # Validation Module
//!
//! Input validation for every write the system accepts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum Json extractor)                                   │
//! │  └── Shape and types (deserialization)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Ranges, required fields, cart rules. Runs before BEGIN.           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: LedgerEngine (inside the transaction)                        │
//! │  └── State rules: till open, balance, referenced rows exist            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: SQLite constraints                                           │
//! │  └── CHECK (balance >= 0), UNIQUE (order_number), FOREIGN KEY          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{
    NewClient, NewIngredient, NewInventoryMovement, NewProduct, NewSale, SystemConfig,
};
use crate::{MAX_ITEM_QUANTITY, MAX_MONEY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Primitive Validators
// =============================================================================

/// Validates a required, bounded text field.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates an amount that may be zero (opening float, counted cash, prices).
/// Amounts above MAX_MONEY are rejected.
///
/// ## Example
/// ```rust
/// use poli_core::money::Money;
/// use poli_core::validation::validate_non_negative;
///
/// assert!(validate_non_negative("initialAmount", Money::new(0)).is_ok());
/// assert!(validate_non_negative("initialAmount", Money::new(-1)).is_err());
/// assert!(validate_non_negative("initialAmount", Money::new(i64::MAX)).is_err());
/// ```
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_money_bound(field, amount, 0)
}

/// Validates an amount that must be strictly positive (extractions).
pub fn validate_positive(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    validate_money_bound(field, amount, 1)
}

fn validate_money_bound(field: &str, amount: Money, min: i64) -> ValidationResult<()> {
    if amount.amount() > MAX_MONEY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max: MAX_MONEY,
        });
    }
    Ok(())
}

/// Validates a line or addon quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a fractional stock quantity (kg, litres).
pub fn validate_stock_quantity(field: &str, qty: f64) -> ValidationResult<()> {
    if !qty.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if qty <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Sale Validation
// =============================================================================

/// Validates a cart before checkout.
///
/// ## Rules
/// - At least one line, at most MAX_SALE_ITEMS
/// - Every quantity in 1..=999, addons included
/// - Prices, line subtotals, total, discount and delivery cost are in
///   0..=MAX_MONEY
/// - Referenced ids are not blank
///
/// ## User Workflow
/// ```text
/// POST /api/sales
///      │
///      ▼
/// validate_new_sale ← THIS FUNCTION (no transaction yet)
///      │
///      ├── empty cart?      → InvalidInput "items must not be empty"
///      ├── quantity 0?      → InvalidInput "items[0].quantity must be positive"
///      │
///      └── OK → LedgerEngine::create_sale
/// ```
pub fn validate_new_sale(sale: &NewSale) -> ValidationResult<()> {
    if sale.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    if sale.items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    for (i, item) in sale.items.iter().enumerate() {
        validate_required_text(&format!("items[{i}].productId"), &item.product_id, 64)?;
        validate_quantity(&format!("items[{i}].quantity"), item.quantity)?;
        validate_non_negative(&format!("items[{i}].price"), item.price)?;
        match item.subtotal() {
            Some(subtotal) if !subtotal.is_negative() && subtotal.amount() <= MAX_MONEY => {}
            _ => {
                return Err(ValidationError::OutOfRange {
                    field: format!("items[{i}].subtotal"),
                    min: 0,
                    max: MAX_MONEY,
                })
            }
        }
        validate_optional_text(&format!("items[{i}].comments"), item.comments.as_deref(), 500)?;
        validate_optional_text(
            &format!("items[{i}].otherIngredient"),
            item.other_ingredient.as_deref(),
            200,
        )?;

        if let Some(flavor) = &item.second_flavor {
            validate_required_text(
                &format!("items[{i}].secondFlavor.productId"),
                &flavor.product_id,
                64,
            )?;
        }

        for (j, addon) in item.addons.iter().enumerate() {
            validate_required_text(&format!("items[{i}].addons[{j}].addonId"), &addon.addon_id, 64)?;
            validate_quantity(&format!("items[{i}].addons[{j}].quantity"), addon.quantity)?;
        }
    }

    validate_non_negative("total", sale.total)?;
    validate_non_negative("discount", sale.discount)?;
    validate_non_negative("deliveryCost", sale.delivery_cost)?;

    if let Some(client_id) = &sale.client_id {
        validate_required_text("clientId", client_id, 64)?;
    }

    Ok(())
}

// =============================================================================
// Catalog & Inventory Validation
// =============================================================================

pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_required_text("name", &product.name, 200)?;
    validate_required_text("category", &product.category, 100)?;
    validate_optional_text("description", product.description.as_deref(), 1000)?;
    validate_non_negative("price", product.price)?;
    if let Some(stock) = product.stock {
        if stock < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_new_client(client: &NewClient) -> ValidationResult<()> {
    validate_required_text("name", &client.name, 100)?;
    validate_required_text("lastName", &client.last_name, 100)?;
    validate_optional_text("email", client.email.as_deref(), 200)?;
    if let Some(email) = client.email.as_deref().filter(|e| !e.is_empty()) {
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain '@'".to_string(),
            });
        }
    }
    if client.requires_invoice && client.ruc.as_deref().map_or(true, |r| r.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "ruc".to_string(),
        });
    }
    Ok(())
}

pub fn validate_new_ingredient(ingredient: &NewIngredient) -> ValidationResult<()> {
    validate_required_text("name", &ingredient.name, 100)?;
    validate_required_text("unit", &ingredient.unit, 20)?;
    for (field, value) in [
        ("currentStock", ingredient.current_stock),
        ("minStock", ingredient.min_stock),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::MustNotBeNegative {
                field: field.to_string(),
            });
        }
    }
    validate_non_negative("cost", ingredient.cost)
}

pub fn validate_inventory_movement(movement: &NewInventoryMovement) -> ValidationResult<()> {
    validate_required_text("ingredientId", &movement.ingredient_id, 64)?;
    validate_stock_quantity("quantity", movement.quantity)?;
    validate_optional_text("reason", movement.reason.as_deref(), 500)
}

/// Backup schedules the backup job understands.
pub const BACKUP_FREQUENCIES: [&str; 3] = ["daily", "weekly", "monthly"];

/// Validates restaurant settings before they replace the stored row.
pub fn validate_system_config(config: &SystemConfig) -> ValidationResult<()> {
    validate_required_text("restaurantName", &config.restaurant_name, 200)?;
    validate_required_text("ruc", &config.ruc, 20)?;
    validate_range("ivaRate", config.iva_rate, 0, 100)?;
    validate_range("printerPort", config.printer_port, 1, 65_535)?;
    if config.paper_width != 58 && config.paper_width != 80 {
        return Err(ValidationError::InvalidFormat {
            field: "paperWidth".to_string(),
            reason: "must be 58 or 80".to_string(),
        });
    }
    validate_range("passwordExpiryDays", config.password_expiry_days, 1, 365)?;
    validate_range("maxFailedAttempts", config.max_failed_attempts, 1, 20)?;
    validate_range("sessionTimeoutMinutes", config.session_timeout_minutes, 5, 1_440)?;
    if !BACKUP_FREQUENCIES.contains(&config.backup_frequency.as_str()) {
        return Err(ValidationError::InvalidFormat {
            field: "backupFrequency".to_string(),
            reason: format!("must be one of {}", BACKUP_FREQUENCIES.join(", ")),
        });
    }
    Ok(())
}

fn validate_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        InventoryMovementType, NewSaleItem, NewSaleItemAddon, OrderType, PaymentMethod,
    };

    fn line(qty: i64, price: i64) -> NewSaleItem {
        NewSaleItem {
            product_id: "p1".to_string(),
            quantity: qty,
            price: Money::new(price),
            subtotal: None,
            second_flavor: None,
            comments: None,
            other_ingredient: None,
            addons: vec![],
        }
    }

    fn sale(items: Vec<NewSaleItem>) -> NewSale {
        NewSale {
            client_id: None,
            items,
            total: Money::new(15_000),
            discount: Money::zero(),
            delivery_cost: Money::zero(),
            payment_method: PaymentMethod::Cash,
            order_type: OrderType::Pickup,
        }
    }

    #[test]
    fn test_empty_cart_rejected() {
        let err = validate_new_sale(&sale(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "items must not be empty");
    }

    #[test]
    fn test_line_rules() {
        assert!(validate_new_sale(&sale(vec![line(1, 15_000)])).is_ok());
        assert!(validate_new_sale(&sale(vec![line(0, 15_000)])).is_err());
        assert!(validate_new_sale(&sale(vec![line(1000, 15_000)])).is_err());
        assert!(validate_new_sale(&sale(vec![line(1, -1)])).is_err());
    }

    #[test]
    fn test_addon_quantity_checked() {
        let mut item = line(1, 15_000);
        item.addons.push(NewSaleItemAddon {
            addon_id: "a1".to_string(),
            quantity: 0,
        });
        let err = validate_new_sale(&sale(vec![item])).unwrap_err();
        assert_eq!(err.to_string(), "items[0].addons[0].quantity must be positive");
    }

    #[test]
    fn test_negative_total_rejected() {
        let mut s = sale(vec![line(1, 15_000)]);
        s.total = Money::new(-5);
        assert!(validate_new_sale(&s).is_err());
    }

    #[test]
    fn test_amount_validators() {
        assert!(validate_positive("amount", Money::new(1)).is_ok());
        assert!(validate_positive("amount", Money::zero()).is_err());
        assert!(validate_non_negative("finalAmount", Money::zero()).is_ok());
        assert!(validate_non_negative("finalAmount", Money::new(MAX_MONEY)).is_ok());
        assert!(validate_positive("amount", Money::new(MAX_MONEY + 1)).is_err());
    }

    #[test]
    fn test_huge_amounts_rejected() {
        let err = validate_new_sale(&sale(vec![line(2, i64::MAX / 2 + 1)])).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert!(err.to_string().starts_with("items[0].price"));

        // Price within bounds but price × quantity is not.
        let err = validate_new_sale(&sale(vec![line(999, MAX_MONEY)])).unwrap_err();
        assert!(err.to_string().starts_with("items[0].subtotal"));

        let mut s = sale(vec![line(1, 1)]);
        s.total = Money::new(i64::MAX);
        let err = validate_new_sale(&s).unwrap_err();
        assert!(err.to_string().starts_with("total must be between 0 and"));

        let mut item = line(1, 1);
        item.subtotal = Some(Money::new(-1));
        let err = validate_new_sale(&sale(vec![item])).unwrap_err();
        assert!(err.to_string().starts_with("items[0].subtotal"));

        let mut s = sale(vec![line(1, 1)]);
        s.delivery_cost = Money::new(MAX_MONEY + 1);
        assert!(validate_new_sale(&s).is_err());
    }

    #[test]
    fn test_inventory_movement_quantity() {
        let mut movement = NewInventoryMovement {
            ingredient_id: "i1".to_string(),
            movement_type: InventoryMovementType::Exit,
            quantity: 2.5,
            reason: None,
        };
        assert!(validate_inventory_movement(&movement).is_ok());
        movement.quantity = f64::NAN;
        assert!(validate_inventory_movement(&movement).is_err());
        movement.quantity = 0.0;
        assert!(validate_inventory_movement(&movement).is_err());
    }

    #[test]
    fn test_client_requiring_invoice_needs_ruc() {
        let client = NewClient {
            name: "Ana".to_string(),
            last_name: "Benítez".to_string(),
            email: None,
            phone: None,
            cedula: None,
            ruc: None,
            requires_invoice: true,
        };
        assert!(validate_new_client(&client).is_err());
    }

    #[test]
    fn test_system_config_rules() {
        assert!(validate_system_config(&SystemConfig::default()).is_ok());

        let mut config = SystemConfig::default();
        config.paper_width = 72;
        assert!(validate_system_config(&config).is_err());

        let mut config = SystemConfig::default();
        config.backup_frequency = "hourly".to_string();
        let err = validate_system_config(&config).unwrap_err();
        assert!(err.to_string().starts_with("backupFrequency"));

        let mut config = SystemConfig::default();
        config.iva_rate = 101;
        assert!(validate_system_config(&config).is_err());
    }
}
