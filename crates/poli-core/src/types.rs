//! # Domain Types
//!
//! Entities, request DTOs and report shapes used throughout the Poli POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CashRegister   │   │  CashMovement   │   │   CashTicket    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  is_open        │◄──│  type           │   │  per-method     │       │
//! │  │  current_balance│   │  amount         │   │  totals, counted│       │
//! │  │  session_id     │   │  sale_id?       │   │  difference     │       │
//! │  └─────────────────┘   └────────┬────────┘   └─────────────────┘       │
//! │                                 │                                       │
//! │  ┌─────────────────┐   ┌────────▼────────┐   ┌─────────────────┐       │
//! │  │    Product      │──►│      Sale       │◄──│     Client      │       │
//! │  │  stock? (NULL = │   │  order_number   │   │                 │       │
//! │  │  untracked)     │   │  payment_method │   └─────────────────┘       │
//! │  └─────────────────┘   └────────┬────────┘                              │
//! │                                 │ 1..n                                  │
//! │                        ┌────────▼────────┐   ┌─────────────────┐       │
//! │                        │    SaleItem     │──►│  SaleItemAddon  │       │
//! │                        │  name snapshot  │   │  price snapshot │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! JSON uses camelCase field names and SCREAMING_SNAKE_CASE enum values,
//! matching what the web frontend already sends.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Roles & Caller
// =============================================================================

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    /// Cashier: sells and opens/closes the till.
    User,
    /// Manager: may also extract cash and see the register ledger.
    Admin,
    /// Owner/operator: everything, including system configuration.
    Sysadmin,
}

impl Role {
    /// Whether the role may withdraw cash and read the register ledger.
    pub fn can_manage_cash(&self) -> bool {
        matches!(self, Role::Admin | Role::Sysadmin)
    }

    /// Whether the role may read and change system configuration.
    pub fn can_configure(&self) -> bool {
        matches!(self, Role::Sysadmin)
    }

    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Sysadmin => "SYSADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "SYSADMIN" => Ok(Role::Sysadmin),
            _ => Err(()),
        }
    }
}

/// The authenticated identity an operation runs on behalf of.
///
/// Produced by the upstream session provider; the engine trusts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Caller {
            user_id: user_id.into(),
            role,
        }
    }
}

// =============================================================================
// Users & Clients
// =============================================================================

/// A staff member known to the system.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a user.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub last_name: String,
    pub role: Role,
}

/// A restaurant customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// National identity document number.
    pub cedula: Option<String>,
    /// Tax id, required when the client asks for an invoice.
    pub ruc: Option<String>,
    pub requires_invoice: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewClient {
    pub name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub cedula: Option<String>,
    #[serde(default)]
    pub ruc: Option<String>,
    #[serde(default)]
    pub requires_invoice: bool,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A product on the menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub status: ProductStatus,
    /// Units on hand. `None` means stock is not tracked for this product.
    pub stock: Option<i64>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// Partial update of a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// An extra that can be added to a sale line (extra cheese, bacon...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductAddon {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProductAddon {
    pub name: String,
    pub price: Money,
}

// =============================================================================
// Inventory
// =============================================================================

/// A raw ingredient tracked in the kitchen inventory.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Unit of measure (kg, l, unidad...).
    pub unit: String,
    pub current_stock: f64,
    pub min_stock: f64,
    /// Cost per unit.
    pub cost: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    /// Whether the stock is at or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewIngredient {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit: String,
    #[serde(default)]
    pub current_stock: f64,
    #[serde(default)]
    pub min_stock: f64,
    #[serde(default)]
    pub cost: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum InventoryMovementType {
    /// Stock received.
    Entry,
    /// Stock consumed or discarded.
    Exit,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub ingredient_id: String,
    #[serde(rename = "type")]
    pub movement_type: InventoryMovementType,
    pub quantity: f64,
    pub reason: Option<String>,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewInventoryMovement {
    pub ingredient_id: String,
    #[serde(rename = "type")]
    pub movement_type: InventoryMovementType,
    pub quantity: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Cash Register
// =============================================================================

/// The till. One row per physical register; normally exactly one.
///
/// ## Lifecycle
/// ```text
///              open_register(initial)
///   ┌────────┐ ─────────────────────► ┌────────┐ ◄─┐ create_sale (+total)
///   │ CLOSED │                        │  OPEN  │   │ extract_cash (-amount)
///   └────────┘ ◄───────────────────── └────────┘ ──┘
///              close_register(final)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashRegister {
    pub id: String,
    pub is_open: bool,
    pub current_balance: Money,
    /// Amount declared at the last open.
    pub opening_amount: Money,
    /// Session the register is currently in; `None` while closed.
    pub session_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub last_opened_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub last_closed_at: Option<DateTime<Utc>>,
    /// Bumped by every ledger write on this row.
    pub lock_version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum CashMovementType {
    Opening,
    Closing,
    Sale,
    Extraction,
}

impl CashMovementType {
    /// Effect of a movement of this type on the balance, relative to the
    /// session opening amount. OPENING and CLOSING are bookends.
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            CashMovementType::Sale => amount,
            CashMovementType::Extraction => Money::zero() - amount,
            CashMovementType::Opening | CashMovementType::Closing => Money::zero(),
        }
    }
}

/// One append-only ledger line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub cash_register_id: String,
    pub session_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub movement_type: CashMovementType,
    pub amount: Money,
    pub description: Option<String>,
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Reconciliation snapshot produced when the till closes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashTicket {
    pub id: String,
    pub cash_register_id: String,
    pub session_id: String,
    pub user_id: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
    pub hours_open: f64,
    pub opening_amount: Money,
    pub cash_total: Money,
    pub card_total: Money,
    pub transfer_total: Money,
    pub total_sales: Money,
    pub sales_count: i64,
    pub extractions_total: Money,
    pub expected_balance: Money,
    /// Amount the cashier physically counted (`finalAmount`).
    pub counted_amount: Money,
    /// `counted_amount - expected_balance`; negative means missing cash.
    pub difference: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Live totals of the session in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionSummary {
    pub session_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub opened_at: Option<DateTime<Utc>>,
    pub opening_amount: Money,
    pub current_balance: Money,
    pub cash_total: Money,
    pub card_total: Money,
    pub transfer_total: Money,
    pub total_sales: Money,
    pub sales_count: i64,
    pub extractions_total: Money,
}

/// Register state plus the movement that changed it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterUpdate {
    pub cash_register: CashRegister,
    pub movement: CashMovement,
}

/// Outcome of closing the till.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterClosure {
    pub cash_register: CashRegister,
    pub movement: CashMovement,
    pub cash_ticket: CashTicket,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OpenRegisterRequest {
    pub initial_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExtractCashRequest {
    pub amount: Money,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CloseRegisterRequest {
    pub final_amount: Money,
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OrderType {
    Pickup,
    Delivery,
    DineIn,
}

/// A committed sale. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// `ddMMyyyy-NNN`, unique across all sales.
    pub order_number: String,
    pub client_id: Option<String>,
    pub user_id: String,
    pub cash_register_id: String,
    pub session_id: String,
    pub total: Money,
    pub discount: Money,
    pub delivery_cost: Money,
    pub payment_method: PaymentMethod,
    pub order_type: OrderType,
    /// Business day the order number belongs to (`YYYY-MM-DD`).
    pub business_day: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line of a sale, with product data frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    /// Unit price charged.
    pub price: Money,
    /// `price × quantity`.
    pub subtotal: Money,
    pub second_flavor_product_id: Option<String>,
    pub second_flavor_product_name: Option<String>,
    pub comments: Option<String>,
    pub other_ingredient: Option<String>,
    /// Position of the line within the sale.
    pub line_number: i64,
}

/// An addon on a sale line, with name and price frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItemAddon {
    pub id: String,
    pub sale_item_id: String,
    pub addon_id: String,
    pub addon_name: String,
    pub quantity: i64,
    pub price: Money,
}

/// A sale line together with its addons.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLine {
    #[serde(flatten)]
    pub item: SaleItem,
    pub addons: Vec<SaleItemAddon>,
}

/// A sale together with its lines, as returned by create and lookup.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleLine>,
}

/// Second half of a half-and-half pizza.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SecondFlavor {
    pub product_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSaleItemAddon {
    pub addon_id: String,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    /// Unit price as charged by the cashier, addons and extras included.
    pub price: Money,
    /// Line total as submitted. Defaults to `price × quantity`.
    #[serde(default)]
    pub subtotal: Option<Money>,
    #[serde(default)]
    pub second_flavor: Option<SecondFlavor>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub other_ingredient: Option<String>,
    #[serde(default)]
    pub addons: Vec<NewSaleItemAddon>,
}

impl NewSaleItem {
    /// The line total stored on the sale item: the submitted `subtotal`, or
    /// `price × quantity` when none was sent. `None` on overflow.
    pub fn subtotal(&self) -> Option<Money> {
        match self.subtotal {
            Some(subtotal) => Some(subtotal),
            None => self.price.checked_multiply_quantity(self.quantity),
        }
    }
}

/// A cart submitted for checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewSale {
    #[serde(default)]
    pub client_id: Option<String>,
    pub items: Vec<NewSaleItem>,
    pub total: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub delivery_cost: Money,
    pub payment_method: PaymentMethod,
    pub order_type: OrderType,
}

// =============================================================================
// Audit
// =============================================================================

/// One entry of the append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuditLog {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub table_name: String,
    pub record_id: String,
    /// JSON snapshot before the change.
    pub old_values: Option<String>,
    /// JSON snapshot after the change.
    pub new_values: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// System Configuration
// =============================================================================

/// Restaurant-wide settings. A single row, created with defaults on first read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SystemConfig {
    pub restaurant_name: String,
    pub address: String,
    pub phone: String,
    pub ruc: String,
    /// IVA percentage (10 = 10%).
    pub iva_rate: i64,
    pub printer_ip: String,
    pub printer_port: i64,
    /// Receipt paper width in millimetres.
    pub paper_width: i64,
    pub logo_url: String,
    pub footer_message: String,
    pub password_expiry_days: i64,
    pub max_failed_attempts: i64,
    pub session_timeout_minutes: i64,
    pub enable_audit_log: bool,
    pub auto_backup: bool,
    pub backup_frequency: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        SystemConfig {
            restaurant_name: "Polipizza".to_string(),
            address: "Dirección del restaurante".to_string(),
            phone: "+595 21 123 456".to_string(),
            ruc: "12345678-9".to_string(),
            iva_rate: 10,
            printer_ip: "192.168.1.100".to_string(),
            printer_port: 9100,
            paper_width: 58,
            logo_url: String::new(),
            footer_message: "¡Gracias por su compra!".to_string(),
            password_expiry_days: 90,
            max_failed_attempts: 5,
            session_timeout_minutes: 60,
            enable_audit_log: true,
            auto_backup: false,
            backup_frequency: "weekly".to_string(),
        }
    }
}

// =============================================================================
// Pagination & Reports
// =============================================================================

/// Page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 100;

    /// Builds a page request, clamping out-of-range values.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(10).clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Row offset of the first element of the page.
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        let limit = request.limit.max(1) as i64;
        Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// Amount and count for one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentBreakdown {
    pub payment_method: PaymentMethod,
    pub total: Money,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub revenue: Money,
}

/// Cash movements and totals over a date range.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CashReport {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    pub is_open: bool,
    pub opening_amount: Money,
    pub current_balance: Money,
    pub total_sales: Money,
    pub total_extractions: Money,
    pub movements: Vec<CashMovement>,
}

/// Revenue figures over a date range.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesReport {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    pub total_revenue: Money,
    pub sales_count: i64,
    pub by_payment_method: Vec<PaymentBreakdown>,
    pub top_products: Vec<TopProduct>,
}

/// One inventory movement as listed on the inventory report.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryReportMovement {
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub movement_type: InventoryMovementType,
    pub ingredient_name: String,
    pub quantity: f64,
    pub reason: Option<String>,
    pub user_id: String,
}

/// Stock valuation plus the inventory movements over a date range.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventoryReport {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    /// Σ current_stock × cost, rounded per ingredient.
    pub total_value: Money,
    pub low_stock_items: i64,
    pub movements: Vec<InventoryReportMovement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockAlert {
    pub ingredient_id: String,
    pub name: String,
    pub current_stock: f64,
    pub min_stock: f64,
}

impl From<&Ingredient> for LowStockAlert {
    fn from(ingredient: &Ingredient) -> Self {
        LowStockAlert {
            ingredient_id: ingredient.id.clone(),
            name: ingredient.name.clone(),
            current_stock: ingredient.current_stock,
            min_stock: ingredient.min_stock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterStatus {
    pub is_open: bool,
    pub current_balance: Money,
}

/// Front-page figures for one business day.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DashboardStats {
    #[ts(as = "String")]
    pub business_day: NaiveDate,
    pub total_sales_today: Money,
    pub sales_count_today: i64,
    pub new_clients_today: i64,
    pub cash_register_status: RegisterStatus,
    pub top_products: Vec<TopProduct>,
    pub low_stock_alerts: Vec<LowStockAlert>,
}

// =============================================================================
// Backup
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TableRowCount {
    pub table: String,
    pub rows: i64,
}

/// A database copy written by the backup endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BackupInfo {
    pub file_name: String,
    pub path: String,
    pub size_bytes: i64,
    /// Rows per table, counted in the copy itself.
    pub tables: Vec<TableRowCount>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(!Role::User.can_manage_cash());
        assert!(Role::Admin.can_manage_cash());
        assert!(Role::Sysadmin.can_manage_cash());
        assert!(!Role::Admin.can_configure());
        assert!(Role::Sysadmin.can_configure());
    }

    #[test]
    fn test_role_parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" SYSADMIN ".parse::<Role>(), Ok(Role::Sysadmin));
        assert!("cashier".parse::<Role>().is_err());
    }

    #[test]
    fn test_new_sale_deserializes_frontend_payload() {
        let json = r#"{
            "clientId": null,
            "items": [{
                "productId": "p1",
                "quantity": 2,
                "price": 45000,
                "secondFlavor": { "productId": "p2" },
                "addons": [{ "addonId": "a1" }]
            }],
            "total": 90000,
            "paymentMethod": "CASH",
            "orderType": "DINE_IN"
        }"#;
        let sale: NewSale = serde_json::from_str(json).unwrap();
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].subtotal(), Some(Money::new(90_000)));
        assert_eq!(sale.items[0].addons[0].quantity, 1);
        assert_eq!(sale.discount, Money::zero());
        assert_eq!(sale.order_type, OrderType::DineIn);
    }

    #[test]
    fn test_submitted_subtotal_is_kept() {
        let json = r#"{
            "productId": "p1",
            "quantity": 2,
            "price": 58000,
            "subtotal": 116000,
            "otherIngredient": "Huevo",
            "addons": [{ "addonId": "bacon", "quantity": 1 }]
        }"#;
        let item: NewSaleItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.subtotal(), Some(Money::new(116_000)));
    }

    #[test]
    fn test_movement_signed_effect() {
        let amount = Money::new(15_000);
        assert_eq!(CashMovementType::Sale.signed(amount), amount);
        assert_eq!(CashMovementType::Extraction.signed(amount), Money::new(-15_000));
        assert_eq!(CashMovementType::Opening.signed(amount), Money::zero());
    }

    #[test]
    fn test_page_request_clamps() {
        let page = PageRequest::new(Some(0), Some(500));
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, PageRequest::MAX_LIMIT);

        let page = PageRequest::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);

        let result: Page<i32> = Page::new(vec![], 21, page);
        assert_eq!(result.total_pages, 3);
    }

    #[test]
    fn test_system_config_defaults() {
        let config = SystemConfig::default();
        assert_eq!(config.restaurant_name, "Polipizza");
        assert_eq!(config.printer_port, 9100);
        assert!(config.enable_audit_log);
    }
}
