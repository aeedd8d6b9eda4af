use super::*;
use crate::pool::{Database, DbConfig};
use crate::repository::sale::SaleFilter;
use poli_core::order_number::business_day_bounds;
use poli_core::{
    ErrorKind, NewProduct, NewProductAddon, NewSaleItem, NewSaleItemAddon, OrderType,
    PaymentMethod, Product, ProductStatus, ProductUpdate, Role, SecondFlavor,
};

// =============================================================================
// Fixtures
// =============================================================================

async fn setup() -> (Database, LedgerEngine) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let ledger = db.ledger(LedgerConfig::default());
    (db, ledger)
}

fn admin() -> Caller {
    Caller::new("admin-1", Role::Admin)
}

fn cashier() -> Caller {
    Caller::new("cashier-1", Role::User)
}

async fn product(db: &Database, name: &str, price: i64, stock: Option<i64>) -> Product {
    db.products()
        .create(NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::new(price),
            category: "Pizzas".to_string(),
            status: ProductStatus::Active,
            stock,
        })
        .await
        .unwrap()
}

fn line(product_id: &str, quantity: i64, price: i64) -> NewSaleItem {
    NewSaleItem {
        product_id: product_id.to_string(),
        quantity,
        price: Money::new(price),
        subtotal: None,
        second_flavor: None,
        comments: None,
        other_ingredient: None,
        addons: vec![],
    }
}

fn cart(items: Vec<NewSaleItem>, total: i64, payment_method: PaymentMethod) -> NewSale {
    NewSale {
        client_id: None,
        items,
        total: Money::new(total),
        discount: Money::zero(),
        delivery_cost: Money::zero(),
        payment_method,
        order_type: OrderType::Pickup,
    }
}

async fn count(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap()
}

async fn stock_of(db: &Database, product_id: &str) -> Option<i64> {
    db.products().get(product_id).await.unwrap().unwrap().stock
}

fn first_order_number_today(ledger: &LedgerEngine) -> String {
    format_order_number(ledger.business_day(), 1)
}

// =============================================================================
// Open
// =============================================================================

#[tokio::test]
async fn test_open_register_sets_balance_and_writes_opening() {
    let (db, ledger) = setup().await;

    let update = ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    assert!(update.cash_register.is_open);
    assert_eq!(update.cash_register.current_balance, Money::new(50_000));
    assert_eq!(update.cash_register.opening_amount, Money::new(50_000));
    assert!(update.cash_register.last_opened_at.is_some());
    assert_eq!(update.movement.movement_type, CashMovementType::Opening);
    assert_eq!(update.movement.amount, Money::new(50_000));
    assert_eq!(update.movement.description.as_deref(), Some(OPENING_DESCRIPTION));
    assert_eq!(update.cash_register.session_id.as_deref(), Some(update.movement.session_id.as_str()));

    let stored = ledger.status().await.unwrap();
    assert!(stored.is_open);
    assert_eq!(stored.current_balance, Money::new(50_000));

    let audit = db
        .audit()
        .for_record("cash_registers", DEFAULT_CASH_REGISTER_ID)
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "OPEN_CASH_REGISTER");
}

#[tokio::test]
async fn test_open_twice_is_invalid_state() {
    let (db, ledger) = setup().await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    let err = ledger.open_register(&cashier(), Money::new(10_000)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(ledger.status().await.unwrap().current_balance, Money::new(50_000));
    assert_eq!(count(&db, "cash_movements").await, 1);
}

#[tokio::test]
async fn test_open_with_negative_amount_is_invalid_input() {
    let (db, ledger) = setup().await;

    let err = ledger.open_register(&cashier(), Money::new(-1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(!ledger.status().await.unwrap().is_open);
    assert_eq!(count(&db, "cash_movements").await, 0);
}

#[tokio::test]
async fn test_status_creates_closed_register() {
    let (_db, ledger) = setup().await;

    let register = ledger.status().await.unwrap();
    assert_eq!(register.id, DEFAULT_CASH_REGISTER_ID);
    assert!(!register.is_open);
    assert_eq!(register.current_balance, Money::zero());
    assert_eq!(register.session_id, None);
}

// =============================================================================
// Extract
// =============================================================================

#[tokio::test]
async fn test_extract_reduces_balance() {
    let (_db, ledger) = setup().await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    let update = ledger.extract_cash(&admin(), Money::new(20_000), None).await.unwrap();

    assert_eq!(update.cash_register.current_balance, Money::new(30_000));
    assert_eq!(update.movement.movement_type, CashMovementType::Extraction);
    assert_eq!(update.movement.amount, Money::new(20_000));
    assert_eq!(
        update.movement.description.as_deref(),
        Some(DEFAULT_EXTRACTION_DESCRIPTION)
    );
}

#[tokio::test]
async fn test_extract_more_than_balance_changes_nothing() {
    let (db, ledger) = setup().await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();
    ledger
        .extract_cash(&admin(), Money::new(20_000), Some("Pago proveedor".to_string()))
        .await
        .unwrap();

    let err = ledger.extract_cash(&admin(), Money::new(40_000), None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert!(matches!(
        err,
        PosError::Rejected(CoreError::InsufficientFunds { available, requested })
            if available == Money::new(30_000) && requested == Money::new(40_000)
    ));
    assert_eq!(ledger.status().await.unwrap().current_balance, Money::new(30_000));
    assert_eq!(count(&db, "cash_movements").await, 2);
}

#[tokio::test]
async fn test_extract_whole_balance_leaves_zero() {
    let (_db, ledger) = setup().await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    let update = ledger.extract_cash(&admin(), Money::new(50_000), None).await.unwrap();
    assert_eq!(update.cash_register.current_balance, Money::zero());
}

#[tokio::test]
async fn test_cashier_cannot_extract() {
    let (db, ledger) = setup().await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    let err = ledger.extract_cash(&cashier(), Money::new(1_000), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert_eq!(count(&db, "cash_movements").await, 1);
}

#[tokio::test]
async fn test_extract_zero_is_invalid_input() {
    let (_db, ledger) = setup().await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    let err = ledger.extract_cash(&admin(), Money::zero(), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_extract_from_closed_register_is_invalid_state() {
    let (_db, ledger) = setup().await;

    let err = ledger.extract_cash(&admin(), Money::new(1_000), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

// =============================================================================
// Sale
// =============================================================================

#[tokio::test]
async fn test_sale_increments_balance_and_numbers_order() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();
    ledger.extract_cash(&admin(), Money::new(20_000), None).await.unwrap();

    let created = ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash))
        .await
        .unwrap();

    assert_eq!(created.sale.order_number, first_order_number_today(&ledger));
    assert!(created.sale.order_number.ends_with("-001"));
    assert_eq!(created.items.len(), 1);
    assert_eq!(created.items[0].item.product_name, "Muzzarella");
    assert_eq!(created.items[0].item.subtotal, Money::new(15_000));
    assert_eq!(created.items[0].item.line_number, 1);

    let register = ledger.status().await.unwrap();
    assert_eq!(register.current_balance, Money::new(45_000));

    let movements = ledger.movements(PageRequest::default()).await.unwrap();
    let newest = &movements.items[0];
    assert_eq!(newest.movement_type, CashMovementType::Sale);
    assert_eq!(newest.amount, Money::new(15_000));
    assert_eq!(newest.sale_id.as_deref(), Some(created.sale.id.as_str()));
    assert_eq!(
        newest.description.as_deref(),
        Some(format!("Venta #{}", created.sale.order_number).as_str())
    );
}

#[tokio::test]
async fn test_sale_while_closed_writes_nothing() {
    let (db, ledger) = setup().await;
    let soda = product(&db, "Coca-Cola 1L", 12_000, Some(10)).await;

    let err = ledger
        .create_sale(&cashier(), cart(vec![line(&soda.id, 2, 12_000)], 24_000, PaymentMethod::Cash))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RegisterClosed);
    assert_eq!(count(&db, "sales").await, 0);
    assert_eq!(count(&db, "sale_items").await, 0);
    assert_eq!(count(&db, "cash_movements").await, 0);
    assert_eq!(count(&db, "daily_order_counters").await, 0);
    assert_eq!(stock_of(&db, &soda.id).await, Some(10));
}

#[tokio::test]
async fn test_empty_cart_is_invalid_input() {
    let (_db, ledger) = setup().await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    let err = ledger
        .create_sale(&cashier(), cart(vec![], 0, PaymentMethod::Cash))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_oversized_amounts_are_invalid_input() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, Some(10)).await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    let err = ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 2, i64::MAX / 2 + 1)], 1, PaymentMethod::Cash))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 1, 1)], i64::MAX, PaymentMethod::Cash))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert_eq!(count(&db, "sales").await, 0);
    assert_eq!(stock_of(&db, &muzza.id).await, Some(10));
    assert_eq!(ledger.status().await.unwrap().current_balance, Money::new(50_000));
}

#[tokio::test]
async fn test_unknown_product_rolls_back_order_counter() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(0)).await.unwrap();

    let err = ledger
        .create_sale(
            &cashier(),
            cart(
                vec![line(&muzza.id, 1, 15_000), line("ghost", 1, 10_000)],
                25_000,
                PaymentMethod::Cash,
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let created = ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(created.sale.order_number, first_order_number_today(&ledger));
}

#[tokio::test]
async fn test_unknown_client_is_not_found() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(0)).await.unwrap();

    let mut sale = cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash);
    sale.client_id = Some("nobody".to_string());

    let err = ledger.create_sale(&cashier(), sale).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(count(&db, "sales").await, 0);
}

#[tokio::test]
async fn test_sale_snapshots_names_and_addon_prices() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 45_000, None).await;
    let napo = product(&db, "Napolitana", 50_000, None).await;
    let bacon = db
        .products()
        .create_addon(NewProductAddon {
            name: "Panceta".to_string(),
            price: Money::new(8_000),
        })
        .await
        .unwrap();
    ledger.open_register(&cashier(), Money::new(0)).await.unwrap();

    // Unit price carries the addons: 50 000 + 2 × 8 000 of bacon.
    let mut half_and_half = line(&muzza.id, 1, 66_000);
    half_and_half.subtotal = Some(Money::new(66_000));
    half_and_half.second_flavor = Some(SecondFlavor {
        product_id: napo.id.clone(),
    });
    half_and_half.comments = Some("Bien cocida".to_string());
    half_and_half.addons.push(NewSaleItemAddon {
        addon_id: bacon.id.clone(),
        quantity: 2,
    });

    let created = ledger
        .create_sale(&cashier(), cart(vec![half_and_half], 66_000, PaymentMethod::Card))
        .await
        .unwrap();

    db.products()
        .update(
            &muzza.id,
            ProductUpdate {
                name: Some("Muzza Especial".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = db
        .sales()
        .get_by_order_number(&created.sale.order_number)
        .await
        .unwrap()
        .unwrap();
    let line = &stored.items[0];
    assert_eq!(line.item.product_name, "Muzzarella");
    assert_eq!(line.item.price, Money::new(66_000));
    assert_eq!(line.item.subtotal, stored.sale.total);
    assert_eq!(line.item.second_flavor_product_name.as_deref(), Some("Napolitana"));
    assert_eq!(line.item.comments.as_deref(), Some("Bien cocida"));
    assert_eq!(line.addons.len(), 1);
    assert_eq!(line.addons[0].addon_name, "Panceta");
    assert_eq!(line.addons[0].price, Money::new(8_000));
    assert_eq!(line.addons[0].quantity, 2);
    assert_eq!(stored.sale.payment_method, PaymentMethod::Card);
}

#[tokio::test]
async fn test_sale_decrements_tracked_stock_past_zero() {
    let (db, ledger) = setup().await;
    let soda = product(&db, "Coca-Cola 1L", 12_000, Some(1)).await;
    let muzza = product(&db, "Muzzarella", 45_000, None).await;
    ledger.open_register(&cashier(), Money::new(0)).await.unwrap();

    ledger
        .create_sale(
            &cashier(),
            cart(
                vec![line(&soda.id, 2, 12_000), line(&muzza.id, 1, 45_000)],
                69_000,
                PaymentMethod::Cash,
            ),
        )
        .await
        .unwrap();

    assert_eq!(stock_of(&db, &soda.id).await, Some(-1));
    assert_eq!(stock_of(&db, &muzza.id).await, None);
}

#[tokio::test]
async fn test_repeated_sale_gets_new_order_number() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(0)).await.unwrap();

    let sale = cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash);
    let first = ledger.create_sale(&cashier(), sale.clone()).await.unwrap();
    let second = ledger.create_sale(&cashier(), sale).await.unwrap();

    assert_ne!(first.sale.id, second.sale.id);
    assert!(first.sale.order_number.ends_with("-001"));
    assert!(second.sale.order_number.ends_with("-002"));
    assert_eq!(ledger.status().await.unwrap().current_balance, Money::new(30_000));
    assert_eq!(db.sales().count_for_day(&first.sale.business_day).await.unwrap(), 2);
}

// =============================================================================
// Close
// =============================================================================

#[tokio::test]
async fn test_close_register_writes_closing_and_ticket() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    let napo = product(&db, "Napolitana", 20_000, None).await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();
    ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash))
        .await
        .unwrap();
    ledger
        .create_sale(&cashier(), cart(vec![line(&napo.id, 1, 20_000)], 20_000, PaymentMethod::Card))
        .await
        .unwrap();
    ledger.extract_cash(&admin(), Money::new(10_000), None).await.unwrap();

    let closure = ledger.close_register(&cashier(), Money::new(54_000)).await.unwrap();

    assert!(!closure.cash_register.is_open);
    assert_eq!(closure.cash_register.session_id, None);
    assert!(closure.cash_register.last_closed_at.is_some());
    assert_eq!(closure.cash_register.current_balance, Money::new(75_000));

    assert_eq!(closure.movement.movement_type, CashMovementType::Closing);
    assert_eq!(closure.movement.amount, Money::new(75_000));

    let ticket = &closure.cash_ticket;
    assert_eq!(ticket.opening_amount, Money::new(50_000));
    assert_eq!(ticket.cash_total, Money::new(15_000));
    assert_eq!(ticket.card_total, Money::new(20_000));
    assert_eq!(ticket.transfer_total, Money::zero());
    assert_eq!(ticket.total_sales, Money::new(35_000));
    assert_eq!(ticket.sales_count, 2);
    assert_eq!(ticket.extractions_total, Money::new(10_000));
    assert_eq!(ticket.expected_balance, Money::new(75_000));
    assert_eq!(ticket.counted_amount, Money::new(54_000));
    assert_eq!(ticket.difference, Money::new(-21_000));

    let tickets = db.cash_register().tickets(PageRequest::default()).await.unwrap();
    assert_eq!(tickets.total, 1);
    assert_eq!(tickets.items[0].id, ticket.id);
    assert!(db.cash_register().ticket(&ticket.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_close_when_closed_is_invalid_state() {
    let (db, ledger) = setup().await;

    let err = ledger.close_register(&cashier(), Money::zero()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(count(&db, "cash_tickets").await, 0);
}

#[tokio::test]
async fn test_next_session_starts_fresh() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(10_000)).await.unwrap();
    ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash))
        .await
        .unwrap();
    ledger.close_register(&cashier(), Money::new(25_000)).await.unwrap();

    ledger.open_register(&cashier(), Money::new(5_000)).await.unwrap();
    let summary = ledger.session_summary().await.unwrap();
    assert_eq!(summary.sales_count, 0);
    assert_eq!(summary.total_sales, Money::zero());
    assert_eq!(summary.current_balance, Money::new(5_000));

    let closure = ledger.close_register(&cashier(), Money::new(5_000)).await.unwrap();
    assert_eq!(closure.cash_ticket.sales_count, 0);
    assert_eq!(closure.cash_ticket.difference, Money::zero());
}

// =============================================================================
// Summary & Consistency
// =============================================================================

#[tokio::test]
async fn test_session_summary_tracks_payment_methods() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(20_000)).await.unwrap();
    for method in [PaymentMethod::Cash, PaymentMethod::Transfer, PaymentMethod::Transfer] {
        ledger
            .create_sale(&cashier(), cart(vec![line(&muzza.id, 1, 15_000)], 15_000, method))
            .await
            .unwrap();
    }

    let summary = ledger.session_summary().await.unwrap();
    assert_eq!(summary.opening_amount, Money::new(20_000));
    assert_eq!(summary.cash_total, Money::new(15_000));
    assert_eq!(summary.transfer_total, Money::new(30_000));
    assert_eq!(summary.total_sales, Money::new(45_000));
    assert_eq!(summary.sales_count, 3);
    assert_eq!(summary.current_balance, Money::new(65_000));
}

#[tokio::test]
async fn test_summary_of_closed_register_is_empty() {
    let (_db, ledger) = setup().await;

    let summary = ledger.session_summary().await.unwrap();
    assert_eq!(summary.session_id, None);
    assert_eq!(summary.sales_count, 0);
}

#[tokio::test]
async fn test_ledger_has_no_drift_after_mixed_operations() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    for i in 0..5 {
        ledger
            .create_sale(
                &cashier(),
                cart(vec![line(&muzza.id, i + 1, 15_000)], 15_000 * (i + 1), PaymentMethod::Cash),
            )
            .await
            .unwrap();
        if i % 2 == 0 {
            ledger.extract_cash(&admin(), Money::new(7_500), None).await.unwrap();
        }
    }
    let _ = ledger.extract_cash(&admin(), Money::new(10_000_000), None).await.unwrap_err();

    assert_eq!(ledger.verify_session().await.unwrap(), Money::zero());
    let register = ledger.status().await.unwrap();
    assert_eq!(register.current_balance, Money::new(50_000 + 225_000 - 22_500));
}

// =============================================================================
// Atomicity & History
// =============================================================================

#[tokio::test]
async fn test_store_failure_rolls_back_whole_sale() {
    let (db, ledger) = setup().await;
    let soda = product(&db, "Coca-Cola 1L", 12_000, Some(5)).await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    sqlx::query(
        r#"
        CREATE TRIGGER fail_sale_movement BEFORE INSERT ON cash_movements
        WHEN NEW.movement_type = 'SALE'
        BEGIN SELECT RAISE(ABORT, 'simulated failure'); END
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let err = ledger
        .create_sale(&cashier(), cart(vec![line(&soda.id, 2, 12_000)], 24_000, PaymentMethod::Cash))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(stock_of(&db, &soda.id).await, Some(5));
    assert_eq!(count(&db, "sales").await, 0);
    assert_eq!(count(&db, "sale_items").await, 0);
    assert_eq!(count(&db, "cash_movements").await, 1);
    assert_eq!(ledger.status().await.unwrap().current_balance, Money::new(50_000));

    sqlx::query("DROP TRIGGER fail_sale_movement")
        .execute(db.pool())
        .await
        .unwrap();

    let created = ledger
        .create_sale(&cashier(), cart(vec![line(&soda.id, 2, 12_000)], 24_000, PaymentMethod::Cash))
        .await
        .unwrap();
    assert_eq!(created.sale.order_number, first_order_number_today(&ledger));
}

#[tokio::test]
async fn test_ledger_tables_are_append_only() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();
    ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash))
        .await
        .unwrap();

    for statement in [
        "UPDATE cash_movements SET amount = 0",
        "DELETE FROM cash_movements",
        "UPDATE sales SET total = 0",
        "DELETE FROM sale_items",
        "DELETE FROM audit_logs",
    ] {
        let err = sqlx::query(statement).execute(db.pool()).await.unwrap_err();
        assert!(
            matches!(DbError::from(err), DbError::ConstraintViolation(_)),
            "{statement} should be rejected"
        );
    }
    assert_eq!(count(&db, "cash_movements").await, 2);
}

#[tokio::test]
async fn test_audit_failure_keeps_operation_committed() {
    let (db, ledger) = setup().await;
    sqlx::query(
        "CREATE TRIGGER fail_audit BEFORE INSERT ON audit_logs BEGIN SELECT RAISE(ABORT, 'audit down'); END",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let update = ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();
    assert!(update.cash_register.is_open);
    assert!(ledger.status().await.unwrap().is_open);
    assert_eq!(count(&db, "audit_logs").await, 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sales_get_distinct_order_numbers() {
    let path = std::env::temp_dir().join(format!("poli-{}.db", Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(8)).await.unwrap();
    let ledger = db.ledger(LedgerConfig::default());
    let muzza = product(&db, "Muzzarella", 15_000, Some(100)).await;
    ledger.open_register(&cashier(), Money::new(10_000)).await.unwrap();

    const SALES: usize = 12;
    let mut handles = Vec::with_capacity(SALES);
    for _ in 0..SALES {
        let ledger = ledger.clone();
        let sale = cart(vec![line(&muzza.id, 1, 15_000)], 15_000, PaymentMethod::Cash);
        handles.push(tokio::spawn(async move {
            ledger.create_sale(&cashier(), sale).await
        }));
    }

    let mut numbers = Vec::with_capacity(SALES);
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().sale.order_number);
    }
    numbers.sort();

    let day = ledger.business_day();
    let expected: Vec<String> = (1..=SALES as i64).map(|n| format_order_number(day, n)).collect();
    assert_eq!(numbers, expected);

    let register = ledger.status().await.unwrap();
    assert_eq!(register.current_balance, Money::new(10_000 + 15_000 * SALES as i64));
    assert_eq!(stock_of(&db, &muzza.id).await, Some(100 - SALES as i64));
    assert_eq!(ledger.verify_session().await.unwrap(), Money::zero());

    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_extractions_never_overdraw() {
    let path = std::env::temp_dir().join(format!("poli-{}.db", Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(8)).await.unwrap();
    let ledger = db.ledger(LedgerConfig::default());
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();

    const EXTRACTIONS: usize = 10;
    let mut handles = Vec::with_capacity(EXTRACTIONS);
    for _ in 0..EXTRACTIONS {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger.extract_cash(&admin(), Money::new(20_000), None).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::InsufficientFunds),
        }
    }
    assert_eq!(succeeded, 2);

    let register = ledger.status().await.unwrap();
    assert_eq!(register.current_balance, Money::new(10_000));
    assert_eq!(count(&db, "cash_movements").await, 1 + 2);
    assert_eq!(ledger.verify_session().await.unwrap(), Money::zero());

    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

// =============================================================================
// Queries & Reports
// =============================================================================

#[tokio::test]
async fn test_sales_listing_and_reports() {
    let (db, ledger) = setup().await;
    let muzza = product(&db, "Muzzarella", 15_000, None).await;
    let napo = product(&db, "Napolitana", 20_000, None).await;
    ledger.open_register(&cashier(), Money::new(50_000)).await.unwrap();
    ledger
        .create_sale(&cashier(), cart(vec![line(&muzza.id, 3, 15_000)], 45_000, PaymentMethod::Cash))
        .await
        .unwrap();
    ledger
        .create_sale(&cashier(), cart(vec![line(&napo.id, 1, 20_000)], 20_000, PaymentMethod::Card))
        .await
        .unwrap();
    ledger.extract_cash(&admin(), Money::new(5_000), None).await.unwrap();

    let (from, to) = business_day_bounds(ledger.business_day(), ledger.config().business_offset);

    let page = db
        .sales()
        .list(
            &SaleFilter {
                from: Some(from),
                to: Some(to),
                client_id: None,
            },
            PageRequest::new(Some(1), Some(1)),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total_pages, 2);

    let sales = db.reports().sales_report(from, to).await.unwrap();
    assert_eq!(sales.total_revenue, Money::new(65_000));
    assert_eq!(sales.sales_count, 2);
    assert_eq!(sales.by_payment_method.len(), 2);
    assert_eq!(sales.top_products[0].product_name, "Muzzarella");
    assert_eq!(sales.top_products[0].quantity, 3);
    assert_eq!(sales.top_products[0].revenue, Money::new(45_000));

    let cash = db
        .reports()
        .cash_report(DEFAULT_CASH_REGISTER_ID, from, to)
        .await
        .unwrap();
    assert!(cash.is_open);
    assert_eq!(cash.opening_amount, Money::new(50_000));
    assert_eq!(cash.current_balance, Money::new(110_000));
    assert_eq!(cash.total_sales, Money::new(65_000));
    assert_eq!(cash.total_extractions, Money::new(5_000));
    assert_eq!(cash.movements.len(), 4);
}
