//! End-to-end tests for the checkout transaction coordinator.
//!
//! Every test runs against a real SQLite database on disk (a temp file,
//! removed on drop) so the transactional behavior under test - guarded
//! decrements, rollback, write serialization - is the real thing, not an
//! in-memory approximation.

use chrono::Utc;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use till_core::{Customer, MovementType, OrderStatus, PaymentMethod, Product};
use till_db::{CheckoutError, CheckoutItem, CheckoutRequest, Database, DbConfig};

const OPERATOR: &str = "user-cashier-1";

// =============================================================================
// Test Harness
// =============================================================================

/// A throwaway on-disk database, deleted (with its WAL sidecars) on drop.
struct TestDb {
    db: Database,
    path: PathBuf,
}

impl TestDb {
    async fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let path = std::env::temp_dir().join(format!("tillpoint-test-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(8))
            .await
            .expect("test database");

        TestDb { db, path }
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut os = self.path.clone().into_os_string();
            os.push(suffix);
            let _ = std::fs::remove_file(os);
        }
    }
}

async fn seed_product(db: &Database, sku: &str, price_cents: i64, cost_cents: Option<i64>, stock: i64) -> Product {
    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        sku: sku.to_string(),
        barcode: None,
        name: format!("Product {sku}"),
        description: None,
        price_cents,
        cost_cents,
        stock_quantity: stock,
        min_stock: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.expect("seed product");
    product
}

async fn seed_customer(db: &Database) -> Customer {
    let now = Utc::now();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        member_code: format!("MEM-{}", &Uuid::new_v4().simple().to_string()[..6].to_uppercase()),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        phone: None,
        email: None,
        loyalty_points: 0,
        total_spent_cents: 0,
        visit_count: 0,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.customers().insert(&customer).await.expect("seed customer");
    customer
}

fn item(product: &Product, quantity: i64, discount_cents: i64) -> CheckoutItem {
    CheckoutItem {
        product_id: product.id.clone(),
        quantity,
        unit_price_cents: product.price_cents,
        discount_cents,
    }
}

fn cash_request(items: Vec<CheckoutItem>, amount_paid_cents: i64) -> CheckoutRequest {
    CheckoutRequest {
        customer_id: None,
        items,
        payment_method: PaymentMethod::Cash,
        amount_paid_cents,
        discount_cents: 0,
        note: None,
    }
}

async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products()
        .get_by_id(product_id)
        .await
        .expect("product read")
        .expect("product exists")
        .stock_quantity
}

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test]
async fn checkout_commits_order_items_stock_and_totals() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    db.settings().set("tax_rate", "10").await.unwrap();
    let cola = seed_product(db, "COLA-330", 200, Some(100), 10).await;
    let chips = seed_product(db, "CHIPS-50", 150, Some(80), 10).await;

    // the worked example: subtotal 9.00, discount 0.50, tax 0.85, total 9.35
    let completed = db
        .checkout_service()
        .checkout(
            OPERATOR,
            cash_request(vec![item(&cola, 3, 0), item(&chips, 2, 50)], 1000),
        )
        .await
        .unwrap();

    let order = &completed.order;
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.subtotal_cents, 900);
    assert_eq!(order.discount_cents, 50);
    assert_eq!(order.tax_cents, 85);
    assert_eq!(order.total_amount_cents, 935);
    assert_eq!(order.amount_paid_cents, 1000);
    assert_eq!(order.change_cents, 65);
    // profit = taxable base 850 - cost of goods (3x100 + 2x80 = 460)
    assert_eq!(order.profit_cents, 390);
    assert_eq!(order.user_id, OPERATOR);
    assert!(order.completed_at.is_some());

    // order number shape: ORD-YYYYMMDD-XXXXXX
    let parts: Vec<&str> = order.order_number.split('-').collect();
    assert_eq!(parts[0], "ORD");
    assert_eq!(parts[1].len(), 8);
    assert_eq!(parts[2].len(), 6);

    assert_eq!(completed.items.len(), 2);
    assert_eq!(completed.items[0].sku_snapshot, "COLA-330");
    assert_eq!(completed.items[0].total_price_cents, 600);
    assert_eq!(completed.items[1].total_price_cents, 250);

    // stock decremented per line
    assert_eq!(stock_of(db, &cola.id).await, 7);
    assert_eq!(stock_of(db, &chips.id).await, 8);

    // the persisted order is readable by business key too
    let by_number = db
        .orders()
        .get_by_order_number(&order.order_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id, order.id);
    assert_eq!(
        db.orders().items_for_order(&order.id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn stock_movements_carry_true_before_after_levels() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 10).await;

    let completed = db
        .checkout_service()
        .checkout(OPERATOR, cash_request(vec![item(&cola, 3, 0)], 1000))
        .await
        .unwrap();

    let movements = db
        .stock()
        .movements_for_reference(&completed.order.order_number)
        .await
        .unwrap();

    assert_eq!(movements.len(), 1);
    let movement = &movements[0];
    assert_eq!(movement.movement_type, MovementType::Out);
    assert_eq!(movement.quantity, -3);
    assert_eq!(movement.previous_stock, 10);
    assert_eq!(movement.new_stock, 7);
    assert_eq!(movement.previous_stock + movement.quantity, movement.new_stock);
}

// =============================================================================
// Rejections Before Persistence
// =============================================================================

#[tokio::test]
async fn insufficient_payment_is_rejected_without_persistence() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    db.settings().set("tax_rate", "10").await.unwrap();
    let cola = seed_product(db, "COLA-330", 200, None, 10).await;
    let chips = seed_product(db, "CHIPS-50", 150, None, 10).await;

    // total is 9.35; tender 9.00
    let err = db
        .checkout_service()
        .checkout(
            OPERATOR,
            cash_request(vec![item(&cola, 3, 0), item(&chips, 2, 50)], 900),
        )
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientPayment {
            required_cents,
            paid_cents,
        } => {
            assert_eq!(required_cents, 935);
            assert_eq!(paid_cents, 900);
        }
        other => panic!("expected InsufficientPayment, got {other:?}"),
    }
    assert_eq!(stock_of(db, &cola.id).await, 10);
    assert_eq!(db.orders().count().await.unwrap(), 0);
}

#[tokio::test]
async fn empty_cart_and_bad_lines_are_validation_errors() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 10).await;
    let service = db.checkout_service();

    let err = service
        .checkout(OPERATOR, cash_request(vec![], 1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "VALIDATION_ERROR");

    let mut bad_qty = item(&cola, 1, 0);
    bad_qty.quantity = 0;
    let err = service
        .checkout(OPERATOR, cash_request(vec![bad_qty], 1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "VALIDATION_ERROR");

    let mut bad_price = item(&cola, 1, 0);
    bad_price.unit_price_cents = -5;
    let err = service
        .checkout(OPERATOR, cash_request(vec![bad_price], 1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "VALIDATION_ERROR");

    // discount larger than the line subtotal
    let err = service
        .checkout(OPERATOR, cash_request(vec![item(&cola, 1, 500)], 1000))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "VALIDATION_ERROR");

    assert_eq!(db.orders().count().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_and_inactive_products_are_rejected() {
    let harness = TestDb::new().await;
    let db = &harness.db;
    let service = db.checkout_service();

    let ghost = CheckoutItem {
        product_id: Uuid::new_v4().to_string(),
        quantity: 1,
        unit_price_cents: 100,
        discount_cents: 0,
    };
    let err = service
        .checkout(OPERATOR, cash_request(vec![ghost], 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::ProductNotFound { .. }));

    let retired = seed_product(db, "RETIRED-1", 100, None, 10).await;
    db.products().soft_delete(&retired.id).await.unwrap();
    let err = service
        .checkout(OPERATOR, cash_request(vec![item(&retired, 1, 0)], 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::ProductNotFound { .. }));
}

#[tokio::test]
async fn unknown_customer_is_rejected() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 10).await;
    let mut request = cash_request(vec![item(&cola, 1, 0)], 1000);
    request.customer_id = Some(Uuid::new_v4().to_string());

    let err = db
        .checkout_service()
        .checkout(OPERATOR, request)
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::CustomerNotFound { .. }));
    assert_eq!(err.kind(), "VALIDATION_ERROR");
    assert_eq!(stock_of(db, &cola.id).await, 10);
}

// =============================================================================
// Stock: Oversell and Atomicity
// =============================================================================

#[tokio::test]
async fn oversell_is_rejected_and_stock_untouched() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 5).await;

    let err = db
        .checkout_service()
        .checkout(OPERATOR, cash_request(vec![item(&cola, 6, 0)], 10_000))
        .await
        .unwrap_err();

    match err {
        CheckoutError::InsufficientStock {
            ref sku,
            available,
            requested,
        } => {
            assert_eq!(sku, "COLA-330");
            assert_eq!(available, 5);
            assert_eq!(requested, 6);
        }
        ref other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(err.kind(), "INSUFFICIENT_STOCK");

    assert_eq!(stock_of(db, &cola.id).await, 5);
    assert_eq!(db.orders().count().await.unwrap(), 0);
    assert!(db
        .stock()
        .movements_for_product(&cola.id, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failed_line_rolls_back_the_entire_checkout() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 10).await;
    let chips = seed_product(db, "CHIPS-50", 150, None, 1).await;
    let customer = seed_customer(db).await;

    let mut request = cash_request(vec![item(&cola, 2, 0), item(&chips, 3, 0)], 10_000);
    request.customer_id = Some(customer.id.clone());

    let err = db
        .checkout_service()
        .checkout(OPERATOR, request)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));

    // nothing from the attempt survives: no order, no items, no movement,
    // no decrement of the first line, no loyalty accrual
    assert_eq!(db.orders().count().await.unwrap(), 0);
    assert_eq!(stock_of(db, &cola.id).await, 10);
    assert_eq!(stock_of(db, &chips.id).await, 1);
    assert!(db
        .stock()
        .movements_for_product(&cola.id, 10)
        .await
        .unwrap()
        .is_empty());

    let untouched = db
        .customers()
        .get_by_id(&customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.loyalty_points, 0);
    assert_eq!(untouched.total_spent_cents, 0);
    assert_eq!(untouched.visit_count, 0);
}

#[tokio::test]
async fn concurrent_checkouts_for_last_unit_serialize_to_one_winner() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let last_one = seed_product(db, "LAST-ONE", 500, None, 1).await;

    let mut handles = Vec::new();
    for n in 0..4 {
        let service = db.checkout_service();
        let request = cash_request(vec![item(&last_one, 1, 0)], 1000);
        handles.push(tokio::spawn(async move {
            service.checkout(&format!("user-{n}"), request).await
        }));
    }

    let mut successes = 0;
    let mut stock_failures = 0;
    for handle in handles {
        match handle.await.expect("task completed") {
            Ok(_) => successes += 1,
            Err(CheckoutError::InsufficientStock { .. }) => stock_failures += 1,
            Err(other) => panic!("unexpected checkout error: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(stock_failures, 3);
    assert_eq!(stock_of(db, &last_one.id).await, 0);
    assert_eq!(db.orders().count().await.unwrap(), 1);
}

// =============================================================================
// Loyalty
// =============================================================================

#[tokio::test]
async fn loyalty_accrual_for_attached_customer() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    // zero tax so the total is exactly 47.80
    db.settings().set("tax_rate", "0").await.unwrap();
    let vinyl = seed_product(db, "VINYL-LP", 4780, None, 10).await;
    let customer = seed_customer(db).await;

    let mut request = cash_request(vec![item(&vinyl, 1, 0)], 5000);
    request.customer_id = Some(customer.id.clone());

    let completed = db
        .checkout_service()
        .checkout(OPERATOR, request)
        .await
        .unwrap();

    assert_eq!(completed.order.total_amount_cents, 4780);

    let after = db
        .customers()
        .get_by_id(&customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.loyalty_points, 47);
    assert_eq!(after.total_spent_cents, 4780);
    assert_eq!(after.visit_count, 1);

    // the response carries the post-accrual summary
    let summary = completed.customer.expect("customer summary");
    assert_eq!(summary.loyalty_points, 47);

    // a second order keeps incrementing
    let mut request = cash_request(vec![item(&vinyl, 1, 0)], 5000);
    request.customer_id = Some(customer.id.clone());
    db.checkout_service()
        .checkout(OPERATOR, request)
        .await
        .unwrap();

    let after = db
        .customers()
        .get_by_id(&customer.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.loyalty_points, 94);
    assert_eq!(after.total_spent_cents, 9560);
    assert_eq!(after.visit_count, 2);
}

// =============================================================================
// Tax Rate Setting
// =============================================================================

#[tokio::test]
async fn tax_rate_defaults_to_ten_percent_when_missing_or_garbage() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 1000, None, 100).await;
    let service = db.checkout_service();

    // no setting at all -> 10%
    let completed = service
        .checkout(OPERATOR, cash_request(vec![item(&cola, 1, 0)], 2000))
        .await
        .unwrap();
    assert_eq!(completed.order.tax_cents, 100);
    assert_eq!(completed.order.total_amount_cents, 1100);

    // unparseable setting -> still 10%
    db.settings().set("tax_rate", "not-a-number").await.unwrap();
    let completed = service
        .checkout(OPERATOR, cash_request(vec![item(&cola, 1, 0)], 2000))
        .await
        .unwrap();
    assert_eq!(completed.order.tax_cents, 100);

    // pinned fractional rate is honored, half-up at the cent
    db.settings().set("tax_rate", "8.25").await.unwrap();
    let completed = service
        .checkout(OPERATOR, cash_request(vec![item(&cola, 1, 0)], 2000))
        .await
        .unwrap();
    assert_eq!(completed.order.tax_cents, 83);
    assert_eq!(completed.order.total_amount_cents, 1083);
}

// =============================================================================
// Audit Trail
// =============================================================================

#[tokio::test]
async fn committed_checkout_leaves_one_audit_entry() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 10).await;

    let completed = db
        .checkout_service()
        .checkout(OPERATOR, cash_request(vec![item(&cola, 1, 0)], 1000))
        .await
        .unwrap();

    // the audit write is fire-and-forget on a spawned task; poll briefly
    let mut entries = Vec::new();
    for _ in 0..100 {
        entries = db
            .audit()
            .for_entity("order", &completed.order.id)
            .await
            .unwrap();
        if !entries.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.action, "CREATE");
    assert_eq!(entry.user_id.as_deref(), Some(OPERATOR));

    let payload: serde_json::Value =
        serde_json::from_str(entry.new_values.as_deref().unwrap()).unwrap();
    assert_eq!(payload["orderNumber"], completed.order.order_number);
    assert_eq!(payload["totalAmountCents"], 220);
    assert_eq!(payload["itemCount"], 1);
}

// =============================================================================
// Order Numbers
// =============================================================================

#[tokio::test]
async fn order_numbers_are_unique_across_checkouts() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 100).await;
    let service = db.checkout_service();

    let mut seen = std::collections::HashSet::new();
    for _ in 0..10 {
        let completed = service
            .checkout(OPERATOR, cash_request(vec![item(&cola, 1, 0)], 1000))
            .await
            .unwrap();
        assert!(seen.insert(completed.order.order_number.clone()));
    }
}

// =============================================================================
// Ledger: Receiving and Adjustments
// =============================================================================

#[tokio::test]
async fn receive_and_adjust_keep_the_trail_accurate() {
    let harness = TestDb::new().await;
    let db = &harness.db;

    let cola = seed_product(db, "COLA-330", 200, None, 0).await;
    let ledger = db.stock();

    let received = ledger
        .receive(&cola.id, 10, Some("PO-1001"))
        .await
        .unwrap();
    assert_eq!(received.movement_type, MovementType::In);
    assert_eq!(received.previous_stock, 0);
    assert_eq!(received.new_stock, 10);

    let adjusted = ledger
        .adjust(&cola.id, -3, Some("stocktake"))
        .await
        .unwrap();
    assert_eq!(adjusted.movement_type, MovementType::Adjustment);
    assert_eq!(adjusted.previous_stock, 10);
    assert_eq!(adjusted.new_stock, 7);

    // an adjustment below zero is refused, stock unchanged
    let err = ledger.adjust(&cola.id, -20, None).await.unwrap_err();
    assert!(matches!(err, till_db::StockError::Insufficient { .. }));
    assert_eq!(stock_of(db, &cola.id).await, 7);

    let trail = ledger.movements_for_product(&cola.id, 10).await.unwrap();
    assert_eq!(trail.len(), 2);
}
