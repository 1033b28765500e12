mod common;

use assert_matches::assert_matches;
use common::TestApp;
use healthlink_api::{
    entities::{order, order_item, stock_item, OrderStatus, StockUnit, TransactionType},
    errors::ServiceError,
    services::{
        procurement::{ChangeOrderStatusCommand, OrderLineCommand, PlaceOrderCommand},
        stock_ledger::RegisterStockItemCommand,
    },
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

fn line(stock_item_id: i32, quantity: Decimal) -> OrderLineCommand {
    OrderLineCommand {
        stock_item_id,
        quantity,
    }
}

async fn unpriced_item(app: &TestApp, name: &str) -> stock_item::Model {
    app.state
        .services
        .stock_ledger
        .register_item(
            RegisterStockItemCommand {
                name: name.into(),
                description: None,
                unit: StockUnit::Vial,
                initial_stock: Decimal::ZERO,
                reorder_level: dec!(5),
                purchase_price: None,
                sale_price: None,
                supplied_price: None,
                expiry_date: None,
                supplier_id: None,
                location: None,
            },
            app.actor,
        )
        .await
        .unwrap()
        .stock_item
}

#[tokio::test]
async fn placing_an_order_prices_every_line() {
    let app = TestApp::new().await;
    let facility = app.seed_facility("Kisumu District Hospital").await;
    let supplier = app.seed_supplier("Pharma Distributors").await;
    let negotiated = app
        .state
        .services
        .stock_ledger
        .register_item(
            RegisterStockItemCommand {
                name: "Gentamicin 80mg".into(),
                description: None,
                unit: StockUnit::Ampule,
                initial_stock: dec!(10),
                reorder_level: dec!(5),
                purchase_price: Some(dec!(3)),
                sale_price: None,
                supplied_price: Some(dec!(1.5)),
                expiry_date: None,
                supplier_id: Some(supplier.id),
                location: None,
            },
            app.actor,
        )
        .await
        .unwrap()
        .stock_item;
    let listed = app.seed_stock_item("Cotrimoxazole 480mg", dec!(0), dec!(50), None).await;

    let detail = app
        .state
        .services
        .procurement
        .place_order(
            PlaceOrderCommand {
                supplier_id: supplier.id,
                facility_id: Some(facility.id),
                notes: Some("Monthly restock".into()),
                items: vec![line(negotiated.id, dec!(10)), line(listed.id, dec!(4))],
            },
            None,
            app.actor,
        )
        .await
        .unwrap();

    assert_eq!(detail.order.status, OrderStatus::Ordered);
    assert_eq!(detail.order.facility_id, facility.id);
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.items[0].unit_price, dec!(1.5));
    assert_eq!(detail.items[1].unit_price, dec!(2));
    assert_eq!(detail.order.total_amount, dec!(23));

    let history = app
        .state
        .services
        .audit_trail
        .order_history(detail.order.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_type, "Order Placed");
    assert_eq!(
        history[0].description,
        "Order placed with Pharma Distributors for 2 items."
    );
}

#[tokio::test]
async fn an_unpriced_line_rolls_back_the_whole_order() {
    let app = TestApp::new().await;
    let facility = app.seed_facility("Mombasa Clinic").await;
    let supplier = app.seed_supplier("Coast Medical").await;
    let priced = app.seed_stock_item("Doxycycline 100mg", dec!(0), dec!(10), None).await;
    let unpriced = unpriced_item(&app, "Anti-Rabies Vaccine").await;

    let err = app
        .state
        .services
        .procurement
        .place_order(
            PlaceOrderCommand {
                supplier_id: supplier.id,
                facility_id: Some(facility.id),
                notes: None,
                items: vec![line(priced.id, dec!(5)), line(unpriced.id, dec!(2))],
            },
            None,
            app.actor,
        )
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::PriceNotFound(ref msg) if msg.contains("Anti-Rabies Vaccine")
    );
    assert_eq!(order::Entity::find().count(app.db()).await.unwrap(), 0);
    assert_eq!(order_item::Entity::find().count(app.db()).await.unwrap(), 0);
}

#[tokio::test]
async fn facility_defaults_to_the_callers_facility() {
    let app = TestApp::new().await;
    let facility = app.seed_facility("Nakuru Health Centre").await;
    let supplier = app.seed_supplier("Rift Valley Supplies").await;
    let item = app.seed_stock_item("ORS Sachets", dec!(0), dec!(100), None).await;
    let procurement = &app.state.services.procurement;
    let command = PlaceOrderCommand {
        supplier_id: supplier.id,
        facility_id: None,
        notes: None,
        items: vec![line(item.id, dec!(100))],
    };

    let missing = procurement
        .place_order(command.clone(), None, app.actor)
        .await
        .unwrap_err();
    assert_matches!(missing, ServiceError::ValidationError(_));

    let detail = procurement
        .place_order(command, Some(facility.id), app.actor)
        .await
        .unwrap();
    assert_eq!(detail.order.facility_id, facility.id);
}

#[tokio::test]
async fn receiving_books_stock_and_completes_the_order() {
    let app = TestApp::new().await;
    let facility = app.seed_facility("Eldoret Referral").await;
    let supplier = app.seed_supplier("Highlands Pharma").await;
    let item = app.seed_stock_item("Zinc Sulphate 20mg", dec!(6), dec!(20), None).await;

    let placed = app
        .state
        .services
        .procurement
        .place_order(
            PlaceOrderCommand {
                supplier_id: supplier.id,
                facility_id: Some(facility.id),
                notes: None,
                items: vec![line(item.id, dec!(50))],
            },
            None,
            app.actor,
        )
        .await
        .unwrap();

    let received = app
        .state
        .services
        .procurement
        .receive_order(placed.order.id, app.actor)
        .await
        .unwrap();
    assert_eq!(received.order.status, OrderStatus::Completed);
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(56));

    let stock_history = app
        .state
        .services
        .audit_trail
        .stock_history(item.id)
        .await
        .unwrap();
    let last = stock_history.last().unwrap();
    assert_eq!(last.transaction_type, TransactionType::In);
    assert_eq!(last.reason, format!("Received on Order {}", placed.order.id));

    let again = app
        .state
        .services
        .procurement
        .receive_order(placed.order.id, app.actor)
        .await
        .unwrap_err();
    assert_matches!(again, ServiceError::InvalidState(_));

    let order_history = app
        .state
        .services
        .audit_trail
        .order_history(placed.order.id)
        .await
        .unwrap();
    let kinds: Vec<_> = order_history.iter().map(|h| h.change_type.as_str()).collect();
    assert_eq!(kinds, vec!["Order Placed", "Order Received"]);
}

#[tokio::test]
async fn status_changes_follow_the_lifecycle() {
    let app = TestApp::new().await;
    let facility = app.seed_facility("Thika Level 5").await;
    let supplier = app.seed_supplier("Central Meds").await;
    let item = app.seed_stock_item("Folic Acid 5mg", dec!(0), dec!(10), None).await;
    let procurement = &app.state.services.procurement;

    let placed = procurement
        .place_order(
            PlaceOrderCommand {
                supplier_id: supplier.id,
                facility_id: Some(facility.id),
                notes: None,
                items: vec![line(item.id, dec!(10))],
            },
            None,
            app.actor,
        )
        .await
        .unwrap();

    let cancelled = procurement
        .update_status(
            placed.order.id,
            ChangeOrderStatusCommand {
                status: OrderStatus::Cancelled,
                note: Some("Supplier out of stock".into()),
            },
            app.actor,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let revived = procurement
        .update_status(
            placed.order.id,
            ChangeOrderStatusCommand {
                status: OrderStatus::Processing,
                note: None,
            },
            app.actor,
        )
        .await
        .unwrap_err();
    assert_matches!(revived, ServiceError::InvalidState(_));

    let receive = procurement
        .receive_order(placed.order.id, app.actor)
        .await
        .unwrap_err();
    assert_matches!(receive, ServiceError::InvalidState(_));
    assert_eq!(app.stock_item(item.id).await.current_stock, Decimal::ZERO);
}
