mod common;

use assert_matches::assert_matches;
use common::TestApp;
use healthlink_api::{
    entities::{
        inventory_history, patient_visit, payment_transaction, PaymentMethod, PrescriptionStatus,
        TransactionType,
    },
    errors::ServiceError,
    services::dispensing::DispenseCommand,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

fn cash(prescription_id: i32, quantity: i32, amount: Decimal) -> DispenseCommand {
    DispenseCommand {
        prescription_id,
        quantity,
        payment_method: PaymentMethod::Cash,
        amount_paid: amount,
        amount_covered_by_insurance: None,
        patient_paid_amount: None,
        insurance_policy_number: None,
    }
}

async fn payment_count(app: &TestApp) -> u64 {
    payment_transaction::Entity::find()
        .count(app.db())
        .await
        .unwrap()
}

#[tokio::test]
async fn dispensing_draws_stock_and_records_one_history_row() {
    let app = TestApp::new().await;
    let item = app
        .seed_stock_item("Amoxicillin 500mg", dec!(100), dec!(20), None)
        .await;
    let med = app.seed_medication("Amoxicillin 500mg", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 50, 0).await;

    let result = app
        .state
        .services
        .dispensing
        .dispense(cash(rx.id, 30, dec!(60)), app.actor)
        .await
        .unwrap();

    assert_eq!(result.prescription_status, PrescriptionStatus::PartiallyDispensed);
    assert_eq!(result.new_stock_level, dec!(70));
    assert_eq!(result.remaining_quantity, 20);
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(70));
    assert_eq!(app.history_count(item.id).await, 2);

    let last = inventory_history::Entity::find()
        .filter(inventory_history::Column::StockItemId.eq(item.id))
        .order_by_desc(inventory_history::Column::Id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.transaction_type, TransactionType::Out);
    assert_eq!(last.quantity_change, dec!(-30));
    assert_eq!(last.new_stock_level, dec!(70));
    assert_eq!(last.reason, format!("Dispensed for Prescription {}", rx.id));
    assert_eq!(last.processed_by, app.actor);

    let stored = app.prescription(rx.id).await;
    assert_eq!(stored.quantity_dispensed, 30);
    assert_eq!(stored.status, PrescriptionStatus::PartiallyDispensed);
    assert_eq!(stored.dispensed_by, Some(app.actor));
    assert!(stored.dispensed_date.is_some());

    let payment = payment_transaction::Entity::find_by_id(result.payment_transaction_id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.patient_paid_amount, dec!(60));
    assert_eq!(payment.amount_covered_by_insurance, Decimal::ZERO);
    assert_eq!(payment.prescription_id, Some(rx.id));
}

#[tokio::test]
async fn dispensing_the_remainder_completes_the_prescription() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Paracetamol 500mg", dec!(40), dec!(5), None).await;
    let med = app.seed_medication("Paracetamol 500mg", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 20, 12).await;

    let result = app
        .state
        .services
        .dispensing
        .dispense(cash(rx.id, 8, dec!(16)), app.actor)
        .await
        .unwrap();

    assert_eq!(result.prescription_status, PrescriptionStatus::Completed);
    assert_eq!(result.quantity_dispensed, 20);
    assert_eq!(result.remaining_quantity, 0);
    assert_eq!(app.prescription(rx.id).await.status, PrescriptionStatus::Completed);
}

#[tokio::test]
async fn insufficient_stock_leaves_everything_untouched() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Ceftriaxone 1g", dec!(10), dec!(5), None).await;
    let med = app.seed_medication("Ceftriaxone 1g", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 50, 0).await;

    let err = app
        .state
        .services
        .dispensing
        .dispense(cash(rx.id, 15, dec!(30)), app.actor)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(ref msg) if msg.contains("Current stock: 10"));
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(10));
    assert_eq!(app.history_count(item.id).await, 1);
    assert_eq!(app.prescription(rx.id).await.quantity_dispensed, 0);
    assert_eq!(payment_count(&app).await, 0);
}

#[tokio::test]
async fn orphaned_prescription_is_an_internal_error_and_rolls_back() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Furosemide 40mg", dec!(30), dec!(5), None).await;
    let med = app.seed_medication("Furosemide 40mg", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 10, 0).await;

    // Break the visit link behind the schema's back.
    app.db()
        .execute_unprepared("PRAGMA foreign_keys = OFF")
        .await
        .unwrap();
    patient_visit::Entity::delete_by_id(rx.patient_visit_id)
        .exec(app.db())
        .await
        .unwrap();

    let err = app
        .state
        .services
        .dispensing
        .dispense(cash(rx.id, 4, dec!(8)), app.actor)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InternalError(ref msg) if msg.contains("missing patient visit"));
    assert_eq!(err.response_message(), "Internal server error");
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(30));
    assert_eq!(app.history_count(item.id).await, 1);
    assert_eq!(app.prescription(rx.id).await.quantity_dispensed, 0);
    assert_eq!(payment_count(&app).await, 0);
}

#[tokio::test]
async fn completed_prescriptions_cannot_be_dispensed() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Metformin 850mg", dec!(100), dec!(10), None).await;
    let med = app.seed_medication("Metformin 850mg", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 50, 50).await;

    let err = app
        .state
        .services
        .dispensing
        .dispense(cash(rx.id, 1, dec!(2)), app.actor)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidState(ref msg) if msg.contains("already Completed"));
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(100));
}

#[tokio::test]
async fn mismatched_insurance_split_is_rejected_without_mutation() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Insulin Glargine", dec!(25), dec!(5), None).await;
    let med = app.seed_medication("Insulin Glargine", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 10, 0).await;

    let command = DispenseCommand {
        prescription_id: rx.id,
        quantity: 5,
        payment_method: PaymentMethod::Insurance,
        amount_paid: dec!(150),
        amount_covered_by_insurance: Some(dec!(100)),
        patient_paid_amount: Some(dec!(40)),
        insurance_policy_number: Some("NHIF-001".into()),
    };
    let err = app
        .state
        .services
        .dispensing
        .dispense(command, app.actor)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::ValidationError(_));
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(25));
    assert_eq!(app.history_count(item.id).await, 1);
    assert_eq!(app.prescription(rx.id).await.quantity_dispensed, 0);
    assert_eq!(payment_count(&app).await, 0);
}

#[tokio::test]
async fn insurance_split_is_persisted() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Salbutamol Inhaler", dec!(12), dec!(2), None).await;
    let med = app.seed_medication("Salbutamol Inhaler", Some(item.id)).await;
    let rx = app.seed_prescription(med.id, 2, 0).await;

    let result = app
        .state
        .services
        .dispensing
        .dispense(
            DispenseCommand {
                prescription_id: rx.id,
                quantity: 2,
                payment_method: PaymentMethod::Insurance,
                amount_paid: dec!(150),
                amount_covered_by_insurance: Some(dec!(100)),
                patient_paid_amount: Some(dec!(50)),
                insurance_policy_number: Some("NHIF-002".into()),
            },
            app.actor,
        )
        .await
        .unwrap();

    let payment = payment_transaction::Entity::find_by_id(result.payment_transaction_id)
        .one(app.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.payment_method, PaymentMethod::Insurance);
    assert_eq!(
        payment.amount_covered_by_insurance + payment.patient_paid_amount,
        payment.amount
    );
    assert_eq!(payment.insurance_policy_number.as_deref(), Some("NHIF-002"));
}

#[tokio::test]
async fn preconditions_fail_in_order() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Ibuprofen 400mg", dec!(5), dec!(1), None).await;
    let med = app.seed_medication("Ibuprofen 400mg", Some(item.id)).await;
    let closed = app.seed_prescription(med.id, 10, 10).await;
    let open = app.seed_prescription(med.id, 10, 4).await;
    let dispensing = &app.state.services.dispensing;

    let missing = dispensing
        .dispense(cash(9_999, 1, dec!(1)), app.actor)
        .await
        .unwrap_err();
    assert_matches!(missing, ServiceError::NotFound(_));

    // Zero quantity is reported before the closed status.
    let zero = dispensing
        .dispense(cash(closed.id, 0, dec!(1)), app.actor)
        .await
        .unwrap_err();
    assert_matches!(zero, ServiceError::ValidationError(_));

    let over = dispensing
        .dispense(cash(open.id, 7, dec!(1)), app.actor)
        .await
        .unwrap_err();
    assert_matches!(
        over,
        ServiceError::ValidationError(ref msg) if msg.contains("exceeds remaining prescribed quantity (6)")
    );

    // Stock is checked before the payment amount.
    let short = dispensing
        .dispense(cash(open.id, 6, Decimal::ZERO), app.actor)
        .await
        .unwrap_err();
    assert_matches!(short, ServiceError::InsufficientStock(_));

    let unpaid = dispensing
        .dispense(cash(open.id, 5, Decimal::ZERO), app.actor)
        .await
        .unwrap_err();
    assert_matches!(unpaid, ServiceError::ValidationError(ref msg) if msg.contains("greater than zero"));
}

#[tokio::test]
async fn unlinked_medication_resolves_stock_by_exact_name() {
    let app = TestApp::new().await;
    let item = app.seed_stock_item("Azithromycin 250mg", dec!(30), dec!(5), None).await;
    let med = app.seed_medication("Azithromycin 250mg", None).await;
    let rx = app.seed_prescription(med.id, 6, 0).await;

    let result = app
        .state
        .services
        .dispensing
        .dispense(cash(rx.id, 6, dec!(12)), app.actor)
        .await
        .unwrap();
    assert_eq!(result.stock_item_id, item.id);
    assert_eq!(app.stock_item(item.id).await.current_stock, dec!(24));
}

#[tokio::test]
async fn medication_without_stock_is_not_found() {
    let app = TestApp::new().await;
    let med = app.seed_medication("Oseltamivir 75mg", None).await;
    let rx = app.seed_prescription(med.id, 10, 0).await;

    let err = app
        .state
        .services
        .dispensing
        .dispense(cash(rx.id, 1, dec!(3)), app.actor)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::NotFound(ref msg) if msg.contains("'Oseltamivir 75mg' is not found in stock")
    );
}
