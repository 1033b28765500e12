/*!
 * # Dispensing workflow
 *
 * Dispensing a prescription draws stock through the ledger, advances the
 * prescription and records the payment, all in one transaction. Preconditions
 * are checked in a fixed order and the first failure is reported.
 */

use crate::{
    db::{self, for_update, DbPool, TxPolicy, UnitOfWork},
    entities::{
        medication, patient_visit, payment_transaction, prescription, stock_item, PaymentMethod,
        PrescriptionStatus, TransactionType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::stock_ledger::apply_delta,
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, NotSet, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispenseCommand {
    pub prescription_id: i32,
    pub quantity: i32,
    pub payment_method: PaymentMethod,
    pub amount_paid: Decimal,
    /// Insurance payments only
    pub amount_covered_by_insurance: Option<Decimal>,
    /// Insurance payments only
    pub patient_paid_amount: Option<Decimal>,
    pub insurance_policy_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispenseResult {
    pub detail: String,
    pub prescription_id: i32,
    pub prescription_status: PrescriptionStatus,
    pub quantity_dispensed: i32,
    pub remaining_quantity: i32,
    pub stock_item_id: i32,
    pub new_stock_level: Decimal,
    pub payment_transaction_id: i32,
}

/// How a payment divides between insurer and patient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentBreakdown {
    pub amount: Decimal,
    pub amount_covered_by_insurance: Decimal,
    pub patient_paid_amount: Decimal,
    pub insurance_policy_number: Option<String>,
}

/// Validates a payment and normalizes its split.
///
/// Insurance payments must split exactly into non-negative parts. Every other
/// method is paid in full by the patient.
pub fn normalize_payment(
    method: PaymentMethod,
    amount_paid: Decimal,
    covered: Option<Decimal>,
    patient_paid: Option<Decimal>,
    policy_number: Option<&str>,
) -> Result<PaymentBreakdown, ServiceError> {
    if amount_paid <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Amount paid must be greater than zero.".to_string(),
        ));
    }

    if method != PaymentMethod::Insurance {
        return Ok(PaymentBreakdown {
            amount: amount_paid,
            amount_covered_by_insurance: Decimal::ZERO,
            patient_paid_amount: amount_paid,
            insurance_policy_number: None,
        });
    }

    let covered = covered.unwrap_or(Decimal::ZERO);
    let patient_paid = patient_paid.unwrap_or(Decimal::ZERO);
    if covered < Decimal::ZERO || patient_paid < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Insurance and patient amounts must not be negative.".to_string(),
        ));
    }
    if covered + patient_paid != amount_paid {
        return Err(ServiceError::ValidationError(format!(
            "Insurance covered amount ({}) plus patient paid amount ({}) must equal the amount paid ({}).",
            covered, patient_paid, amount_paid
        )));
    }

    Ok(PaymentBreakdown {
        amount: amount_paid,
        amount_covered_by_insurance: covered,
        patient_paid_amount: patient_paid,
        insurance_policy_number: policy_number
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
    })
}

/// The stock item a medication draws from: its linked item when set,
/// otherwise the lowest-id active item carrying exactly its name.
async fn resolve_stock_item<C: ConnectionTrait>(
    conn: &C,
    medication: &medication::Model,
) -> Result<Option<i32>, ServiceError> {
    if let Some(linked) = medication.stock_item_id {
        return Ok(Some(linked));
    }

    Ok(stock_item::Entity::find()
        .filter(stock_item::Column::Name.eq(medication.name.as_str()))
        .filter(stock_item::Column::IsActive.eq(true))
        .order_by_asc(stock_item::Column::Id)
        .one(conn)
        .await?
        .map(|item| item.id))
}

struct Dispense {
    command: DispenseCommand,
    actor: Uuid,
}

#[async_trait]
impl UnitOfWork for Dispense {
    type Output = DispenseResult;

    fn name(&self) -> &'static str {
        "dispense"
    }

    async fn run(&self, txn: &DatabaseTransaction) -> Result<DispenseResult, ServiceError> {
        let cmd = &self.command;
        let backend = txn.get_database_backend();
        let quantity = cmd.quantity;

        let rx = for_update(prescription::Entity::find_by_id(cmd.prescription_id), backend)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Prescription {} not found", cmd.prescription_id))
            })?;

        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity to dispense must be greater than zero.".to_string(),
            ));
        }

        if rx.status.is_closed() {
            return Err(ServiceError::InvalidState(format!(
                "Prescription is already {} and cannot be dispensed.",
                rx.status
            )));
        }

        let remaining = rx.remaining_quantity();
        if quantity > remaining {
            return Err(ServiceError::ValidationError(format!(
                "Quantity to dispense ({}) exceeds remaining prescribed quantity ({}).",
                quantity, remaining
            )));
        }

        let medication = medication::Entity::find_by_id(rx.medication_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Medication {} not found", rx.medication_id))
            })?;
        let not_in_stock = || {
            ServiceError::NotFound(format!(
                "Medication '{}' is not found in stock.",
                medication.name
            ))
        };
        let stock_item_id = resolve_stock_item(txn, &medication)
            .await?
            .ok_or_else(not_in_stock)?;
        let item = for_update(stock_item::Entity::find_by_id(stock_item_id), backend)
            .one(txn)
            .await?
            .ok_or_else(not_in_stock)?;

        let requested = Decimal::from(quantity);
        if item.current_stock < requested {
            return Err(ServiceError::InsufficientStock(format!(
                "Insufficient stock for {}. Current stock: {}",
                item.name,
                item.current_stock.normalize()
            )));
        }

        let payment = normalize_payment(
            cmd.payment_method,
            cmd.amount_paid,
            cmd.amount_covered_by_insurance,
            cmd.patient_paid_amount,
            cmd.insurance_policy_number.as_deref(),
        )?;

        let visit = patient_visit::Entity::find_by_id(rx.patient_visit_id)
            .one(txn)
            .await?
            // The foreign key cascades visit deletes onto prescriptions.
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Prescription {} references missing patient visit {}",
                    rx.id, rx.patient_visit_id
                ))
            })?;

        let ledger = apply_delta(
            txn,
            item.id,
            -requested,
            Some(TransactionType::Out),
            format!("Dispensed for Prescription {}", rx.id),
            self.actor,
        )
        .await?;

        let dispensed = rx.quantity_dispensed + quantity;
        let status = if dispensed == rx.quantity_prescribed {
            PrescriptionStatus::Completed
        } else {
            PrescriptionStatus::PartiallyDispensed
        };
        let now = Utc::now();

        let updated = prescription::Entity::update_many()
            .col_expr(prescription::Column::QuantityDispensed, Expr::value(dispensed))
            .col_expr(prescription::Column::Status, Expr::value(status))
            .col_expr(prescription::Column::DispensedBy, Expr::value(Some(self.actor)))
            .col_expr(prescription::Column::DispensedDate, Expr::value(Some(now)))
            .col_expr(prescription::Column::UpdatedAt, Expr::value(now))
            .filter(prescription::Column::Id.eq(rx.id))
            .filter(prescription::Column::QuantityDispensed.eq(rx.quantity_dispensed))
            .exec(txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(format!(
                "Prescription {} was modified concurrently",
                rx.id
            )));
        }

        let transaction = payment_transaction::ActiveModel {
            id: NotSet,
            patient_id: Set(visit.patient_id),
            prescription_id: Set(Some(rx.id)),
            amount: Set(payment.amount),
            payment_method: Set(cmd.payment_method),
            amount_covered_by_insurance: Set(payment.amount_covered_by_insurance),
            patient_paid_amount: Set(payment.patient_paid_amount),
            insurance_policy_number: Set(payment.insurance_policy_number),
            processed_by: Set(self.actor),
            transaction_date: Set(now),
        }
        .insert(txn)
        .await?;

        Ok(DispenseResult {
            detail: format!(
                "Successfully dispensed {} of {}.",
                quantity, medication.name
            ),
            prescription_id: rx.id,
            prescription_status: status,
            quantity_dispensed: dispensed,
            remaining_quantity: rx.quantity_prescribed - dispensed,
            stock_item_id: item.id,
            new_stock_level: ledger.stock_item.current_stock,
            payment_transaction_id: transaction.id,
        })
    }
}

#[derive(Clone)]
pub struct DispensingService {
    db: Arc<DbPool>,
    tx_policy: TxPolicy,
    event_sender: EventSender,
}

impl DispensingService {
    pub fn new(db: Arc<DbPool>, tx_policy: TxPolicy, event_sender: EventSender) -> Self {
        Self {
            db,
            tx_policy,
            event_sender,
        }
    }

    #[instrument(
        skip(self, command),
        fields(prescription_id = command.prescription_id, quantity = command.quantity)
    )]
    pub async fn dispense(
        &self,
        command: DispenseCommand,
        actor: Uuid,
    ) -> Result<DispenseResult, ServiceError> {
        let work = Dispense { command, actor };
        let result = db::execute(self.db.as_ref(), &self.tx_policy, &work).await?;

        counter!("healthlink_dispensing.completed", 1, "status" => result.prescription_status.to_string());
        info!(
            prescription_id = result.prescription_id,
            status = %result.prescription_status,
            new_stock_level = %result.new_stock_level,
            payment_transaction_id = result.payment_transaction_id,
            "Medication dispensed"
        );

        self.event_sender
            .publish(Event::MedicationDispensed {
                prescription_id: result.prescription_id,
                stock_item_id: result.stock_item_id,
                quantity: work.command.quantity,
                status: result.prescription_status,
                payment_transaction_id: result.payment_transaction_id,
            })
            .await;
        Ok(result)
    }
}
