use crate::{
    db::DbPool,
    entities::{
        inventory_history, medication, patient, payment_transaction, prescription, stock_item,
        PaymentMethod, StockUnit, TransactionType,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const DELETED_ITEM: &str = "Deleted item";
const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UsageReportRow {
    /// `None` for the bucket of items deleted since they were dispensed
    pub stock_item_id: Option<i32>,
    pub medication_name: String,
    pub unit: Option<StockUnit>,
    pub total_dispensed_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExpiringItemRow {
    #[serde(flatten)]
    pub stock_item: stock_item::Model,
    pub days_until_expiry: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct InsuranceReportRow {
    pub payment_transaction_id: i32,
    pub transaction_date: DateTime<Utc>,
    pub patient_id: i32,
    pub patient_name: Option<String>,
    pub prescription_id: Option<i32>,
    pub medication_name: Option<String>,
    pub quantity_dispensed: Option<i32>,
    pub amount_billed: Decimal,
    pub amount_covered_by_insurance: Decimal,
    pub patient_paid_amount: Decimal,
    pub insurance_policy_number: Option<String>,
    pub processed_by: Uuid,
}

/// Half-open UTC range covering every instant of `[start, end]` by date.
pub fn day_range(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    if start > end {
        return Err(ServiceError::ValidationError(format!(
            "Start date ({}) must not be after end date ({})",
            start, end
        )));
    }
    let next = end.succ_opt().ok_or_else(|| {
        ServiceError::ValidationError(format!("End date ({}) is out of range", end))
    })?;
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let until = next.and_time(NaiveTime::MIN).and_utc();
    Ok((from, until))
}

/// Last expiry date inside a window of `months` 30-day months from `today`.
/// Negative windows clamp to today.
pub fn expiry_cutoff(today: NaiveDate, months: i64) -> Result<NaiveDate, ServiceError> {
    months
        .max(0)
        .checked_mul(DAYS_PER_MONTH)
        .and_then(|days| u64::try_from(days).ok())
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "A window of {} months reaches past the latest supported date",
                months
            ))
        })
}

/// Sums `Out` rows per stock item into positive dispensed totals.
///
/// Rows whose item no longer exists fold into one "Deleted item" bucket.
/// Output is ordered by name.
pub fn aggregate_usage(
    rows: &[inventory_history::Model],
    items: &HashMap<i32, stock_item::Model>,
) -> Vec<UsageReportRow> {
    let mut totals: BTreeMap<Option<i32>, Decimal> = BTreeMap::new();
    for row in rows {
        let key = row.stock_item_id.filter(|id| items.contains_key(id));
        *totals.entry(key).or_default() += -row.quantity_change;
    }

    let mut report: Vec<UsageReportRow> = totals
        .into_iter()
        .map(|(key, total)| {
            let item = key.and_then(|id| items.get(&id));
            UsageReportRow {
                stock_item_id: key,
                medication_name: item
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| DELETED_ITEM.to_string()),
                unit: item.map(|i| i.unit),
                total_dispensed_quantity: total,
            }
        })
        .collect();
    report.sort_by(|a, b| {
        a.medication_name
            .cmp(&b.medication_name)
            .then(a.stock_item_id.cmp(&b.stock_item_id))
    });
    report
}

fn lower_like(col: impl sea_orm::sea_query::IntoColumnRef, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(format!("%{}%", needle.to_lowercase()))
}

#[derive(Clone)]
pub struct ReportsService {
    db: Arc<DbPool>,
    expiring_default_months: i64,
}

impl ReportsService {
    pub fn new(db: Arc<DbPool>, expiring_default_months: i64) -> Self {
        Self {
            db,
            expiring_default_months,
        }
    }

    #[instrument(skip(self))]
    pub async fn stock_levels(
        &self,
        min_stock: Option<Decimal>,
        max_stock: Option<Decimal>,
        name_contains: Option<String>,
    ) -> Result<Vec<stock_item::Model>, ServiceError> {
        let mut query = stock_item::Entity::find();
        if let Some(min) = min_stock {
            query = query.filter(stock_item::Column::CurrentStock.gte(min));
        }
        if let Some(max) = max_stock {
            query = query.filter(stock_item::Column::CurrentStock.lte(max));
        }
        if let Some(name) = name_contains.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            query = query.filter(lower_like(stock_item::Column::Name, name));
        }

        let items = query
            .order_by_asc(stock_item::Column::Name)
            .order_by_asc(stock_item::Column::Id)
            .all(self.db.as_ref())
            .await?;
        debug!(count = items.len(), "Stock level report built");
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn medication_usage(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<UsageReportRow>, ServiceError> {
        let (from, until) = day_range(start, end)?;

        let rows = inventory_history::Entity::find()
            .filter(inventory_history::Column::TransactionType.eq(TransactionType::Out))
            .filter(inventory_history::Column::Timestamp.gte(from))
            .filter(inventory_history::Column::Timestamp.lt(until))
            .all(self.db.as_ref())
            .await?;

        let ids: HashSet<i32> = rows.iter().filter_map(|r| r.stock_item_id).collect();
        let items: HashMap<i32, stock_item::Model> = if ids.is_empty() {
            HashMap::new()
        } else {
            stock_item::Entity::find()
                .filter(stock_item::Column::Id.is_in(ids))
                .all(self.db.as_ref())
                .await?
                .into_iter()
                .map(|item| (item.id, item))
                .collect()
        };

        let report = aggregate_usage(&rows, &items);
        debug!(%start, %end, rows = rows.len(), groups = report.len(), "Usage report built");
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn expiring_medications(
        &self,
        months_ahead: Option<i64>,
        min_stock: Option<Decimal>,
    ) -> Result<Vec<ExpiringItemRow>, ServiceError> {
        let today = Utc::now().date_naive();
        let months = months_ahead.unwrap_or(self.expiring_default_months);
        let cutoff = expiry_cutoff(today, months)?;

        let mut query = stock_item::Entity::find()
            .filter(stock_item::Column::ExpiryDate.is_not_null())
            .filter(stock_item::Column::ExpiryDate.lte(cutoff));
        if let Some(min) = min_stock {
            query = query.filter(stock_item::Column::CurrentStock.gt(min));
        }

        let rows: Vec<ExpiringItemRow> = query
            .order_by_asc(stock_item::Column::ExpiryDate)
            .order_by_asc(stock_item::Column::Id)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .filter_map(|item| {
                let expiry = item.expiry_date?;
                Some(ExpiringItemRow {
                    days_until_expiry: (expiry - today).num_days(),
                    stock_item: item,
                })
            })
            .collect();
        debug!(%cutoff, count = rows.len(), "Expiring medications report built");
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn insurance_dispensing(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        patient_id: Option<i32>,
        policy_number: Option<String>,
    ) -> Result<Vec<InsuranceReportRow>, ServiceError> {
        let (from, until) = day_range(start, end)?;

        let mut query = payment_transaction::Entity::find()
            .filter(payment_transaction::Column::PaymentMethod.eq(PaymentMethod::Insurance))
            .filter(payment_transaction::Column::TransactionDate.gte(from))
            .filter(payment_transaction::Column::TransactionDate.lt(until));
        if let Some(patient_id) = patient_id {
            query = query.filter(payment_transaction::Column::PatientId.eq(patient_id));
        }
        if let Some(policy) = policy_number.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            query = query.filter(lower_like(
                payment_transaction::Column::InsurancePolicyNumber,
                policy,
            ));
        }
        let payments = query
            .order_by_desc(payment_transaction::Column::TransactionDate)
            .order_by_desc(payment_transaction::Column::Id)
            .all(self.db.as_ref())
            .await?;
        if payments.is_empty() {
            return Ok(Vec::new());
        }

        let patient_ids: HashSet<i32> = payments.iter().map(|p| p.patient_id).collect();
        let patients: HashMap<i32, patient::Model> = patient::Entity::find()
            .filter(patient::Column::Id.is_in(patient_ids))
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let rx_ids: HashSet<i32> = payments.iter().filter_map(|p| p.prescription_id).collect();
        let prescriptions: HashMap<i32, prescription::Model> = if rx_ids.is_empty() {
            HashMap::new()
        } else {
            prescription::Entity::find()
                .filter(prescription::Column::Id.is_in(rx_ids))
                .all(self.db.as_ref())
                .await?
                .into_iter()
                .map(|rx| (rx.id, rx))
                .collect()
        };

        let medication_ids: HashSet<i32> =
            prescriptions.values().map(|rx| rx.medication_id).collect();
        let medications: HashMap<i32, medication::Model> = if medication_ids.is_empty() {
            HashMap::new()
        } else {
            medication::Entity::find()
                .filter(medication::Column::Id.is_in(medication_ids))
                .all(self.db.as_ref())
                .await?
                .into_iter()
                .map(|m| (m.id, m))
                .collect()
        };

        let rows: Vec<InsuranceReportRow> = payments
            .into_iter()
            .map(|payment| {
                let rx = payment.prescription_id.and_then(|id| prescriptions.get(&id));
                InsuranceReportRow {
                    payment_transaction_id: payment.id,
                    transaction_date: payment.transaction_date,
                    patient_id: payment.patient_id,
                    patient_name: patients.get(&payment.patient_id).map(|p| p.full_name()),
                    prescription_id: payment.prescription_id,
                    medication_name: rx
                        .and_then(|rx| medications.get(&rx.medication_id))
                        .map(|m| m.name.clone()),
                    quantity_dispensed: rx.map(|rx| rx.quantity_dispensed),
                    amount_billed: payment.amount,
                    amount_covered_by_insurance: payment.amount_covered_by_insurance,
                    patient_paid_amount: payment.patient_paid_amount,
                    insurance_policy_number: payment.insurance_policy_number,
                    processed_by: payment.processed_by,
                }
            })
            .collect();
        debug!(%start, %end, count = rows.len(), "Insurance dispensing report built");
        Ok(rows)
    }
}
