/*!
 * # Stock ledger
 *
 * The ledger is the only writer of `stock_items.current_stock`. Every change
 * goes through [`apply_delta`] inside the caller's transaction, which
 *
 * - reads the item under a row lock where the backend has one,
 * - rejects changes that would take stock below zero,
 * - writes the new level guarded by the item's `version`, and
 * - appends exactly one inventory history row.
 *
 * A version-guard miss surfaces as `ConcurrentModification`, which the
 * transaction runner treats as retryable.
 */

use super::{validate_non_negative_decimal, validate_positive_decimal};
use crate::{
    db::{self, for_update, DbPool, TxPolicy, UnitOfWork},
    entities::{inventory_history, stock_item, supplier, supplier_stock_item, StockUnit, TransactionType},
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit_trail::{record_stock_entry, StockEntry},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr,
    EntityTrait, NotSet, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A committed stock change: the item after the change and its history row
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerEntry {
    pub stock_item: stock_item::Model,
    pub history_entry: inventory_history::Model,
}

impl LedgerEntry {
    pub(crate) fn to_event(&self) -> Event {
        Event::StockAdjusted {
            stock_item_id: self.stock_item.id,
            transaction_type: self.history_entry.transaction_type,
            quantity_change: self.history_entry.quantity_change,
            new_stock_level: self.stock_item.current_stock,
            below_reorder_level: self.stock_item.current_stock < self.stock_item.reorder_level,
        }
    }
}

/// Resolves the history transaction type for a signed delta.
///
/// Without an explicit type the sign decides. An explicit `In` or `Out` must
/// agree with the sign; `Adjustment` accepts any delta.
pub fn classify(
    delta: Decimal,
    requested: Option<TransactionType>,
) -> Result<TransactionType, ServiceError> {
    match requested {
        None if delta > Decimal::ZERO => Ok(TransactionType::In),
        None if delta < Decimal::ZERO => Ok(TransactionType::Out),
        None => Ok(TransactionType::Adjustment),
        Some(TransactionType::In) if delta <= Decimal::ZERO => Err(ServiceError::ValidationError(
            "Stock in requires a positive quantity change".to_string(),
        )),
        Some(TransactionType::Out) if delta >= Decimal::ZERO => Err(
            ServiceError::ValidationError("Stock out requires a negative quantity change".to_string()),
        ),
        Some(requested) => Ok(requested),
    }
}

/// Applies a signed stock change inside an open transaction.
#[instrument(skip(conn, reason))]
pub async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    stock_item_id: i32,
    delta: Decimal,
    requested: Option<TransactionType>,
    reason: String,
    actor: Uuid,
) -> Result<LedgerEntry, ServiceError> {
    let transaction_type = classify(delta, requested)?;

    let item = for_update(
        stock_item::Entity::find_by_id(stock_item_id),
        conn.get_database_backend(),
    )
    .one(conn)
    .await?
    .ok_or_else(|| ServiceError::NotFound(format!("Stock item {} not found", stock_item_id)))?;

    let new_level = item.current_stock + delta;
    if new_level < Decimal::ZERO {
        return Err(ServiceError::InsufficientStock(format!(
            "Insufficient stock for {}. Current stock: {}",
            item.name,
            item.current_stock.normalize()
        )));
    }

    let now = Utc::now();
    let result = stock_item::Entity::update_many()
        .col_expr(stock_item::Column::CurrentStock, Expr::value(new_level))
        .col_expr(stock_item::Column::Version, Expr::value(item.version + 1))
        .col_expr(stock_item::Column::UpdatedAt, Expr::value(now))
        .col_expr(stock_item::Column::UpdatedBy, Expr::value(Some(actor)))
        .filter(stock_item::Column::Id.eq(item.id))
        .filter(stock_item::Column::Version.eq(item.version))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(format!(
            "Stock item {} was modified concurrently",
            item.id
        )));
    }

    let history_entry = record_stock_entry(
        conn,
        StockEntry {
            stock_item_id: Some(item.id),
            transaction_type,
            quantity_change: delta,
            new_stock_level: new_level,
            reason,
            processed_by: actor,
        },
    )
    .await?;

    counter!("healthlink_ledger.deltas", 1, "type" => transaction_type.to_string());

    Ok(LedgerEntry {
        stock_item: stock_item::Model {
            current_stock: new_level,
            version: item.version + 1,
            updated_at: now,
            updated_by: Some(actor),
            ..item
        },
        history_entry,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterStockItemCommand {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub unit: StockUnit,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_decimal")]
    pub initial_stock: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_non_negative_decimal")]
    pub reorder_level: Decimal,
    #[validate(custom = "validate_non_negative_decimal")]
    pub purchase_price: Option<Decimal>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub sale_price: Option<Decimal>,
    /// Negotiated price from `supplier_id`; requires a supplier
    #[validate(custom = "validate_positive_decimal")]
    pub supplied_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_id: Option<i32>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustStockCommand {
    /// Signed change; positive adds stock
    pub quantity_change: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub transaction_type: Option<TransactionType>,
}

/// Metadata patch; stock levels are never changed here
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStockItemCommand {
    pub description: Option<String>,
    pub unit: Option<StockUnit>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub purchase_price: Option<Decimal>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub sale_price: Option<Decimal>,
    #[validate(custom = "validate_non_negative_decimal")]
    pub reorder_level: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateStockItemCommand {
    fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("description", self.description.is_some()),
            ("unit", self.unit.is_some()),
            ("purchase_price", self.purchase_price.is_some()),
            ("sale_price", self.sale_price.is_some()),
            ("reorder_level", self.reorder_level.is_some()),
            ("expiry_date", self.expiry_date.is_some()),
            ("location", self.location.is_some()),
            ("is_active", self.is_active.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect()
    }
}

/// Outcome of a hard delete
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RemovedStockItem {
    pub stock_item_id: i32,
    pub name: String,
    pub history_entry: inventory_history::Model,
}

struct RegisterItem {
    command: RegisterStockItemCommand,
    actor: Uuid,
}

#[async_trait]
impl UnitOfWork for RegisterItem {
    type Output = LedgerEntry;

    fn name(&self) -> &'static str {
        "register_stock_item"
    }

    async fn run(&self, txn: &DatabaseTransaction) -> Result<LedgerEntry, ServiceError> {
        let cmd = &self.command;
        let name = cmd.name.trim().to_string();

        if let Some(supplier_id) = cmd.supplier_id {
            supplier::Entity::find_by_id(supplier_id)
                .one(txn)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", supplier_id)))?;
        }

        let duplicate = stock_item::Entity::find().filter(stock_item::Column::Name.eq(name.as_str()));
        let duplicate = match cmd.supplier_id {
            Some(supplier_id) => duplicate.filter(stock_item::Column::SupplierId.eq(supplier_id)),
            None => duplicate.filter(stock_item::Column::SupplierId.is_null()),
        };
        if duplicate.one(txn).await?.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Stock item '{}' already exists for this supplier",
                name
            )));
        }

        let now = Utc::now();
        let item = stock_item::ActiveModel {
            id: NotSet,
            name: Set(name),
            description: Set(cmd.description.clone()),
            current_stock: Set(cmd.initial_stock),
            unit: Set(cmd.unit),
            purchase_price: Set(cmd.purchase_price),
            sale_price: Set(cmd.sale_price),
            reorder_level: Set(cmd.reorder_level),
            expiry_date: Set(cmd.expiry_date),
            supplier_id: Set(cmd.supplier_id),
            location: Set(cmd.location.clone()),
            is_active: Set(true),
            version: Set(1),
            created_by: Set(Some(self.actor)),
            updated_by: Set(Some(self.actor)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        if let (Some(supplier_id), Some(price)) = (cmd.supplier_id, cmd.supplied_price) {
            supplier_stock_item::ActiveModel {
                id: NotSet,
                supplier_id: Set(supplier_id),
                stock_item_id: Set(item.id),
                supplied_price: Set(price),
                last_supplied_date: Set(None),
            }
            .insert(txn)
            .await?;
        }

        let (transaction_type, reason) = if cmd.initial_stock > Decimal::ZERO {
            (TransactionType::In, "Initial stock on registration")
        } else {
            (TransactionType::Adjustment, "Registered with no initial stock")
        };

        let history_entry = record_stock_entry(
            txn,
            StockEntry {
                stock_item_id: Some(item.id),
                transaction_type,
                quantity_change: cmd.initial_stock,
                new_stock_level: item.current_stock,
                reason: reason.to_string(),
                processed_by: self.actor,
            },
        )
        .await?;

        Ok(LedgerEntry {
            stock_item: item,
            history_entry,
        })
    }
}

struct AdjustStock {
    stock_item_id: i32,
    command: AdjustStockCommand,
    actor: Uuid,
}

#[async_trait]
impl UnitOfWork for AdjustStock {
    type Output = LedgerEntry;

    fn name(&self) -> &'static str {
        "adjust_stock"
    }

    async fn run(&self, txn: &DatabaseTransaction) -> Result<LedgerEntry, ServiceError> {
        apply_delta(
            txn,
            self.stock_item_id,
            self.command.quantity_change,
            self.command.transaction_type,
            self.command.reason.clone(),
            self.actor,
        )
        .await
    }
}

struct UpdateDetails {
    stock_item_id: i32,
    command: UpdateStockItemCommand,
    actor: Uuid,
}

#[async_trait]
impl UnitOfWork for UpdateDetails {
    type Output = stock_item::Model;

    fn name(&self) -> &'static str {
        "update_stock_item"
    }

    async fn run(&self, txn: &DatabaseTransaction) -> Result<stock_item::Model, ServiceError> {
        let cmd = &self.command;
        let item = for_update(
            stock_item::Entity::find_by_id(self.stock_item_id),
            txn.get_database_backend(),
        )
        .one(txn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Stock item {} not found", self.stock_item_id))
        })?;

        let version = item.version;
        let mut active: stock_item::ActiveModel = item.into();
        if let Some(description) = &cmd.description {
            active.description = Set(Some(description.clone()));
        }
        if let Some(unit) = cmd.unit {
            active.unit = Set(unit);
        }
        if let Some(price) = cmd.purchase_price {
            active.purchase_price = Set(Some(price));
        }
        if let Some(price) = cmd.sale_price {
            active.sale_price = Set(Some(price));
        }
        if let Some(level) = cmd.reorder_level {
            active.reorder_level = Set(level);
        }
        if let Some(date) = cmd.expiry_date {
            active.expiry_date = Set(Some(date));
        }
        if let Some(location) = &cmd.location {
            active.location = Set(Some(location.clone()));
        }
        if let Some(is_active) = cmd.is_active {
            active.is_active = Set(is_active);
        }
        active.version = Set(version + 1);
        active.updated_by = Set(Some(self.actor));
        active.updated_at = Set(Utc::now());

        let updated = stock_item::Entity::update(active)
            .filter(stock_item::Column::Version.eq(version))
            .exec(txn)
            .await
            .map_err(|err| match err {
                DbErr::RecordNotUpdated => ServiceError::ConcurrentModification(format!(
                    "Stock item {} was modified concurrently",
                    self.stock_item_id
                )),
                other => ServiceError::DatabaseError(other),
            })?;

        record_stock_entry(
            txn,
            StockEntry {
                stock_item_id: Some(updated.id),
                transaction_type: TransactionType::Adjustment,
                quantity_change: Decimal::ZERO,
                new_stock_level: updated.current_stock,
                reason: format!("Details updated: {}", cmd.changed_fields().join(", ")),
                processed_by: self.actor,
            },
        )
        .await?;

        Ok(updated)
    }
}

struct RemoveItem {
    stock_item_id: i32,
    actor: Uuid,
}

#[async_trait]
impl UnitOfWork for RemoveItem {
    type Output = RemovedStockItem;

    fn name(&self) -> &'static str {
        "remove_stock_item"
    }

    async fn run(&self, txn: &DatabaseTransaction) -> Result<RemovedStockItem, ServiceError> {
        let item = for_update(
            stock_item::Entity::find_by_id(self.stock_item_id),
            txn.get_database_backend(),
        )
        .one(txn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Stock item {} not found", self.stock_item_id))
        })?;

        stock_item::Entity::delete_by_id(item.id).exec(txn).await?;

        let history_entry = record_stock_entry(
            txn,
            StockEntry {
                stock_item_id: None,
                transaction_type: classify(-item.current_stock, None)?,
                quantity_change: -item.current_stock,
                new_stock_level: Decimal::ZERO,
                reason: format!("Stock item '{}' (id {}) deleted", item.name, item.id),
                processed_by: self.actor,
            },
        )
        .await?;

        Ok(RemovedStockItem {
            stock_item_id: item.id,
            name: item.name,
            history_entry,
        })
    }
}

/// Stock maintenance operations, each run as one transaction
#[derive(Clone)]
pub struct StockLedgerService {
    db: Arc<DbPool>,
    tx_policy: TxPolicy,
    event_sender: EventSender,
}

impl StockLedgerService {
    pub fn new(db: Arc<DbPool>, tx_policy: TxPolicy, event_sender: EventSender) -> Self {
        Self {
            db,
            tx_policy,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, stock_item_id: i32) -> Result<stock_item::Model, ServiceError> {
        stock_item::Entity::find_by_id(stock_item_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock item {} not found", stock_item_id)))
    }

    #[instrument(skip(self, command), fields(name = %command.name))]
    pub async fn register_item(
        &self,
        command: RegisterStockItemCommand,
        actor: Uuid,
    ) -> Result<LedgerEntry, ServiceError> {
        command.validate()?;
        if command.supplied_price.is_some() && command.supplier_id.is_none() {
            return Err(ServiceError::ValidationError(
                "A supplied price requires a supplier".to_string(),
            ));
        }

        let work = RegisterItem { command, actor };
        let entry = db::execute(self.db.as_ref(), &self.tx_policy, &work).await?;

        info!(
            stock_item_id = entry.stock_item.id,
            initial_stock = %entry.stock_item.current_stock,
            "Stock item registered"
        );
        self.event_sender
            .publish(Event::StockItemRegistered {
                stock_item_id: entry.stock_item.id,
                name: entry.stock_item.name.clone(),
            })
            .await;
        Ok(entry)
    }

    #[instrument(skip(self, command))]
    pub async fn adjust_stock(
        &self,
        stock_item_id: i32,
        command: AdjustStockCommand,
        actor: Uuid,
    ) -> Result<LedgerEntry, ServiceError> {
        command.validate()?;
        if command.quantity_change.is_zero() {
            return Err(ServiceError::ValidationError(
                "Quantity change must not be zero".to_string(),
            ));
        }

        let work = AdjustStock {
            stock_item_id,
            command,
            actor,
        };
        let entry = db::execute(self.db.as_ref(), &self.tx_policy, &work).await?;

        info!(
            stock_item_id,
            quantity_change = %entry.history_entry.quantity_change,
            new_stock_level = %entry.stock_item.current_stock,
            "Stock adjusted"
        );
        self.event_sender.publish(entry.to_event()).await;
        Ok(entry)
    }

    #[instrument(skip(self, command))]
    pub async fn update_details(
        &self,
        stock_item_id: i32,
        command: UpdateStockItemCommand,
        actor: Uuid,
    ) -> Result<stock_item::Model, ServiceError> {
        command.validate()?;
        if command.changed_fields().is_empty() {
            return Err(ServiceError::ValidationError("No changes supplied".to_string()));
        }

        let work = UpdateDetails {
            stock_item_id,
            command,
            actor,
        };
        let item = db::execute(self.db.as_ref(), &self.tx_policy, &work).await?;
        info!(stock_item_id, "Stock item details updated");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        stock_item_id: i32,
        actor: Uuid,
    ) -> Result<RemovedStockItem, ServiceError> {
        let work = RemoveItem {
            stock_item_id,
            actor,
        };
        let removed = db::execute(self.db.as_ref(), &self.tx_policy, &work).await?;

        info!(stock_item_id, name = %removed.name, "Stock item removed");
        self.event_sender
            .publish(Event::StockItemRemoved {
                stock_item_id,
                name: removed.name.clone(),
            })
            .await;
        Ok(removed)
    }
}
