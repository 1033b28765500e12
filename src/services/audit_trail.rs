/*!
 * Append-only stock and order history.
 *
 * The `record_*` helpers are the only writers of history rows. They take the
 * caller's open transaction, so a history row exists exactly when the change
 * it describes was committed.
 */

use crate::{
    db::DbPool,
    entities::{inventory_history, order, order_history, stock_item, TransactionType},
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// A stock level change about to be written to the history
#[derive(Debug, Clone)]
pub struct StockEntry {
    pub stock_item_id: Option<i32>,
    pub transaction_type: TransactionType,
    pub quantity_change: Decimal,
    pub new_stock_level: Decimal,
    pub reason: String,
    pub processed_by: Uuid,
}

pub async fn record_stock_entry<C: ConnectionTrait>(
    conn: &C,
    entry: StockEntry,
) -> Result<inventory_history::Model, ServiceError> {
    let row = inventory_history::ActiveModel {
        id: NotSet,
        stock_item_id: Set(entry.stock_item_id),
        transaction_type: Set(entry.transaction_type),
        quantity_change: Set(entry.quantity_change),
        new_stock_level: Set(entry.new_stock_level),
        reason: Set(entry.reason),
        processed_by: Set(entry.processed_by),
        timestamp: Set(Utc::now()),
    };
    Ok(row.insert(conn).await?)
}

pub async fn record_order_entry<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    change_type: &str,
    description: String,
    changed_by: Uuid,
) -> Result<order_history::Model, ServiceError> {
    let row = order_history::ActiveModel {
        id: NotSet,
        order_id: Set(Some(order_id)),
        change_type: Set(change_type.to_string()),
        description: Set(description),
        changed_by: Set(changed_by),
        timestamp: Set(Utc::now()),
    };
    Ok(row.insert(conn).await?)
}

/// Read side of the history tables
#[derive(Clone)]
pub struct AuditTrailService {
    db: Arc<DbPool>,
}

impl AuditTrailService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Stock history of one item, oldest first
    #[instrument(skip(self))]
    pub async fn stock_history(
        &self,
        stock_item_id: i32,
    ) -> Result<Vec<inventory_history::Model>, ServiceError> {
        let db = self.db.as_ref();
        stock_item::Entity::find_by_id(stock_item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock item {} not found", stock_item_id)))?;

        Ok(inventory_history::Entity::find()
            .filter(inventory_history::Column::StockItemId.eq(stock_item_id))
            .order_by_asc(inventory_history::Column::Timestamp)
            .order_by_asc(inventory_history::Column::Id)
            .all(db)
            .await?)
    }

    /// Lifecycle history of one order, oldest first
    #[instrument(skip(self))]
    pub async fn order_history(
        &self,
        order_id: i32,
    ) -> Result<Vec<order_history::Model>, ServiceError> {
        let db = self.db.as_ref();
        order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(order_history::Entity::find()
            .filter(order_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_history::Column::Timestamp)
            .order_by_asc(order_history::Column::Id)
            .all(db)
            .await?)
    }
}
