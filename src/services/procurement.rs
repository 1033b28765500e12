/*!
 * # Procurement workflow
 *
 * Orders are placed with one supplier for one facility. Placement prices every
 * line inside the same transaction that creates the order, so an unpriced
 * line leaves no order behind. Receiving an order books every line into stock
 * through the ledger.
 */

use super::validate_positive_decimal;
use crate::{
    db::{self, for_update, DbPool, TxPolicy, UnitOfWork},
    entities::{
        facility, order, order_item, stock_item, supplier, supplier_stock_item, OrderStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        audit_trail::record_order_entry,
        stock_ledger::{apply_delta, LedgerEntry},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, NotSet,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineCommand {
    pub stock_item_id: i32,
    #[validate(custom = "validate_positive_decimal")]
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderCommand {
    pub supplier_id: i32,
    /// Defaults to the caller's facility
    pub facility_id: Option<i32>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one line item"))]
    pub items: Vec<OrderLineCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangeOrderStatusCommand {
    pub status: OrderStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// An order together with its line items
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Unit price for a line: the negotiated supplier price when defined,
/// otherwise the item's purchase price. Zero counts as undefined.
pub fn resolve_unit_price(negotiated: Option<Decimal>, purchase: Option<Decimal>) -> Option<Decimal> {
    negotiated
        .filter(|price| *price > Decimal::ZERO)
        .or_else(|| purchase.filter(|price| *price > Decimal::ZERO))
}

fn validate_order(command: &PlaceOrderCommand) -> Result<(), ServiceError> {
    command.validate()?;
    let mut seen = HashSet::with_capacity(command.items.len());
    for line in &command.items {
        line.validate()?;
        if !seen.insert(line.stock_item_id) {
            return Err(ServiceError::ValidationError(format!(
                "Stock item {} appears more than once in the order",
                line.stock_item_id
            )));
        }
    }
    Ok(())
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Vec<order_item::Model>, ServiceError> {
    Ok(order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await?)
}

async fn lock_order(txn: &DatabaseTransaction, order_id: i32) -> Result<order::Model, ServiceError> {
    for_update(order::Entity::find_by_id(order_id), txn.get_database_backend())
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

struct PlaceOrder {
    command: PlaceOrderCommand,
    facility_id: i32,
    actor: Uuid,
}

#[async_trait]
impl UnitOfWork for PlaceOrder {
    type Output = OrderDetail;

    fn name(&self) -> &'static str {
        "place_order"
    }

    async fn run(&self, txn: &DatabaseTransaction) -> Result<OrderDetail, ServiceError> {
        let cmd = &self.command;

        let supplier = supplier::Entity::find_by_id(cmd.supplier_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Supplier {} not found", cmd.supplier_id))
            })?;

        facility::Entity::find_by_id(self.facility_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Facility {} not found", self.facility_id))
            })?;

        let now = Utc::now();
        let order = order::ActiveModel {
            id: NotSet,
            supplier_id: Set(supplier.id),
            facility_id: Set(self.facility_id),
            status: Set(OrderStatus::Ordered),
            total_amount: Set(Decimal::ZERO),
            notes: Set(cmd.notes.clone()),
            created_by: Set(self.actor),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        let mut total = Decimal::ZERO;
        let mut items = Vec::with_capacity(cmd.items.len());

        for line in &cmd.items {
            let item = stock_item::Entity::find_by_id(line.stock_item_id)
                .one(txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Stock item {} not found", line.stock_item_id))
                })?;

            let negotiated = supplier_stock_item::Entity::find()
                .filter(supplier_stock_item::Column::SupplierId.eq(supplier.id))
                .filter(supplier_stock_item::Column::StockItemId.eq(item.id))
                .one(txn)
                .await?
                .map(|row| row.supplied_price);

            let unit_price = resolve_unit_price(negotiated, item.purchase_price).ok_or_else(|| {
                ServiceError::PriceNotFound(format!(
                    "Unit price not defined for stock item {} from this supplier.",
                    item.name
                ))
            })?;

            let row = order_item::ActiveModel {
                id: NotSet,
                order_id: Set(order.id),
                stock_item_id: Set(Some(item.id)),
                quantity: Set(line.quantity),
                unit_price: Set(unit_price),
            }
            .insert(txn)
            .await?;

            total += row.line_total();
            items.push(row);
        }

        let mut active: order::ActiveModel = order.into();
        active.total_amount = Set(total);
        let order = active.update(txn).await?;

        record_order_entry(
            txn,
            order.id,
            "Order Placed",
            format!(
                "Order placed with {} for {} items.",
                supplier.name,
                items.len()
            ),
            self.actor,
        )
        .await?;

        Ok(OrderDetail { order, items })
    }
}

struct ReceiveOrder {
    order_id: i32,
    actor: Uuid,
}

struct Receipt {
    detail: OrderDetail,
    entries: Vec<LedgerEntry>,
}

#[async_trait]
impl UnitOfWork for ReceiveOrder {
    type Output = Receipt;

    fn name(&self) -> &'static str {
        "receive_order"
    }

    async fn run(&self, txn: &DatabaseTransaction) -> Result<Receipt, ServiceError> {
        let order = lock_order(txn, self.order_id).await?;
        if !order.status.is_receivable() {
            return Err(ServiceError::InvalidState(format!(
                "Order {} cannot be received while {}",
                order.id, order.status
            )));
        }

        let items = load_items(txn, order.id).await?;
        let mut entries = Vec::with_capacity(items.len());
        let mut skipped = Vec::new();

        for line in &items {
            match line.stock_item_id {
                Some(stock_item_id) => {
                    let entry = apply_delta(
                        txn,
                        stock_item_id,
                        line.quantity,
                        None,
                        format!("Received on Order {}", order.id),
                        self.actor,
                    )
                    .await?;
                    entries.push(entry);
                }
                None => skipped.push(line.id),
            }
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Completed);
        active.updated_at = Set(Utc::now());
        let order = active.update(txn).await?;

        let mut description = format!("Received {} line items into stock.", entries.len());
        if !skipped.is_empty() {
            let ids: Vec<String> = skipped.iter().map(ToString::to_string).collect();
            description.push_str(&format!(
                " Skipped line items {} whose stock item no longer exists.",
                ids.join(", ")
            ));
        }
        record_order_entry(txn, order.id, "Order Received", description, self.actor).await?;

        Ok(Receipt {
            detail: OrderDetail { order, items },
            entries,
        })
    }
}

struct ChangeStatus {
    order_id: i32,
    command: ChangeOrderStatusCommand,
    actor: Uuid,
}

#[async_trait]
impl UnitOfWork for ChangeStatus {
    type Output = (OrderStatus, order::Model);

    fn name(&self) -> &'static str {
        "change_order_status"
    }

    async fn run(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<(OrderStatus, order::Model), ServiceError> {
        let order = lock_order(txn, self.order_id).await?;
        let previous = order.status;
        let next = self.command.status;

        if !previous.can_transition_to(next) {
            return Err(ServiceError::InvalidState(format!(
                "Order {} cannot move from {} to {}",
                order.id, previous, next
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(next);
        active.updated_at = Set(Utc::now());
        let order = active.update(txn).await?;

        let mut description = format!("Status changed from {} to {}.", previous, next);
        if let Some(note) = self.command.note.as_deref().filter(|n| !n.trim().is_empty()) {
            description.push(' ');
            description.push_str(note.trim());
        }
        record_order_entry(txn, order.id, "Status Changed", description, self.actor).await?;

        Ok((previous, order))
    }
}

#[derive(Clone)]
pub struct ProcurementService {
    db: Arc<DbPool>,
    tx_policy: TxPolicy,
    event_sender: EventSender,
}

impl ProcurementService {
    pub fn new(db: Arc<DbPool>, tx_policy: TxPolicy, event_sender: EventSender) -> Self {
        Self {
            db,
            tx_policy,
            event_sender,
        }
    }

    /// Places an order; `default_facility` is used when the command names none.
    #[instrument(skip(self, command), fields(supplier_id = command.supplier_id))]
    pub async fn place_order(
        &self,
        command: PlaceOrderCommand,
        default_facility: Option<i32>,
        actor: Uuid,
    ) -> Result<OrderDetail, ServiceError> {
        validate_order(&command)?;
        let facility_id = command.facility_id.or(default_facility).ok_or_else(|| {
            ServiceError::ValidationError("A facility is required to place an order".to_string())
        })?;

        let work = PlaceOrder {
            command,
            facility_id,
            actor,
        };
        let detail = db::execute(self.db.as_ref(), &self.tx_policy, &work).await?;

        counter!("healthlink_procurement.orders_placed", 1);
        info!(
            order_id = detail.order.id,
            total_amount = %detail.order.total_amount,
            lines = detail.items.len(),
            "Order placed"
        );
        self.event_sender
            .publish(Event::OrderPlaced {
                order_id: detail.order.id,
                supplier_id: detail.order.supplier_id,
                total_amount: detail.order.total_amount,
            })
            .await;
        Ok(detail)
    }

    #[instrument(skip(self))]
    pub async fn receive_order(&self, order_id: i32, actor: Uuid) -> Result<OrderDetail, ServiceError> {
        let receipt = db::execute(
            self.db.as_ref(),
            &self.tx_policy,
            &ReceiveOrder { order_id, actor },
        )
        .await?;

        info!(order_id, lines_received = receipt.entries.len(), "Order received");
        for entry in &receipt.entries {
            self.event_sender.publish(entry.to_event()).await;
        }
        self.event_sender
            .publish(Event::OrderReceived {
                order_id,
                lines_received: receipt.entries.len(),
            })
            .await;
        Ok(receipt.detail)
    }

    #[instrument(skip(self, command), fields(status = %command.status))]
    pub async fn update_status(
        &self,
        order_id: i32,
        command: ChangeOrderStatusCommand,
        actor: Uuid,
    ) -> Result<order::Model, ServiceError> {
        command.validate()?;
        let work = ChangeStatus {
            order_id,
            command,
            actor,
        };
        let (previous, order) = db::execute(self.db.as_ref(), &self.tx_policy, &work).await?;

        info!(order_id, old_status = %previous, new_status = %order.status, "Order status changed");
        self.event_sender
            .publish(Event::OrderStatusChanged {
                order_id,
                old_status: previous,
                new_status: order.status,
            })
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderDetail, ServiceError> {
        let db = self.db.as_ref();
        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let items = load_items(db, order.id).await?;
        Ok(OrderDetail { order, items })
    }
}
