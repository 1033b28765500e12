use crate::entities::{OrderStatus, PrescriptionStatus, TransactionType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after its transaction committed without waiting for
    /// channel capacity. Failure is logged and never reported to the caller.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            error!("Dropping domain event: {}", e);
        }
    }
}

/// Domain events emitted after a workflow transaction commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    StockAdjusted {
        stock_item_id: i32,
        transaction_type: TransactionType,
        quantity_change: Decimal,
        new_stock_level: Decimal,
        below_reorder_level: bool,
    },
    StockItemRegistered {
        stock_item_id: i32,
        name: String,
    },
    StockItemRemoved {
        stock_item_id: i32,
        name: String,
    },
    OrderPlaced {
        order_id: i32,
        supplier_id: i32,
        total_amount: Decimal,
    },
    OrderReceived {
        order_id: i32,
        lines_received: usize,
    },
    OrderStatusChanged {
        order_id: i32,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    MedicationDispensed {
        prescription_id: i32,
        stock_item_id: i32,
        quantity: i32,
        status: PrescriptionStatus,
        payment_transaction_id: i32,
    },
}

/// Consumes the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::StockAdjusted {
                stock_item_id,
                transaction_type,
                quantity_change,
                new_stock_level,
                below_reorder_level,
            } => {
                info!(
                    stock_item_id,
                    %transaction_type,
                    %quantity_change,
                    %new_stock_level,
                    "Stock adjusted"
                );
                if below_reorder_level {
                    warn!(
                        "Low stock alert: item {} is below its reorder level ({} remaining)",
                        stock_item_id, new_stock_level
                    );
                }
            }
            Event::StockItemRegistered { stock_item_id, name } => {
                info!(stock_item_id, %name, "Stock item registered");
            }
            Event::StockItemRemoved { stock_item_id, name } => {
                info!(stock_item_id, %name, "Stock item removed");
            }
            Event::OrderPlaced {
                order_id,
                supplier_id,
                total_amount,
            } => {
                info!(order_id, supplier_id, %total_amount, "Order placed");
            }
            Event::OrderReceived {
                order_id,
                lines_received,
            } => {
                info!(order_id, lines_received, "Order received");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id, %old_status, %new_status, "Order status changed");
            }
            Event::MedicationDispensed {
                prescription_id,
                stock_item_id,
                quantity,
                status,
                payment_transaction_id,
            } => {
                info!(
                    prescription_id,
                    stock_item_id,
                    quantity,
                    %status,
                    payment_transaction_id,
                    "Medication dispensed"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn processor_drains_channel_and_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let handle = tokio::spawn(process_events(rx));

        sender
            .send(Event::OrderPlaced {
                order_id: 1,
                supplier_id: 2,
                total_amount: dec!(12.5),
            })
            .await
            .unwrap();
        drop(sender);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn publish_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender
            .send(Event::OrderReceived {
                order_id: 1,
                lines_received: 0
            })
            .await
            .is_err());
        sender
            .publish(Event::OrderReceived {
                order_id: 1,
                lines_received: 0,
            })
            .await;
    }
}
