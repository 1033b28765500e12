//! SeaORM entities for the pharmacy stock and dispensing schema.

pub mod facility;
pub mod inventory_history;
pub mod medication;
pub mod order;
pub mod order_history;
pub mod order_item;
pub mod patient;
pub mod patient_visit;
pub mod payment_transaction;
pub mod prescription;
pub mod stock_item;
pub mod supplier;
pub mod supplier_stock_item;

pub use inventory_history::TransactionType;
pub use order::OrderStatus;
pub use payment_transaction::PaymentMethod;
pub use prescription::PrescriptionStatus;
pub use stock_item::StockUnit;
