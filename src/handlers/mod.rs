pub mod common;
pub mod dispensing;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod reports;

use crate::config::AppConfig;
use crate::db::{DbPool, TxPolicy};
use crate::events::EventSender;
use crate::services::{
    audit_trail::AuditTrailService, dispensing::DispensingService,
    procurement::ProcurementService, reorder_advisor::ReorderAdvisor,
    reports::ReportsService, stock_ledger::StockLedgerService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub stock_ledger: Arc<StockLedgerService>,
    pub audit_trail: Arc<AuditTrailService>,
    pub reorder_advisor: Arc<ReorderAdvisor>,
    pub procurement: Arc<ProcurementService>,
    pub dispensing: Arc<DispensingService>,
    pub reports: Arc<ReportsService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig, event_sender: EventSender) -> Self {
        let tx_policy = TxPolicy::from(config);

        Self {
            stock_ledger: Arc::new(StockLedgerService::new(
                db_pool.clone(),
                tx_policy.clone(),
                event_sender.clone(),
            )),
            audit_trail: Arc::new(AuditTrailService::new(db_pool.clone())),
            reorder_advisor: Arc::new(ReorderAdvisor::new(
                db_pool.clone(),
                config.reorder_expiry_window_days,
            )),
            procurement: Arc::new(ProcurementService::new(
                db_pool.clone(),
                tx_policy.clone(),
                event_sender.clone(),
            )),
            dispensing: Arc::new(DispensingService::new(
                db_pool.clone(),
                tx_policy,
                event_sender,
            )),
            reports: Arc::new(ReportsService::new(
                db_pool,
                i64::from(config.expiring_report_default_months),
            )),
        }
    }
}
