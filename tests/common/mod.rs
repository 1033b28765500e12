#![allow(dead_code)]

use std::{path::Path, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::{NaiveDate, Utc};
use healthlink_api::{
    auth::{Role, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, FACILITY_ID_HEADER},
    config::AppConfig,
    db,
    entities::{
        facility, inventory_history, medication, patient, patient_visit, prescription, stock_item,
        supplier, PrescriptionStatus, StockUnit,
    },
    events::{self, EventSender},
    services::stock_ledger::RegisterStockItemCommand,
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, PaginatorTrait, QueryFilter, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up an application state backed by SQLite.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub actor: Uuid,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = test_config("sqlite::memory:".to_string());
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.tx_retry_backoff_ms = 1;
        Self::with_config(cfg).await
    }

    /// An application over a SQLite file in `dir` with a multi-connection
    /// pool, so concurrent units of work run on separate connections.
    pub async fn file_backed(dir: &Path) -> Self {
        let path = dir.join("healthlink.db");
        let mut cfg = test_config(format!("sqlite://{}?mode=rwc", path.display()));
        cfg.db_max_connections = 8;
        cfg.db_min_connections = 1;
        cfg.tx_max_retries = 20;
        cfg.tx_retry_backoff_ms = 25;
        Self::with_config(cfg).await
    }

    async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = healthlink_api::app_router(state.clone());

        Self {
            router,
            state,
            actor: Uuid::new_v4(),
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &sea_orm::DatabaseConnection {
        self.state.db.as_ref()
    }

    /// Sends a request carrying principal headers for `role`, or none at all.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        role: Option<Role>,
    ) -> Response {
        self.request_with_facility(method, uri, body, role, None).await
    }

    pub async fn request_with_facility(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        role: Option<Role>,
        facility_id: Option<i32>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(role) = role {
            builder = builder
                .header(ACTOR_ID_HEADER, self.actor.to_string())
                .header(ACTOR_ROLE_HEADER, role.to_string());
        }
        if let Some(facility_id) = facility_id {
            builder = builder.header(FACILITY_ID_HEADER, facility_id.to_string());
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_facility(&self, name: &str) -> facility::Model {
        facility::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            location: Set(Some("Ward A".to_string())),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed facility")
    }

    pub async fn seed_supplier(&self, name: &str) -> supplier::Model {
        supplier::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            contact_person: Set(None),
            phone: Set(None),
            email: Set(None),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed supplier")
    }

    /// Registers a stock item through the ledger so it starts with history.
    pub async fn seed_stock_item(
        &self,
        name: &str,
        stock: Decimal,
        reorder_level: Decimal,
        expiry_date: Option<NaiveDate>,
    ) -> stock_item::Model {
        self.state
            .services
            .stock_ledger
            .register_item(
                RegisterStockItemCommand {
                    name: name.to_string(),
                    description: None,
                    unit: StockUnit::Tablet,
                    initial_stock: stock,
                    reorder_level,
                    purchase_price: Some(Decimal::new(2, 0)),
                    sale_price: Some(Decimal::new(5, 0)),
                    supplied_price: None,
                    expiry_date,
                    supplier_id: None,
                    location: Some("Shelf 1".to_string()),
                },
                self.actor,
            )
            .await
            .expect("seed stock item")
            .stock_item
    }

    pub async fn seed_medication(&self, name: &str, stock_item_id: Option<i32>) -> medication::Model {
        medication::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
            description: Set(None),
            stock_item_id: Set(stock_item_id),
        }
        .insert(self.db())
        .await
        .expect("seed medication")
    }

    pub async fn seed_patient(&self, first_name: &str, last_name: &str) -> patient::Model {
        patient::ActiveModel {
            id: NotSet,
            first_name: Set(first_name.to_string()),
            last_name: Set(last_name.to_string()),
            facility_id: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed patient")
    }

    /// A prescription for `patient` on a fresh visit.
    pub async fn seed_prescription_for(
        &self,
        patient: &patient::Model,
        medication_id: i32,
        prescribed: i32,
        dispensed: i32,
    ) -> prescription::Model {
        let visit = patient_visit::ActiveModel {
            id: NotSet,
            patient_id: Set(patient.id),
            facility_id: Set(None),
            visit_date: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed visit");

        let status = if dispensed == 0 {
            PrescriptionStatus::Pending
        } else if dispensed >= prescribed {
            PrescriptionStatus::Completed
        } else {
            PrescriptionStatus::PartiallyDispensed
        };
        let now = Utc::now();

        prescription::ActiveModel {
            id: NotSet,
            patient_visit_id: Set(visit.id),
            medication_id: Set(medication_id),
            dosage: Set("500mg".to_string()),
            frequency: Set("Twice daily".to_string()),
            duration_days: Set(Some(7)),
            quantity_prescribed: Set(prescribed),
            quantity_dispensed: Set(dispensed),
            status: Set(status),
            prescribed_by: Set(Some(Uuid::new_v4())),
            dispensed_by: Set(None),
            dispensed_date: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed prescription")
    }

    pub async fn seed_prescription(
        &self,
        medication_id: i32,
        prescribed: i32,
        dispensed: i32,
    ) -> prescription::Model {
        let patient = self.seed_patient("Amina", "Otieno").await;
        self.seed_prescription_for(&patient, medication_id, prescribed, dispensed)
            .await
    }

    pub async fn stock_item(&self, id: i32) -> stock_item::Model {
        stock_item::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load stock item")
            .expect("stock item exists")
    }

    pub async fn prescription(&self, id: i32) -> prescription::Model {
        prescription::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load prescription")
            .expect("prescription exists")
    }

    pub async fn history_count(&self, stock_item_id: i32) -> u64 {
        inventory_history::Entity::find()
            .filter(inventory_history::Column::StockItemId.eq(stock_item_id))
            .count(self.db())
            .await
            .expect("count history")
    }
}

fn test_config(database_url: String) -> AppConfig {
    AppConfig::new(
        database_url,
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    )
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Parses a response body as JSON.
pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("response body is json")
}
