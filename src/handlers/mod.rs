pub mod batches;
pub mod common;
pub mod deliveries;
pub mod issues;
pub mod materials;
pub mod production_orders;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::clock::SharedClock;
use crate::config::ProductionConfig;
use crate::events::EventSender;
use crate::services::{
    BatchService, DeliveryService, InventoryLedgerService, IssueService, ProductionOrderService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<InventoryLedgerService>,
    pub production_orders: Arc<ProductionOrderService>,
    pub batches: Arc<BatchService>,
    pub deliveries: Arc<DeliveryService>,
    pub issues: Arc<IssueService>,
    pub clock: SharedClock,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: SharedClock,
        event_sender: Option<EventSender>,
        production: ProductionConfig,
    ) -> Self {
        Self {
            inventory: Arc::new(InventoryLedgerService::new(
                db.clone(),
                clock.clone(),
                event_sender.clone(),
            )),
            production_orders: Arc::new(ProductionOrderService::new(
                db.clone(),
                clock.clone(),
                event_sender.clone(),
                production,
            )),
            batches: Arc::new(BatchService::new(
                db.clone(),
                clock.clone(),
                event_sender.clone(),
            )),
            deliveries: Arc::new(DeliveryService::new(
                db.clone(),
                clock.clone(),
                event_sender.clone(),
            )),
            issues: Arc::new(IssueService::new(db, clock.clone(), event_sender)),
            clock,
        }
    }
}
