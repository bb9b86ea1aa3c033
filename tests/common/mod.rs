#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use window_production::{
    app_router,
    auth::{Role, USER_ID_HEADER, USER_ROLE_HEADER},
    clock::{FixedClock, SharedClock},
    config::{AppConfig, ProductionConfig},
    db,
    domain::{MaterialType, SourceType},
    entities::{material, window},
    events::{self, EventSender},
    handlers::AppServices,
    services::{
        inventory_ledger::NewMaterial,
        production_orders::{NewOrderItem, NewProductionOrder},
    },
    AppState,
};

/// Monday morning on the shop floor.
pub fn start_of_shift() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

/// Application wired against a throwaway SQLite file.
pub struct TestApp {
    pub state: AppState,
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<FixedClock>,
    pub user: Uuid,
    router: Router,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_production_config(ProductionConfig::default()).await
    }

    pub async fn with_production_config(production: ProductionConfig) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("production.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // one connection keeps SQLite writers serialized
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.production = production;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db = Arc::new(pool);

        let clock = Arc::new(FixedClock::new(start_of_shift()));
        let shared_clock: SharedClock = clock.clone();

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(
            db.clone(),
            shared_clock,
            Some(event_sender),
            cfg.production.clone(),
        );
        let state = AppState {
            db: db.clone(),
            config: cfg,
            services,
        };

        Self {
            router: app_router(state.clone()),
            state,
            db,
            clock,
            user: Uuid::new_v4(),
            _dir: dir,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// A catalogue window of the given size.
    pub async fn seed_window(&self, width_mm: i32, height_mm: i32) -> window::Model {
        window::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(format!("Window {}x{}", width_mm, height_mm)),
            width_mm: Set(width_mm),
            height_mm: Set(height_mm),
            price: Set(Some(dec!(450))),
            is_active: Set(true),
            created_at: Set(start_of_shift()),
        }
        .insert(&*self.db)
        .await
        .expect("seed window")
    }

    pub async fn seed_material(
        &self,
        material_type: MaterialType,
        stock: Decimal,
        min_stock: Decimal,
    ) -> material::Model {
        let unit = match material_type {
            MaterialType::Profile => "m",
            MaterialType::Glass => "m2",
            _ => "pcs",
        };
        self.services()
            .inventory
            .create_material(
                NewMaterial {
                    name: format!("{} stock", material_type),
                    material_type,
                    unit: unit.to_string(),
                    initial_stock: stock,
                    min_stock,
                    price_per_unit: dec!(10),
                    supplier: None,
                },
                self.user,
            )
            .await
            .expect("seed material")
    }

    /// Profile, glass and hardware with `stock` each and no low-stock threshold.
    pub async fn seed_materials(&self, stock: Decimal) -> Vec<material::Model> {
        let mut seeded = Vec::new();
        for kind in [MaterialType::Profile, MaterialType::Glass, MaterialType::Hardware] {
            seeded.push(self.seed_material(kind, stock, Decimal::ZERO).await);
        }
        seeded
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        role: Option<Role>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder
                .header(USER_ID_HEADER, self.user.to_string())
                .header(USER_ROLE_HEADER, role.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}

/// Order input for `quantity` windows of one catalogue entry.
pub fn order_for(window_id: Uuid, quantity: i32) -> NewProductionOrder {
    NewProductionOrder {
        source_type: SourceType::CustomerOrder,
        source_order_id: None,
        customer_name: Some("Anna Kowalska".to_string()),
        customer_email: Some("anna@example.com".to_string()),
        delivery_address: Some("ul. Polna 3, Krakow".to_string()),
        product_description: "PVC tilt-and-turn windows".to_string(),
        specifications: None,
        priority: Default::default(),
        assigned_to: None,
        estimated_completion_at: None,
        notes: None,
        items: vec![NewOrderItem {
            window_id,
            quantity,
        }],
    }
}
