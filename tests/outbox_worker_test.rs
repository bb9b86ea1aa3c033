mod common;

use async_trait::async_trait;
use chrono::Duration;
use mockall::{mock, predicate::always, Sequence};
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

use common::{order_for, TestApp};
use window_production::{
    clock::SharedClock,
    entities::notification_outbox::{Entity as OutboxEntity, OutboxStatus},
    events::outbox::{drain_once, DrainReport, OutboxWorkerConfig},
    notifications::{
        NotificationDispatcher, NotificationError, NotificationIntent, NotificationType,
    },
};

mock! {
    pub Dispatcher {}

    #[async_trait]
    impl NotificationDispatcher for Dispatcher {
        async fn dispatch(&self, id: Uuid, intent: &NotificationIntent)
            -> Result<(), NotificationError>;
    }
}

fn worker_config(max_attempts: i32) -> OutboxWorkerConfig {
    OutboxWorkerConfig {
        poll_interval: std::time::Duration::from_millis(10),
        batch_size: 10,
        max_attempts,
    }
}

async fn app_with_new_order() -> TestApp {
    let app = TestApp::new().await;
    app.seed_materials(dec!(100)).await;
    let window = app.seed_window(1000, 1000).await;
    app.services()
        .production_orders
        .create(order_for(window.id, 1), app.user)
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn committed_notifications_are_dispatched_once() {
    let app = app_with_new_order().await;
    let clock: SharedClock = app.clock.clone();

    let mut dispatcher = MockDispatcher::new();
    dispatcher
        .expect_dispatch()
        .withf(|_, intent| intent.notification_type == NotificationType::NewProductionOrder)
        .times(1)
        .returning(|_, _| Ok(()));

    let report = drain_once(&app.db, &dispatcher, &clock, &worker_config(3))
        .await
        .unwrap();
    assert_eq!(
        report,
        DrainReport {
            delivered: 1,
            retried: 0,
            failed: 0
        }
    );

    // nothing left to send
    let report = drain_once(&app.db, &dispatcher, &clock, &worker_config(3))
        .await
        .unwrap();
    assert_eq!(report, DrainReport::default());

    let rows = OutboxEntity::find().all(&*app.db).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, OutboxStatus::Delivered);
    assert!(rows[0].processed_at.is_some());
}

#[tokio::test]
async fn failed_dispatch_backs_off_then_gives_up() {
    let app = app_with_new_order().await;
    let clock: SharedClock = app.clock.clone();

    let mut dispatcher = MockDispatcher::new();
    let mut seq = Sequence::new();
    dispatcher
        .expect_dispatch()
        .with(always(), always())
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(NotificationError::Delivery("smtp down".to_string())));

    let first = drain_once(&app.db, &dispatcher, &clock, &worker_config(2))
        .await
        .unwrap();
    assert_eq!(first.retried, 1);

    // still backing off
    let idle = drain_once(&app.db, &dispatcher, &clock, &worker_config(2))
        .await
        .unwrap();
    assert_eq!(idle, DrainReport::default());

    app.clock.advance(Duration::seconds(3));
    let last = drain_once(&app.db, &dispatcher, &clock, &worker_config(2))
        .await
        .unwrap();
    assert_eq!(last.failed, 1);

    let rows = OutboxEntity::find().all(&*app.db).await.unwrap();
    assert_eq!(rows[0].status, OutboxStatus::Failed);
    assert_eq!(rows[0].attempts, 2);
    assert_eq!(rows[0].last_error.as_deref(), Some("Delivery failed: smtp down"));
}
