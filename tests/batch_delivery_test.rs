mod common;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate};
use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{order_for, start_of_shift, TestApp};
use window_production::{
    domain::{BatchStatus, DeliveryStatus, ProductionStatus},
    entities::production_order,
    errors::ServiceError,
    services::{
        batches::{BatchUpdate, NewBatch, ShipToWarehouse},
        deliveries::{DeliveryFilter, ReceiveDelivery, RejectDelivery},
        production_orders::UpdateProgress,
    },
};

async fn started_order(app: &TestApp, quantity: i32) -> production_order::Model {
    app.seed_materials(dec!(1000)).await;
    let window = app.seed_window(1000, 1000).await;
    let orders = &app.services().production_orders;
    let order = orders
        .create(order_for(window.id, quantity), app.user)
        .await
        .unwrap();
    orders.start(order.id, app.user).await.unwrap()
}

fn batch_of(quantity: i32) -> NewBatch {
    NewBatch {
        quantity,
        quality_notes: None,
    }
}

fn to_status(status: BatchStatus) -> BatchUpdate {
    BatchUpdate {
        status,
        quality_check_passed: None,
        quality_notes: None,
    }
}

fn ship(batch_id: Uuid) -> ShipToWarehouse {
    ShipToWarehouse {
        batch_id,
        expected_delivery_date: None,
        items: None,
        notes: None,
    }
}

#[tokio::test]
async fn batches_are_numbered_per_order_and_capped_by_quantity() {
    let app = TestApp::new().await;
    let order = started_order(&app, 10).await;
    let batches = &app.services().batches;

    let first = batches
        .create_batch(order.id, batch_of(6), app.user)
        .await
        .unwrap();
    let second = batches
        .create_batch(order.id, batch_of(3), app.user)
        .await
        .unwrap();
    assert_eq!(first.batch_number, "PRD-2026-0001-B01");
    assert_eq!(second.batch_number, "PRD-2026-0001-B02");
    assert_eq!(first.status, BatchStatus::InProduction);

    let err = batches
        .create_batch(order.id, batch_of(2), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));

    // rejected batches still count against the order quantity
    batches
        .update_status(second.id, to_status(BatchStatus::Rejected))
        .await
        .unwrap();
    let err = batches
        .create_batch(order.id, batch_of(2), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));

    let last = batches
        .create_batch(order.id, batch_of(1), app.user)
        .await
        .unwrap();
    assert_eq!(last.batch_number, "PRD-2026-0001-B03");

    let listed = batches.list_for_order(order.id).await.unwrap();
    assert_eq!(listed.len(), 3);
}

#[tokio::test]
async fn batches_need_an_order_in_production() {
    let app = TestApp::new().await;
    app.seed_materials(dec!(100)).await;
    let window = app.seed_window(1000, 1000).await;
    let pending = app
        .services()
        .production_orders
        .create(order_for(window.id, 2), app.user)
        .await
        .unwrap();

    let err = app
        .services()
        .batches
        .create_batch(pending.id, batch_of(1), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition(_));
}

#[tokio::test]
async fn shipped_is_reserved_for_the_warehouse_handoff() {
    let app = TestApp::new().await;
    let order = started_order(&app, 2).await;
    let batches = &app.services().batches;
    let batch = batches
        .create_batch(order.id, batch_of(2), app.user)
        .await
        .unwrap();

    let err = batches
        .update_status(batch.id, to_status(BatchStatus::Shipped))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition(_));

    let err = batches
        .ship_to_warehouse(order.id, ship(batch.id), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition(_));

    app.clock.advance(Duration::hours(2));
    let ready = batches
        .update_status(batch.id, to_status(BatchStatus::Ready))
        .await
        .unwrap();
    assert_eq!(ready.completed_at, Some(start_of_shift() + Duration::hours(2)));
}

#[tokio::test]
async fn shipping_a_batch_opens_a_pending_delivery() {
    let app = TestApp::new().await;
    let order = started_order(&app, 2).await;
    let batches = &app.services().batches;
    let batch = batches
        .create_batch(order.id, batch_of(2), app.user)
        .await
        .unwrap();
    batches
        .update_status(batch.id, to_status(BatchStatus::Ready))
        .await
        .unwrap();

    let mut past = ship(batch.id);
    past.expected_delivery_date = Some(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    let err = batches
        .ship_to_warehouse(order.id, past, app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let shipment = batches
        .ship_to_warehouse(order.id, ship(batch.id), app.user)
        .await
        .unwrap();
    assert_eq!(shipment.batch.status, BatchStatus::Shipped);
    assert_eq!(shipment.delivery.delivery_number, "DEL-2026-0001");
    assert_eq!(shipment.delivery.status, DeliveryStatus::Pending);
    assert_eq!(shipment.delivery.production_batch_id, Some(batch.id));
    // defaults to the scheduled warehouse hand-off
    assert_eq!(
        shipment.delivery.expected_delivery_date,
        order.estimated_warehouse_delivery_at.unwrap().date_naive()
    );
    assert_eq!(shipment.delivery.items[0]["batch_number"], batch.batch_number);
    assert_eq!(shipment.delivery.items[0]["quantity"], 2);
    // order is still in production
    assert_eq!(shipment.order.status, ProductionStatus::InProgress);

    let err = batches
        .ship_to_warehouse(order.id, ship(batch.id), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition(_));
}

#[tokio::test]
async fn batch_from_another_order_is_not_found() {
    let app = TestApp::new().await;
    let order = started_order(&app, 2).await;
    let window = app.seed_window(500, 500).await;
    let orders = &app.services().production_orders;
    let other = orders.create(order_for(window.id, 1), app.user).await.unwrap();
    orders.start(other.id, app.user).await.unwrap();

    let batches = &app.services().batches;
    let foreign = batches
        .create_batch(other.id, batch_of(1), app.user)
        .await
        .unwrap();
    batches
        .update_status(foreign.id, to_status(BatchStatus::Ready))
        .await
        .unwrap();

    let err = batches
        .ship_to_warehouse(order.id, ship(foreign.id), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn full_handoff_reaches_delivered() {
    let app = TestApp::new().await;
    let order = started_order(&app, 4).await;
    let orders = &app.services().production_orders;
    let batches = &app.services().batches;
    let deliveries = &app.services().deliveries;

    let first = batches
        .create_batch(order.id, batch_of(2), app.user)
        .await
        .unwrap();
    let second = batches
        .create_batch(order.id, batch_of(2), app.user)
        .await
        .unwrap();
    for batch in [&first, &second] {
        batches
            .update_status(batch.id, to_status(BatchStatus::Ready))
            .await
            .unwrap();
    }

    let early = batches
        .ship_to_warehouse(order.id, ship(first.id), app.user)
        .await
        .unwrap();

    app.clock.advance(Duration::hours(6));
    orders
        .update_progress(
            order.id,
            UpdateProgress {
                status: ProductionStatus::Completed,
                notes: None,
            },
            app.user,
        )
        .await
        .unwrap();
    // one batch is still open
    assert_eq!(
        orders.get(order.id).await.unwrap().status,
        ProductionStatus::Completed
    );

    let last = batches
        .ship_to_warehouse(order.id, ship(second.id), app.user)
        .await
        .unwrap();
    assert_eq!(last.order.status, ProductionStatus::ShippedToWarehouse);

    for delivery in [&early.delivery, &last.delivery] {
        let in_transit = deliveries.ship(delivery.id, app.user).await.unwrap();
        assert_eq!(in_transit.status, DeliveryStatus::InTransit);
        assert_eq!(in_transit.shipped_by, Some(app.user));
    }

    let received = deliveries
        .receive(early.delivery.id, ReceiveDelivery::default(), app.user)
        .await
        .unwrap();
    assert_eq!(received.status, DeliveryStatus::Delivered);
    assert_eq!(received.received_by, Some(app.user));
    assert_eq!(
        orders.get(order.id).await.unwrap().status,
        ProductionStatus::ShippedToWarehouse
    );

    deliveries
        .receive(
            last.delivery.id,
            ReceiveDelivery {
                notes: Some("All panes intact".to_string()),
            },
            app.user,
        )
        .await
        .unwrap();
    let delivered = orders.get(order.id).await.unwrap();
    assert_eq!(delivered.status, ProductionStatus::Delivered);

    let details = orders.get_details(order.id).await.unwrap();
    assert_eq!(details.deliveries.len(), 2);
    assert_eq!(
        details.timeline.last().unwrap().status,
        ProductionStatus::Delivered
    );
}

async fn completed_order_with_two_deliveries(
    app: &TestApp,
) -> (production_order::Model, Uuid, Uuid) {
    let order = started_order(app, 2).await;
    let batches = &app.services().batches;
    let mut delivery_ids = vec![];
    for _ in 0..2 {
        let batch = batches
            .create_batch(order.id, batch_of(1), app.user)
            .await
            .unwrap();
        batches
            .update_status(batch.id, to_status(BatchStatus::Ready))
            .await
            .unwrap();
        let shipment = batches
            .ship_to_warehouse(order.id, ship(batch.id), app.user)
            .await
            .unwrap();
        delivery_ids.push(shipment.delivery.id);
    }
    let shipped = app
        .services()
        .production_orders
        .update_progress(
            order.id,
            UpdateProgress {
                status: ProductionStatus::Completed,
                notes: None,
            },
            app.user,
        )
        .await
        .unwrap();
    assert_eq!(shipped.status, ProductionStatus::ShippedToWarehouse);
    (shipped, delivery_ids[0], delivery_ids[1])
}

fn rejection() -> RejectDelivery {
    RejectDelivery {
        reason: "Cracked glass".to_string(),
    }
}

#[tokio::test]
async fn rejecting_the_last_open_delivery_closes_the_handoff() {
    let app = TestApp::new().await;
    let (order, first, second) = completed_order_with_two_deliveries(&app).await;
    let deliveries = &app.services().deliveries;

    deliveries.ship(first, app.user).await.unwrap();
    deliveries
        .receive(first, ReceiveDelivery::default(), app.user)
        .await
        .unwrap();
    deliveries.reject(second, rejection(), app.user).await.unwrap();

    let orders = &app.services().production_orders;
    let closed = orders.get(order.id).await.unwrap();
    assert_eq!(closed.status, ProductionStatus::Delivered);
    let timeline = orders.timeline(order.id).await.unwrap();
    assert_eq!(timeline.last().unwrap().status, ProductionStatus::Delivered);
}

#[tokio::test]
async fn handoff_stays_open_when_nothing_arrived() {
    let app = TestApp::new().await;
    let (order, first, second) = completed_order_with_two_deliveries(&app).await;
    let deliveries = &app.services().deliveries;

    deliveries.reject(first, rejection(), app.user).await.unwrap();
    deliveries.reject(second, rejection(), app.user).await.unwrap();

    assert_eq!(
        app.services()
            .production_orders
            .get(order.id)
            .await
            .unwrap()
            .status,
        ProductionStatus::ShippedToWarehouse
    );
}

#[tokio::test]
async fn completion_ships_order_when_batches_already_left() {
    let app = TestApp::new().await;
    let order = started_order(&app, 2).await;
    let orders = &app.services().production_orders;
    let batches = &app.services().batches;

    let batch = batches
        .create_batch(order.id, batch_of(2), app.user)
        .await
        .unwrap();
    batches
        .update_status(batch.id, to_status(BatchStatus::Ready))
        .await
        .unwrap();
    batches
        .ship_to_warehouse(order.id, ship(batch.id), app.user)
        .await
        .unwrap();

    let completed = orders
        .update_progress(
            order.id,
            UpdateProgress {
                status: ProductionStatus::Completed,
                notes: None,
            },
            app.user,
        )
        .await
        .unwrap();
    assert_eq!(completed.status, ProductionStatus::ShippedToWarehouse);
    assert!(completed.actual_completion_at.is_some());
}

#[tokio::test]
async fn delivery_transitions_are_guarded() {
    let app = TestApp::new().await;
    let order = started_order(&app, 1).await;
    let batches = &app.services().batches;
    let deliveries = &app.services().deliveries;

    let batch = batches
        .create_batch(order.id, batch_of(1), app.user)
        .await
        .unwrap();
    batches
        .update_status(batch.id, to_status(BatchStatus::Ready))
        .await
        .unwrap();
    let shipment = batches
        .ship_to_warehouse(order.id, ship(batch.id), app.user)
        .await
        .unwrap();

    let err = deliveries
        .receive(shipment.delivery.id, ReceiveDelivery::default(), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition(_));

    let rejected = deliveries
        .reject(
            shipment.delivery.id,
            RejectDelivery {
                reason: "Cracked pane".to_string(),
            },
            app.user,
        )
        .await
        .unwrap();
    assert_eq!(rejected.status, DeliveryStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Cracked pane"));

    let err = deliveries.ship(rejected.id, app.user).await.unwrap_err();
    assert_matches!(err, ServiceError::IllegalTransition(_));

    let stats = deliveries.statistics().await.unwrap();
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.pending, 0);

    let listed = deliveries
        .list(
            DeliveryFilter {
                status: Some(DeliveryStatus::Rejected),
                ..Default::default()
            },
            1,
            20,
        )
        .await
        .unwrap();
    assert_eq!(listed.total, 1);
}

#[tokio::test]
async fn overdue_pending_deliveries_count_as_delayed() {
    let app = TestApp::new().await;
    let order = started_order(&app, 1).await;
    let batches = &app.services().batches;

    let batch = batches
        .create_batch(order.id, batch_of(1), app.user)
        .await
        .unwrap();
    batches
        .update_status(batch.id, to_status(BatchStatus::Ready))
        .await
        .unwrap();
    batches
        .ship_to_warehouse(order.id, ship(batch.id), app.user)
        .await
        .unwrap();

    let deliveries = &app.services().deliveries;
    assert_eq!(deliveries.statistics().await.unwrap().delayed, 0);

    app.clock.advance(Duration::days(3));
    let stats = deliveries.statistics().await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.delayed, 1);
}
