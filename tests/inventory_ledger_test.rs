mod common;

use assert_matches::assert_matches;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use common::TestApp;
use window_production::{
    domain::{MaterialType, MovementDirection},
    entities::notification_outbox::{self, Entity as OutboxEntity},
    errors::ServiceError,
    services::inventory_ledger::StockAdjustment,
};

fn adjustment(quantity: Decimal) -> StockAdjustment {
    StockAdjustment {
        quantity,
        reason: "cycle count".to_string(),
        production_order_id: None,
    }
}

async fn movement_balance(app: &TestApp, material_id: Uuid) -> Decimal {
    app.services()
        .inventory
        .list_movements(material_id, None)
        .await
        .unwrap()
        .iter()
        .map(|m| match m.direction {
            MovementDirection::In => m.quantity,
            MovementDirection::Out => -m.quantity,
        })
        .sum()
}

#[tokio::test]
async fn initial_stock_is_booked_as_a_movement() {
    let app = TestApp::new().await;
    let glass = app
        .seed_material(MaterialType::Glass, dec!(40), dec!(5))
        .await;

    assert_eq!(glass.current_stock, dec!(40));
    let movements = app
        .services()
        .inventory
        .list_movements(glass.id, None)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].direction, MovementDirection::In);
    assert_eq!(movements[0].stock_after, dec!(40));
}

#[tokio::test]
async fn debit_beyond_stock_is_rejected_and_changes_nothing() {
    let app = TestApp::new().await;
    let profile = app
        .seed_material(MaterialType::Profile, dec!(10), Decimal::ZERO)
        .await;

    let err = app
        .services()
        .inventory
        .debit(profile.id, adjustment(dec!(12)), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let after = app.services().inventory.get_material(profile.id).await.unwrap();
    assert_eq!(after.current_stock, dec!(10));
    assert_eq!(movement_balance(&app, profile.id).await, dec!(10));
}

#[tokio::test]
async fn credit_and_debit_keep_stock_equal_to_movement_sum() {
    let app = TestApp::new().await;
    let hardware = app
        .seed_material(MaterialType::Hardware, dec!(20), Decimal::ZERO)
        .await;
    let inventory = &app.services().inventory;

    inventory
        .debit(hardware.id, adjustment(dec!(7)), app.user)
        .await
        .unwrap();
    let credit = inventory
        .credit(hardware.id, adjustment(dec!(3)), app.user)
        .await
        .unwrap();
    assert_eq!(credit.stock_after, dec!(16));

    let after = inventory.get_material(hardware.id).await.unwrap();
    assert_eq!(after.current_stock, dec!(16));
    assert_eq!(movement_balance(&app, hardware.id).await, dec!(16));
}

#[tokio::test]
async fn inactive_material_cannot_be_debited() {
    let app = TestApp::new().await;
    let seal = app
        .seed_material(MaterialType::Seal, dec!(100), Decimal::ZERO)
        .await;
    let inventory = &app.services().inventory;

    let deactivated = inventory.deactivate_material(seal.id).await.unwrap();
    assert!(!deactivated.is_active);

    let err = inventory
        .debit(seal.id, adjustment(dec!(1)), app.user)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidInput(_));
}

#[tokio::test]
async fn crossing_minimum_stock_enqueues_one_low_stock_notification() {
    let app = TestApp::new().await;
    let glass = app
        .seed_material(MaterialType::Glass, dec!(12), dec!(5))
        .await;
    let inventory = &app.services().inventory;

    inventory
        .debit(glass.id, adjustment(dec!(4)), app.user)
        .await
        .unwrap();
    assert!(!inventory.is_low_stock(glass.id).await.unwrap());

    inventory
        .debit(glass.id, adjustment(dec!(4)), app.user)
        .await
        .unwrap();
    // already low; no second notification
    inventory
        .debit(glass.id, adjustment(dec!(1)), app.user)
        .await
        .unwrap();
    assert!(inventory.is_low_stock(glass.id).await.unwrap());

    let low_stock = OutboxEntity::find()
        .filter(notification_outbox::Column::NotificationType.eq("low_stock"))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(low_stock.len(), 1);
    assert_eq!(low_stock[0].target_role.as_deref(), Some("admin"));

    let listed = inventory.low_stock_materials().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, glass.id);
}

#[tokio::test]
async fn concurrent_debits_never_oversell() {
    let app = TestApp::new().await;
    let hardware = app
        .seed_material(MaterialType::Hardware, dec!(10), Decimal::ZERO)
        .await;

    let mut tasks = vec![];
    for _ in 0..20 {
        let inventory = app.services().inventory.clone();
        let user = app.user;
        let material_id = hardware.id;
        tasks.push(tokio::spawn(async move {
            inventory
                .debit(material_id, adjustment(dec!(1)), user)
                .await
                .is_ok()
        }));
    }

    let mut success = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            success += 1;
        }
    }
    assert_eq!(
        success, 10,
        "exactly 10 debits should succeed; got {}",
        success
    );

    let after = app.services().inventory.get_material(hardware.id).await.unwrap();
    assert_eq!(after.current_stock, Decimal::ZERO);
    assert_eq!(movement_balance(&app, hardware.id).await, Decimal::ZERO);
}

#[derive(Debug, Clone)]
enum Op {
    Credit(u32),
    Debit(u32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(1u32..50).prop_map(Op::Credit), (1u32..50).prop_map(Op::Debit)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn stock_always_matches_movement_history(
        initial in 0u32..100,
        ops in prop::collection::vec(op(), 1..12)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let app = TestApp::new().await;
            let profile = app
                .seed_material(MaterialType::Profile, Decimal::from(initial), Decimal::ZERO)
                .await;
            let inventory = &app.services().inventory;

            let mut expected = Decimal::from(initial);
            for op in ops {
                match op {
                    Op::Credit(q) => {
                        inventory
                            .credit(profile.id, adjustment(Decimal::from(q)), app.user)
                            .await
                            .unwrap();
                        expected += Decimal::from(q);
                    }
                    Op::Debit(q) => {
                        let result = inventory
                            .debit(profile.id, adjustment(Decimal::from(q)), app.user)
                            .await;
                        if Decimal::from(q) <= expected {
                            assert!(result.is_ok());
                            expected -= Decimal::from(q);
                        } else {
                            assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
                        }
                    }
                }
            }

            let stock = inventory.get_material(profile.id).await.unwrap().current_stock;
            assert_eq!(stock, expected);
            assert!(stock >= Decimal::ZERO);
            assert_eq!(movement_balance(&app, profile.id).await, stock);
        });
    }
}
