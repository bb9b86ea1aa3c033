//! Database entities for the production backend.

pub mod material;
pub mod notification_outbox;
pub mod production_batch;
pub mod production_issue;
pub mod production_material;
pub mod production_order;
pub mod production_order_item;
pub mod production_timeline;
pub mod sequence_counter;
pub mod stock_movement;
pub mod warehouse_delivery;
pub mod window;
