//! Transactional orchestration over the domain layer.
//!
//! Every state-changing method opens one database transaction, asks
//! `crate::domain` whether the change is legal, writes the affected rows,
//! timeline entries and outbox notifications through that transaction and
//! commits once. In-process events are published only after the commit.

pub mod batches;
pub mod deliveries;
pub mod inventory_ledger;
pub mod issues;
pub mod production_orders;
pub(crate) mod timeline;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::events::{Event, EventSender};

pub use batches::BatchService;
pub use deliveries::DeliveryService;
pub use inventory_ledger::InventoryLedgerService;
pub use issues::IssueService;
pub use production_orders::ProductionOrderService;

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }
}

/// Sends post-commit events in order.
pub(crate) async fn publish(sender: &Option<EventSender>, events: Vec<Event>) {
    if let Some(sender) = sender {
        for event in events {
            sender.send_or_log(event).await;
        }
    }
}

/// Future-date guard shared by confirm, delay and update.
pub(crate) fn ensure_future(
    field: &str,
    at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), crate::errors::ServiceError> {
    if at <= now {
        return Err(crate::errors::ServiceError::ValidationError(format!(
            "{} must be in the future",
            field
        )));
    }
    Ok(())
}

/// Rejects blank free-text fields that the operation requires.
pub(crate) fn require_text(field: &str, value: &str) -> Result<(), crate::errors::ServiceError> {
    if value.trim().is_empty() {
        return Err(crate::errors::ServiceError::InvalidInput(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<u8> = Page {
            items: vec![],
            total: 41,
            page: 1,
            per_page: 20,
        };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn future_guard_rejects_now() {
        let now = Utc::now();
        assert!(ensure_future("date", now, now).is_err());
        assert!(ensure_future("date", now + Duration::minutes(1), now).is_ok());
    }
}
