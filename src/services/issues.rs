use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::production_orders::find_order;
use super::publish;
use crate::{
    clock::SharedClock,
    domain::{issue, IssueStatus},
    entities::production_issue::{self, Entity as IssueEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct IssueUpdate {
    pub status: IssueStatus,
    #[validate(length(max = 2000))]
    pub resolution_notes: Option<String>,
}

/// Follow-up on reported production issues. Reporting lives on
/// [`super::ProductionOrderService::report_issue`] because it can hold the order.
#[derive(Clone)]
pub struct IssueService {
    db: Arc<DatabaseConnection>,
    clock: SharedClock,
    event_sender: Option<EventSender>,
}

impl IssueService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: SharedClock,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            db,
            clock,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, issue_id: Uuid) -> Result<production_issue::Model, ServiceError> {
        IssueEntity::find_by_id(issue_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Issue {} not found", issue_id)))
    }

    /// Issues of an order, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<production_issue::Model>, ServiceError> {
        let order = find_order(&*self.db, order_id).await?;
        IssueEntity::find()
            .filter(production_issue::Column::ProductionOrderId.eq(order.id))
            .order_by_desc(production_issue::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Moves an issue along. Resolving it records who and when; a held order
    /// is not resumed automatically.
    #[instrument(skip(self, input), fields(target = %input.status))]
    pub async fn update_status(
        &self,
        issue_id: Uuid,
        input: IssueUpdate,
        user_id: Uuid,
    ) -> Result<production_issue::Model, ServiceError> {
        input.validate()?;
        let now = self.clock.now();
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let current = IssueEntity::find_by_id(issue_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Issue {} not found", issue_id)))?;
        let next = issue::plan_issue_update(current.status, input.status)?;

        let mut active: production_issue::ActiveModel = current.into();
        active.status = Set(next);
        if let Some(notes) = input.resolution_notes {
            active.resolution_notes = Set(Some(notes));
        }
        if next == IssueStatus::Resolved {
            active.resolved_by = Set(Some(user_id));
            active.resolved_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        publish(
            &self.event_sender,
            vec![Event::ProductionIssueUpdated {
                issue_id: updated.id,
                status: updated.status.to_string(),
            }],
        )
        .await;
        info!(issue_id = %updated.id, status = %updated.status, "Production issue updated");
        Ok(updated)
    }
}
