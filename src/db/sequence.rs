//! Gap-tolerant, collision-free document numbering.
//!
//! Each scope owns one row in `sequence_counters`. Incrementing it inside the
//! caller's transaction locks the row until commit, so concurrent allocators
//! for the same scope serialize and never observe the same value.

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::sequence_counter::{self, Entity as SequenceCounter};
use crate::errors::ServiceError;

/// Allocates the next value of `scope`, starting at 1.
pub async fn next_value<C>(conn: &C, scope: &str) -> Result<i64, ServiceError>
where
    C: ConnectionTrait,
{
    if !increment(conn, scope).await? {
        let inserted = SequenceCounter::insert(sequence_counter::ActiveModel {
            scope: Set(scope.to_string()),
            value: Set(1),
        })
        .on_conflict(
            OnConflict::column(sequence_counter::Column::Scope)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(ServiceError::db_error)?;

        if inserted == 1 {
            return Ok(1);
        }
        // another allocator created the row first
        if !increment(conn, scope).await? {
            return Err(ServiceError::ConcurrencyConflict(format!(
                "sequence {} could not be allocated",
                scope
            )));
        }
    }

    SequenceCounter::find_by_id(scope.to_string())
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|row| row.value)
        .ok_or_else(|| ServiceError::InternalError(format!("sequence {} vanished", scope)))
}

async fn increment<C>(conn: &C, scope: &str) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let result = SequenceCounter::update_many()
        .col_expr(
            sequence_counter::Column::Value,
            Expr::col(sequence_counter::Column::Value).add(1),
        )
        .filter(sequence_counter::Column::Scope.eq(scope))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(result.rows_affected > 0)
}
