use crate::error::CoreError;
use crate::models::{EventException, OccurrenceOverride};
use crate::repository::SqliteEventStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::ExceptionRepository for SqliteEventStore {
    async fn find_exceptions(&self, event_id: Uuid) -> Result<Vec<EventException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM event_exceptions WHERE event_id = $1 ORDER BY original_time",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(exceptions)
    }

    async fn find_exception(
        &self,
        event_id: Uuid,
        original_time: DateTime<Utc>,
    ) -> Result<Option<EventException>, CoreError> {
        let exception = sqlx::query_as(
            "SELECT * FROM event_exceptions WHERE event_id = $1 AND original_time = $2",
        )
        .bind(event_id)
        .bind(original_time)
        .fetch_optional(self.pool())
        .await?;
        Ok(exception)
    }

    async fn upsert_exception(
        &self,
        event_id: Uuid,
        original_time: DateTime<Utc>,
        is_deleted: bool,
        fields: OccurrenceOverride,
    ) -> Result<EventException, CoreError> {
        let mut tx = self.pool().begin().await?;
        let now = Utc::now();

        // The unique key arbitrates concurrent writers; `updated_at` only moves
        // when the stored state actually changes.
        sqlx::query(
            r#"INSERT INTO event_exceptions (event_id, original_time, is_deleted, start_at, end_at, title, description, location, color, transparency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            ON CONFLICT (event_id, original_time) DO UPDATE SET
                updated_at = CASE
                    WHEN is_deleted IS excluded.is_deleted
                     AND start_at IS excluded.start_at
                     AND end_at IS excluded.end_at
                     AND title IS excluded.title
                     AND description IS excluded.description
                     AND location IS excluded.location
                     AND color IS excluded.color
                     AND transparency IS excluded.transparency
                    THEN updated_at
                    ELSE excluded.updated_at
                END,
                is_deleted = excluded.is_deleted,
                start_at = excluded.start_at,
                end_at = excluded.end_at,
                title = excluded.title,
                description = excluded.description,
                location = excluded.location,
                color = excluded.color,
                transparency = excluded.transparency"#,
        )
        .bind(event_id)
        .bind(original_time)
        .bind(is_deleted)
        .bind(fields.start_at)
        .bind(fields.end_at)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.location)
        .bind(&fields.color)
        .bind(fields.transparency)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let stored: EventException = sqlx::query_as(
            "SELECT * FROM event_exceptions WHERE event_id = $1 AND original_time = $2",
        )
        .bind(event_id)
        .bind(original_time)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn remove_exception(&self, event_id: Uuid, original_time: DateTime<Utc>) -> Result<bool, CoreError> {
        let result = sqlx::query(
            "DELETE FROM event_exceptions WHERE event_id = $1 AND original_time = $2",
        )
        .bind(event_id)
        .bind(original_time)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl SqliteEventStore {
    pub(crate) async fn find_exceptions_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        event_id: Uuid,
    ) -> Result<Vec<EventException>, CoreError> {
        let exceptions = sqlx::query_as(
            "SELECT * FROM event_exceptions WHERE event_id = $1 ORDER BY original_time",
        )
        .bind(event_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(exceptions)
    }
}
