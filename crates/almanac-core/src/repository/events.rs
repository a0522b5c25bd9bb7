use crate::error::CoreError;
use crate::models::{Event, NewEventData, RecurrenceRule, SeriesSnapshot, TimeWindow};
use crate::query::EventFilter;
use crate::repository::{RuleRow, SqliteEventStore};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::EventRepository for SqliteEventStore {
    async fn add_event(&self, data: NewEventData) -> Result<Event, CoreError> {
        let mut tx = self.pool().begin().await?;

        let now = Utc::now();
        let event = Event {
            id: Uuid::now_v7(),
            user_id: data.user_id,
            title: data.title,
            description: data.description,
            start_at: data.start_at,
            end_at: data.end_at,
            all_day: data.all_day,
            location: data.location,
            color: data.color,
            transparency: data.transparency,
            event_type: data.event_type,
            project_id: data.project_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"INSERT INTO events (id, user_id, title, description, start_at, end_at, all_day, location, color, transparency, event_type, project_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(event.all_day)
        .bind(&event.location)
        .bind(&event.color)
        .bind(event.transparency)
        .bind(&event.event_type)
        .bind(event.project_id)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(rule) = &data.rule {
            Self::write_rule_in_transaction(&mut tx, event.id, rule).await?;
        }

        tx.commit().await?;
        Ok(event)
    }

    async fn find_event_by_id(&self, id: Uuid) -> Result<Option<Event>, CoreError> {
        let event = sqlx::query_as("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(event)
    }

    async fn find_rule(&self, event_id: Uuid) -> Result<Option<RecurrenceRule>, CoreError> {
        let row: Option<RuleRow> = sqlx::query_as("SELECT * FROM recurrence_rules WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(RuleRow::into_rule).transpose()
    }

    async fn find_series(&self, event_id: Uuid) -> Result<Option<SeriesSnapshot>, CoreError> {
        let mut tx = self.pool().begin().await?;

        let event: Option<Event> = sqlx::query_as("SELECT * FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;

        let snapshot = match event {
            Some(event) => Some(Self::load_series_in_transaction(&mut tx, event).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(snapshot)
    }

    async fn find_series_in_window(
        &self,
        user_id: Uuid,
        window: &TimeWindow,
        filter: &EventFilter,
    ) -> Result<Vec<SeriesSnapshot>, CoreError> {
        let mut tx = self.pool().begin().await?;

        // A series can contribute when its anchor is in the window, when its rule
        // may still produce candidates there, or when an override moved one in.
        let events: Vec<Event> = sqlx::query_as(
            r#"SELECT e.* FROM events e
            LEFT JOIN recurrence_rules r ON r.event_id = e.id
            WHERE e.user_id = $1
              AND ($4 IS NULL OR e.event_type = $4)
              AND ($5 IS NULL OR e.project_id = $5)
              AND (
                (e.start_at >= $2 AND e.start_at < $3)
                OR (
                  r.frequency IS NOT NULL AND r.frequency != 'none'
                  AND e.start_at < $3
                  AND (r.until_at IS NULL OR r.until_at >= $2)
                )
                OR EXISTS (
                  SELECT 1 FROM event_exceptions x
                  WHERE x.event_id = e.id
                    AND x.is_deleted = 0
                    AND x.start_at >= $2 AND x.start_at < $3
                )
              )
            ORDER BY e.start_at, e.id"#,
        )
        .bind(user_id)
        .bind(window.start)
        .bind(window.end)
        .bind(&filter.event_type)
        .bind(filter.project_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut snapshots = Vec::with_capacity(events.len());
        for event in events {
            snapshots.push(Self::load_series_in_transaction(&mut tx, event).await?);
        }

        tx.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            series = snapshots.len(),
            "loaded series for window"
        );
        Ok(snapshots)
    }

    async fn update_event(
        &self,
        event: Event,
        rule: Option<Option<RecurrenceRule>>,
    ) -> Result<Event, CoreError> {
        let mut tx = self.pool().begin().await?;

        let mut event = event;
        event.updated_at = Utc::now();

        let result = sqlx::query(
            r#"UPDATE events
            SET title = $2, description = $3, start_at = $4, end_at = $5, all_day = $6,
                location = $7, color = $8, transparency = $9, event_type = $10, project_id = $11,
                updated_at = $12
            WHERE id = $1"#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(event.all_day)
        .bind(&event.location)
        .bind(&event.color)
        .bind(event.transparency)
        .bind(&event.event_type)
        .bind(event.project_id)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Event with id {} not found", event.id)));
        }

        match rule {
            Some(Some(rule)) => Self::write_rule_in_transaction(&mut tx, event.id, &rule).await?,
            Some(None) => {
                sqlx::query("DELETE FROM recurrence_rules WHERE event_id = $1")
                    .bind(event.id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {}
        }

        tx.commit().await?;
        Ok(event)
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        // Children first, so the cascade holds even on connections without foreign keys
        for statement in [
            "DELETE FROM event_reminders WHERE event_id = $1",
            "DELETE FROM event_exceptions WHERE event_id = $1",
            "DELETE FROM recurrence_rules WHERE event_id = $1",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Event with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

impl SqliteEventStore {
    pub(crate) async fn write_rule_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        event_id: Uuid,
        rule: &RecurrenceRule,
    ) -> Result<(), CoreError> {
        let row = RuleRow::from_rule(event_id, rule);

        sqlx::query(
            r#"INSERT INTO recurrence_rules (event_id, frequency, repeat_interval, by_weekday, by_month, by_month_day, occurrence_count, until_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_id) DO UPDATE SET
                frequency = excluded.frequency,
                repeat_interval = excluded.repeat_interval,
                by_weekday = excluded.by_weekday,
                by_month = excluded.by_month,
                by_month_day = excluded.by_month_day,
                occurrence_count = excluded.occurrence_count,
                until_at = excluded.until_at"#,
        )
        .bind(row.event_id)
        .bind(row.frequency)
        .bind(row.repeat_interval)
        .bind(&row.by_weekday)
        .bind(&row.by_month)
        .bind(&row.by_month_day)
        .bind(row.occurrence_count)
        .bind(row.until_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub(crate) async fn load_series_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        event: Event,
    ) -> Result<SeriesSnapshot, CoreError> {
        let rule_row: Option<RuleRow> = sqlx::query_as("SELECT * FROM recurrence_rules WHERE event_id = $1")
            .bind(event.id)
            .fetch_optional(&mut **tx)
            .await?;
        let rule = rule_row.map(RuleRow::into_rule).transpose()?;

        let exceptions = Self::find_exceptions_in_transaction(tx, event.id).await?;
        let reminders = Self::find_reminders_in_transaction(tx, event.id).await?;

        Ok(SeriesSnapshot {
            event,
            rule,
            exceptions,
            reminders,
        })
    }
}
