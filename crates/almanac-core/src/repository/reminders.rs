use crate::error::CoreError;
use crate::models::{EventReminder, NewReminder};
use crate::repository::SqliteEventStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

#[async_trait]
impl super::ReminderRepository for SqliteEventStore {
    async fn add_reminder(&self, event_id: Uuid, data: NewReminder) -> Result<EventReminder, CoreError> {
        let reminder = EventReminder {
            id: Uuid::now_v7(),
            event_id,
            minutes_before: data.minutes_before,
            method: data.method,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO event_reminders (id, event_id, minutes_before, method, created_at)
            VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(reminder.id)
        .bind(reminder.event_id)
        .bind(reminder.minutes_before)
        .bind(reminder.method)
        .bind(reminder.created_at)
        .execute(self.pool())
        .await?;

        Ok(reminder)
    }

    async fn find_reminders(&self, event_id: Uuid) -> Result<Vec<EventReminder>, CoreError> {
        let reminders = sqlx::query_as(
            "SELECT * FROM event_reminders WHERE event_id = $1 ORDER BY minutes_before DESC, id",
        )
        .bind(event_id)
        .fetch_all(self.pool())
        .await?;
        Ok(reminders)
    }

    async fn find_reminder_by_id(&self, id: Uuid) -> Result<Option<EventReminder>, CoreError> {
        let reminder = sqlx::query_as("SELECT * FROM event_reminders WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(reminder)
    }

    async fn remove_reminder(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM event_reminders WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Reminder with id {} not found", id)));
        }

        Ok(())
    }
}

impl SqliteEventStore {
    pub(crate) async fn find_reminders_in_transaction(
        tx: &mut Transaction<'_, Sqlite>,
        event_id: Uuid,
    ) -> Result<Vec<EventReminder>, CoreError> {
        let reminders = sqlx::query_as(
            "SELECT * FROM event_reminders WHERE event_id = $1 ORDER BY minutes_before DESC, id",
        )
        .bind(event_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(reminders)
    }
}
