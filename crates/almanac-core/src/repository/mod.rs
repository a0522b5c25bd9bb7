use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    parse_weekday, weekday_code, Event, EventException, EventReminder, Frequency, NewEventData,
    NewReminder, OccurrenceOverride, RecurrenceRule, SeriesSnapshot, TimeWindow,
};
use crate::query::EventFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

pub mod events;
pub mod exceptions;
pub mod reminders;

/// Storage shape of a recurrence rule. Filter sets are comma-separated tokens.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct RuleRow {
    pub event_id: Uuid,
    pub frequency: Frequency,
    pub repeat_interval: i32,
    pub by_weekday: Option<String>,
    pub by_month: Option<String>,
    pub by_month_day: Option<String>,
    pub occurrence_count: Option<i32>,
    pub until_at: Option<DateTime<Utc>>,
}

impl RuleRow {
    pub(crate) fn from_rule(event_id: Uuid, rule: &RecurrenceRule) -> Self {
        Self {
            event_id,
            frequency: rule.frequency,
            repeat_interval: rule.interval,
            by_weekday: join_tokens(rule.by_weekday.iter().map(|d| weekday_code(*d).to_string())),
            by_month: join_tokens(rule.by_month.iter().map(ToString::to_string)),
            by_month_day: join_tokens(rule.by_month_day.iter().map(ToString::to_string)),
            occurrence_count: rule.count,
            until_at: rule.until,
        }
    }

    pub(crate) fn into_rule(self) -> Result<RecurrenceRule, CoreError> {
        let by_weekday = split_tokens(self.by_weekday.as_deref())
            .map(parse_weekday)
            .collect::<Result<Vec<_>, _>>()?;
        let by_month = parse_list::<u32>(self.by_month.as_deref(), self.event_id)?;
        let by_month_day = parse_list::<i32>(self.by_month_day.as_deref(), self.event_id)?;

        Ok(RecurrenceRule {
            frequency: self.frequency,
            interval: self.repeat_interval,
            by_weekday,
            by_month,
            by_month_day,
            count: self.occurrence_count,
            until: self.until_at,
        })
    }
}

fn join_tokens(tokens: impl Iterator<Item = String>) -> Option<String> {
    let joined = tokens.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn split_tokens(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn parse_list<T: FromStr>(raw: Option<&str>, event_id: Uuid) -> Result<Vec<T>, CoreError> {
    split_tokens(raw)
        .map(|token| {
            token.parse::<T>().map_err(|_| {
                CoreError::InvalidRule(format!(
                    "stored rule for event {} has an unreadable value '{}'",
                    event_id, token
                ))
            })
        })
        .collect()
}

/// Series roots and their recurrence rules.
#[async_trait]
pub trait EventRepository {
    /// Inserts the event and its rule in one transaction.
    async fn add_event(&self, data: NewEventData) -> Result<Event, CoreError>;
    async fn find_event_by_id(&self, id: Uuid) -> Result<Option<Event>, CoreError>;
    async fn find_rule(&self, event_id: Uuid) -> Result<Option<RecurrenceRule>, CoreError>;
    /// Event, rule, exceptions and reminders read in one transaction.
    async fn find_series(&self, event_id: Uuid) -> Result<Option<SeriesSnapshot>, CoreError>;
    /// Every series of `user_id` that may contribute an occurrence to `window`.
    async fn find_series_in_window(
        &self,
        user_id: Uuid,
        window: &TimeWindow,
        filter: &EventFilter,
    ) -> Result<Vec<SeriesSnapshot>, CoreError>;
    /// Writes the event row and, when `rule` is `Some`, replaces or removes its rule.
    async fn update_event(
        &self,
        event: Event,
        rule: Option<Option<RecurrenceRule>>,
    ) -> Result<Event, CoreError>;
    /// Removes the event with its rule, exceptions and reminders.
    async fn delete_event(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Per-occurrence overrides keyed by `(event_id, original_time)`.
#[async_trait]
pub trait ExceptionRepository {
    async fn find_exceptions(&self, event_id: Uuid) -> Result<Vec<EventException>, CoreError>;
    async fn find_exception(
        &self,
        event_id: Uuid,
        original_time: DateTime<Utc>,
    ) -> Result<Option<EventException>, CoreError>;
    /// Inserts or overwrites the exception and returns the stored row.
    async fn upsert_exception(
        &self,
        event_id: Uuid,
        original_time: DateTime<Utc>,
        is_deleted: bool,
        fields: OccurrenceOverride,
    ) -> Result<EventException, CoreError>;
    /// Returns whether a row was removed.
    async fn remove_exception(&self, event_id: Uuid, original_time: DateTime<Utc>) -> Result<bool, CoreError>;
}

#[async_trait]
pub trait ReminderRepository {
    async fn add_reminder(&self, event_id: Uuid, data: NewReminder) -> Result<EventReminder, CoreError>;
    async fn find_reminders(&self, event_id: Uuid) -> Result<Vec<EventReminder>, CoreError>;
    async fn find_reminder_by_id(&self, id: Uuid) -> Result<Option<EventReminder>, CoreError>;
    async fn remove_reminder(&self, id: Uuid) -> Result<(), CoreError>;
}

/// The event store consumed by the coordinator and the query service.
#[async_trait]
pub trait EventStore: EventRepository + ExceptionRepository + ReminderRepository + Send + Sync {}

/// SQLite implementation of the event store.
#[derive(Debug, Clone)]
pub struct SqliteEventStore {
    pool: DbPool,
}

impl SqliteEventStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl EventStore for SqliteEventStore {}
