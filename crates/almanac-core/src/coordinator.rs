//! Write side: whole-series and single-occurrence mutations.
//!
//! Series edits rewrite the event row and its rule. Occurrence edits never touch
//! the series; they upsert a row in the exception table keyed by the original
//! slot, so every operation here is safe to retry.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::identity::OccurrenceId;
use crate::models::{
    shift_instant, truncate_to_seconds, Event, EventException, EventReminder, ExpansionConfig,
    NewEventData, NewReminder, OccurrenceOverride, RecurrenceRule, SeriesSnapshot,
    UpdateEventData,
};
use crate::recurrence::RuleEvaluator;
use crate::repository::EventStore;

pub struct EventMutationCoordinator<'a, S: EventStore + ?Sized> {
    store: &'a S,
    evaluator: RuleEvaluator,
    config: ExpansionConfig,
}

impl<'a, S: EventStore + ?Sized> EventMutationCoordinator<'a, S> {
    pub fn new(store: &'a S, config: ExpansionConfig) -> Self {
        Self {
            store,
            evaluator: RuleEvaluator::new(config.max_candidates_per_series),
            config,
        }
    }

    /// Creates an event together with its optional rule.
    #[tracing::instrument(skip(self, data), fields(user_id = %data.user_id))]
    pub async fn create_series(&self, data: NewEventData) -> Result<SeriesSnapshot, CoreError> {
        let mut data = data;
        data.title = validate_title(&data.title)?;
        data.start_at = truncate_to_seconds(data.start_at);
        data.end_at = truncate_to_seconds(data.end_at);
        validate_span(data.start_at, data.end_at)?;
        data.rule = data.rule.map(normalize_rule);
        if let Some(rule) = &data.rule {
            rule.validate(data.start_at)?;
        }

        let rule = data.rule.clone();
        let event = self.store.add_event(data).await?;
        tracing::info!(event_id = %event.id, recurring = rule.is_some(), "created series");

        Ok(SeriesSnapshot {
            event,
            rule,
            exceptions: Vec::new(),
            reminders: Vec::new(),
        })
    }

    /// Applies a whole-series edit. Existing exceptions are kept.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_series(
        &self,
        event_id: Uuid,
        patch: UpdateEventData,
    ) -> Result<SeriesSnapshot, CoreError> {
        let current = self.get_series(event_id).await?;
        let mut event = current.event;

        if let Some(title) = patch.title {
            event.title = validate_title(&title)?;
        }
        if let Some(description) = patch.description {
            event.description = description;
        }
        if let Some(start_at) = patch.start_at {
            let duration = event.duration();
            event.start_at = truncate_to_seconds(start_at);
            if patch.end_at.is_none() {
                event.end_at = shift_instant(event.start_at, duration)?;
            }
        }
        if let Some(end_at) = patch.end_at {
            event.end_at = truncate_to_seconds(end_at);
        }
        if let Some(all_day) = patch.all_day {
            event.all_day = all_day;
        }
        if let Some(location) = patch.location {
            event.location = location;
        }
        if let Some(color) = patch.color {
            event.color = color;
        }
        if let Some(transparency) = patch.transparency {
            event.transparency = transparency;
        }
        if let Some(event_type) = patch.event_type {
            event.event_type = event_type;
        }
        if let Some(project_id) = patch.project_id {
            event.project_id = project_id;
        }
        validate_span(event.start_at, event.end_at)?;

        let rule_change = patch.rule.map(|rule| rule.map(normalize_rule));
        let effective_rule = match &rule_change {
            Some(rule) => rule.as_ref(),
            None => current.rule.as_ref(),
        };
        if let Some(rule) = effective_rule {
            rule.validate(event.start_at)?;
        }

        let event = self.store.update_event(event, rule_change).await?;
        tracing::info!(event_id = %event.id, "updated series");

        self.get_series(event.id).await
    }

    /// Deletes the event and everything attached to it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_series(&self, event_id: Uuid) -> Result<(), CoreError> {
        self.store.delete_event(event_id).await?;
        tracing::info!(%event_id, "deleted series");
        Ok(())
    }

    /// Stores `fields` as the override of one occurrence, replacing any previous
    /// override and clearing an earlier deletion.
    #[tracing::instrument(skip(self, fields), fields(occurrence = %id))]
    pub async fn update_occurrence(
        &self,
        id: OccurrenceId,
        fields: OccurrenceOverride,
    ) -> Result<EventException, CoreError> {
        let series = self.get_series(id.event_id).await?;
        let original = truncate_to_seconds(id.original_time_or(series.event.start_at));

        if !self.is_slot(&series, original)? {
            return Err(CoreError::NotFound(format!(
                "Event {} has no occurrence at {}",
                id.event_id, original
            )));
        }

        let mut fields = fields;
        fields.start_at = fields.start_at.map(truncate_to_seconds);
        fields.end_at = fields.end_at.map(truncate_to_seconds);
        if let Some(title) = &fields.title {
            fields.title = Some(validate_title(title)?);
        }
        let start = fields.start_at.unwrap_or(original);
        let end = match fields.end_at {
            Some(end) => end,
            None => shift_instant(start, series.event.duration())?,
        };
        validate_span(start, end)?;

        let stored = self
            .store
            .upsert_exception(id.event_id, original, false, fields)
            .await?;
        tracing::info!(event_id = %id.event_id, %original, "overrode occurrence");
        Ok(stored)
    }

    /// Cancels one occurrence. Any earlier override is discarded.
    ///
    /// Returns `None` when the instant is not a slot of the current rule; that
    /// case is a successful no-op so retries of stale requests do not fail.
    #[tracing::instrument(skip(self), fields(occurrence = %id))]
    pub async fn delete_occurrence(&self, id: OccurrenceId) -> Result<Option<EventException>, CoreError> {
        let series = self.get_series(id.event_id).await?;
        let original = truncate_to_seconds(id.original_time_or(series.event.start_at));

        if !self.is_slot(&series, original)? {
            tracing::debug!(event_id = %id.event_id, %original, "no occurrence to delete");
            return Ok(None);
        }

        let stored = self
            .store
            .upsert_exception(id.event_id, original, true, OccurrenceOverride::default())
            .await?;
        tracing::info!(event_id = %id.event_id, %original, "deleted occurrence");
        Ok(Some(stored))
    }

    /// Drops the exception for one occurrence so it follows the series again.
    /// Returns whether an exception existed.
    #[tracing::instrument(skip(self), fields(occurrence = %id))]
    pub async fn restore_occurrence(&self, id: OccurrenceId) -> Result<bool, CoreError> {
        let event = self.require_event(id.event_id).await?;
        let original = truncate_to_seconds(id.original_time_or(event.start_at));
        let removed = self.store.remove_exception(id.event_id, original).await?;
        if removed {
            tracing::info!(event_id = %id.event_id, %original, "restored occurrence");
        }
        Ok(removed)
    }

    #[tracing::instrument(skip(self, data))]
    pub async fn add_reminder(&self, event_id: Uuid, data: NewReminder) -> Result<EventReminder, CoreError> {
        if !(0..=self.config.max_reminder_minutes).contains(&data.minutes_before) {
            return Err(CoreError::InvalidInput(format!(
                "minutes_before must be between 0 and {}, got {}",
                self.config.max_reminder_minutes, data.minutes_before
            )));
        }
        self.require_event(event_id).await?;

        let reminder = self.store.add_reminder(event_id, data).await?;
        tracing::info!(%event_id, reminder_id = %reminder.id, "added reminder");
        Ok(reminder)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_reminder(&self, reminder_id: Uuid) -> Result<(), CoreError> {
        self.store.remove_reminder(reminder_id).await?;
        tracing::info!(%reminder_id, "removed reminder");
        Ok(())
    }

    pub async fn list_exceptions(&self, event_id: Uuid) -> Result<Vec<EventException>, CoreError> {
        self.require_event(event_id).await?;
        self.store.find_exceptions(event_id).await
    }

    pub async fn list_reminders(&self, event_id: Uuid) -> Result<Vec<EventReminder>, CoreError> {
        self.require_event(event_id).await?;
        self.store.find_reminders(event_id).await
    }

    pub async fn get_series(&self, event_id: Uuid) -> Result<SeriesSnapshot, CoreError> {
        self.store
            .find_series(event_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", event_id)))
    }

    async fn require_event(&self, event_id: Uuid) -> Result<Event, CoreError> {
        self.store
            .find_event_by_id(event_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", event_id)))
    }

    fn is_slot(&self, series: &SeriesSnapshot, original: DateTime<Utc>) -> Result<bool, CoreError> {
        self.evaluator
            .occurs_at(series.event.start_at, series.rule.as_ref(), original)
    }
}

fn validate_title(title: &str) -> Result<String, CoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CoreError::InvalidInput("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

fn validate_span(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), CoreError> {
    if end < start {
        return Err(CoreError::InvalidInput(format!(
            "end {} is before start {}",
            end, start
        )));
    }
    Ok(())
}

fn normalize_rule(mut rule: RecurrenceRule) -> RecurrenceRule {
    rule.until = rule.until.map(truncate_to_seconds);
    rule
}
