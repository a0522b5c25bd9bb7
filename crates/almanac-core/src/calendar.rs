use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::identity::OccurrenceId;
use crate::models::{
    shift_instant, ExpansionConfig, Occurrence, ReminderTrigger, SeriesSnapshot, TimeWindow,
};
use crate::query::{CalendarPage, CalendarQuery, EventFilter, SeriesFailure};
use crate::recurrence::RuleEvaluator;
use crate::reminders::ReminderAttacher;
use crate::repository::EventStore;
use crate::resolver::{sort_occurrences, ExceptionResolver};

/// A reminder trigger together with the occurrence it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingReminder {
    pub occurrence_id: OccurrenceId,
    pub event_id: Uuid,
    pub title: String,
    pub occurrence_start: DateTime<Utc>,
    pub trigger: ReminderTrigger,
}

/// Read side: loads the series visible to a user and materializes their
/// occurrences for a window.
///
/// # Pipeline
/// For each series: [`RuleEvaluator`] produces candidates, [`ExceptionResolver`]
/// applies stored exceptions, [`ReminderAttacher`] adds triggers. The results of
/// all series are merged into one list sorted by effective start.
///
/// # Failures
/// A series that fails to expand (for instance a corrupt stored rule) is left
/// out and reported in [`CalendarPage::failures`]. Exceeding the per-series or
/// per-query bound fails the whole query with [`CoreError::WindowTooLarge`].
pub struct CalendarQueryService<'a, S: EventStore + ?Sized> {
    store: &'a S,
    evaluator: RuleEvaluator,
    config: ExpansionConfig,
}

impl<'a, S: EventStore + ?Sized> CalendarQueryService<'a, S> {
    pub fn new(store: &'a S, config: ExpansionConfig) -> Self {
        Self {
            store,
            evaluator: RuleEvaluator::new(config.max_candidates_per_series),
            config,
        }
    }

    #[tracing::instrument(skip(self, query), fields(user_id = %query.user_id))]
    pub async fn query(&self, query: &CalendarQuery) -> Result<CalendarPage, CoreError> {
        let series = self
            .store
            .find_series_in_window(query.user_id, &query.window, &query.filter)
            .await?;

        let (occurrences, failures) = self.expand_all(&series, &query.window)?;
        let total = occurrences.len();
        let occurrences = match query.page {
            Some(page) => page.apply(occurrences),
            None => occurrences,
        };

        tracing::debug!(
            series = series.len(),
            window_hours = query.window.span().num_hours(),
            total,
            returned = occurrences.len(),
            failed = failures.len(),
            "calendar query"
        );

        Ok(CalendarPage {
            occurrences,
            total,
            failures,
        })
    }

    /// Resolved occurrences of a single series, with reminders.
    pub async fn series_occurrences(
        &self,
        event_id: Uuid,
        window: &TimeWindow,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let series = self
            .store
            .find_series(event_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event with id {} not found", event_id)))?;
        self.expand_series(&series, window)
    }

    /// Pure expansion of one snapshot: candidates, exceptions, then reminders.
    pub fn expand_series(
        &self,
        series: &SeriesSnapshot,
        window: &TimeWindow,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let resolved = ExceptionResolver::new(&self.evaluator).resolve_series(series, window)?;
        Ok(ReminderAttacher::attach_all(resolved, &series.reminders))
    }

    fn expand_all(
        &self,
        series: &[SeriesSnapshot],
        window: &TimeWindow,
    ) -> Result<(Vec<Occurrence>, Vec<SeriesFailure>), CoreError> {
        let limit = self.config.max_occurrences_per_query;
        let mut occurrences = Vec::new();
        let mut failures = Vec::new();

        for snapshot in series {
            match self.expand_series(snapshot, window) {
                Ok(expanded) => occurrences.extend(expanded),
                // A series over its own bound is over the query bound too, unless
                // max_candidates_per_series is configured below max_occurrences_per_query.
                Err(err @ CoreError::WindowTooLarge { .. }) => return Err(err),
                Err(err) => {
                    tracing::warn!(event_id = %snapshot.event.id, error = %err, "series expansion failed");
                    failures.push(SeriesFailure {
                        event_id: snapshot.event.id,
                        message: err.to_string(),
                    });
                }
            }

            if occurrences.len() > limit {
                return Err(CoreError::WindowTooLarge {
                    produced: occurrences.len(),
                    limit,
                });
            }
        }

        sort_occurrences(&mut occurrences);
        Ok((occurrences, failures))
    }

    /// Reminder triggers firing in `[now, now + horizon)`, earliest first.
    ///
    /// Occurrences are expanded far enough past the horizon to catch the
    /// longest allowed lead time.
    #[tracing::instrument(skip(self))]
    pub async fn upcoming_reminders(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        horizon: Duration,
    ) -> Result<Vec<UpcomingReminder>, CoreError> {
        let trigger_window = TimeWindow::starting_at(now, horizon)?;
        let occurrence_window = TimeWindow::new(
            now,
            shift_instant(
                trigger_window.end,
                Duration::minutes(i64::from(self.config.max_reminder_minutes)),
            )?,
        )?;

        let series = self
            .store
            .find_series_in_window(user_id, &occurrence_window, &EventFilter::default())
            .await?;
        let (occurrences, failures) = self.expand_all(&series, &occurrence_window)?;
        if !failures.is_empty() {
            tracing::warn!(failed = failures.len(), "some series were skipped");
        }

        let mut upcoming: Vec<UpcomingReminder> = occurrences
            .into_iter()
            .flat_map(|occurrence| {
                let Occurrence {
                    id,
                    event_id,
                    title,
                    start_at,
                    reminders,
                    ..
                } = occurrence;
                reminders
                    .into_iter()
                    .filter(|trigger| trigger_window.contains(trigger.trigger_at))
                    .map(move |trigger| UpcomingReminder {
                        occurrence_id: id,
                        event_id,
                        title: title.clone(),
                        occurrence_start: start_at,
                        trigger,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        upcoming.sort_by(|a, b| {
            a.trigger
                .trigger_at
                .cmp(&b.trigger.trigger_at)
                .then_with(|| a.occurrence_id.cmp(&b.occurrence_id))
        });
        Ok(upcoming)
    }
}
