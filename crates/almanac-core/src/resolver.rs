//! Merges stored per-occurrence exceptions onto the candidate sequence.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::error::CoreError;
use crate::identity::OccurrenceId;
use crate::models::{EventException, Occurrence, SeriesSnapshot, TimeWindow};
use crate::recurrence::RuleEvaluator;

/// Turns one series snapshot into its resolved occurrences for a window.
///
/// Exceptions are matched on `original_time`. A deleted exception removes its
/// candidate, an override replaces the fields it sets and keeps the identity of
/// the original slot. Exceptions that moved an occurrence into the window from
/// a slot outside of it are found by scanning exceptions directly.
pub struct ExceptionResolver<'a> {
    evaluator: &'a RuleEvaluator,
}

impl<'a> ExceptionResolver<'a> {
    pub fn new(evaluator: &'a RuleEvaluator) -> Self {
        Self { evaluator }
    }

    /// Expands and resolves a series. Reminders are left empty.
    pub fn resolve_series(
        &self,
        series: &SeriesSnapshot,
        window: &TimeWindow,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let candidates = self
            .evaluator
            .expand(series.event.start_at, series.rule.as_ref(), window)?;
        self.resolve(series, &candidates, window)
    }

    /// Applies the series' exceptions to an already expanded candidate list.
    pub fn resolve(
        &self,
        series: &SeriesSnapshot,
        candidates: &[DateTime<Utc>],
        window: &TimeWindow,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let by_original: HashMap<DateTime<Utc>, &EventException> = series
            .exceptions
            .iter()
            .map(|ex| (ex.original_time, ex))
            .collect();

        let mut occurrences = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match by_original.get(candidate) {
                None => occurrences.push(materialize(series, *candidate, None)),
                Some(ex) if ex.is_deleted => continue,
                Some(ex) => {
                    let occurrence = materialize(series, *candidate, Some(ex));
                    if window.contains(occurrence.start_at) {
                        occurrences.push(occurrence);
                    }
                }
            }
        }

        // Occurrences moved in from a slot outside the window.
        for ex in &series.exceptions {
            if ex.is_deleted || window.contains(ex.original_time) {
                continue;
            }
            let Some(moved_to) = ex.start_at else {
                continue;
            };
            if !window.contains(moved_to) {
                continue;
            }
            if self
                .evaluator
                .occurs_at(series.event.start_at, series.rule.as_ref(), ex.original_time)?
            {
                occurrences.push(materialize(series, ex.original_time, Some(ex)));
            } else {
                tracing::debug!(
                    event_id = %ex.event_id,
                    original_time = %ex.original_time,
                    "ignoring stale exception"
                );
            }
        }

        sort_occurrences(&mut occurrences);
        Ok(occurrences)
    }
}

/// Orders by effective start, then event id, then original slot.
pub fn sort_occurrences(occurrences: &mut [Occurrence]) {
    occurrences.sort_by(|a, b| {
        a.start_at
            .cmp(&b.start_at)
            .then_with(|| a.event_id.cmp(&b.event_id))
            .then_with(|| a.original_start.cmp(&b.original_start))
    });
}

fn materialize(
    series: &SeriesSnapshot,
    original: DateTime<Utc>,
    exception: Option<&EventException>,
) -> Occurrence {
    let event = &series.event;
    let is_recurring = series.is_recurring();
    let id = if is_recurring {
        OccurrenceId::new(event.id, original)
    } else {
        OccurrenceId::for_event(event.id)
    };

    let mut occurrence = Occurrence {
        id,
        event_id: event.id,
        original_start: original,
        start_at: original,
        end_at: original + event.duration(),
        title: event.title.clone(),
        description: event.description.clone(),
        all_day: event.all_day,
        location: event.location.clone(),
        color: event.color.clone(),
        transparency: event.transparency,
        event_type: event.event_type.clone(),
        project_id: event.project_id,
        is_recurring,
        is_exception: false,
        reminders: Vec::new(),
    };

    if let Some(ex) = exception {
        occurrence.is_exception = true;
        if let Some(start) = ex.start_at {
            occurrence.start_at = start;
        }
        occurrence.end_at = ex
            .end_at
            .unwrap_or_else(|| occurrence.start_at + event.duration());
        if let Some(title) = &ex.title {
            occurrence.title = title.clone();
        }
        if ex.description.is_some() {
            occurrence.description = ex.description.clone();
        }
        if ex.location.is_some() {
            occurrence.location = ex.location.clone();
        }
        if ex.color.is_some() {
            occurrence.color = ex.color.clone();
        }
        if let Some(transparency) = ex.transparency {
            occurrence.transparency = transparency;
        }
    }

    occurrence
}
