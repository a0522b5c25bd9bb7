use chrono::Duration;

use crate::models::{EventReminder, Occurrence, ReminderTrigger};

/// Computes reminder triggers for resolved occurrences.
///
/// Runs after exception resolution, so a moved occurrence's reminders follow
/// its effective start rather than the original slot.
pub struct ReminderAttacher;

impl ReminderAttacher {
    pub fn trigger_for(occurrence: &Occurrence, reminder: &EventReminder) -> ReminderTrigger {
        ReminderTrigger {
            reminder_id: reminder.id,
            method: reminder.method,
            minutes_before: reminder.minutes_before,
            trigger_at: occurrence.start_at - Duration::minutes(i64::from(reminder.minutes_before)),
        }
    }

    /// Returns the occurrence with one trigger per reminder, ordered by trigger time.
    pub fn attach(mut occurrence: Occurrence, reminders: &[EventReminder]) -> Occurrence {
        let mut triggers: Vec<ReminderTrigger> = reminders
            .iter()
            .map(|reminder| Self::trigger_for(&occurrence, reminder))
            .collect();
        triggers.sort_by(|a, b| {
            a.trigger_at
                .cmp(&b.trigger_at)
                .then_with(|| a.reminder_id.cmp(&b.reminder_id))
        });
        occurrence.reminders = triggers;
        occurrence
    }

    pub fn attach_all(occurrences: Vec<Occurrence>, reminders: &[EventReminder]) -> Vec<Occurrence> {
        occurrences
            .into_iter()
            .map(|occurrence| Self::attach(occurrence, reminders))
            .collect()
    }
}
