use almanac_core::calendar::CalendarQueryService;
use almanac_core::coordinator::EventMutationCoordinator;
use almanac_core::models::NewReminder;
use almanac_core::repository::EventStore;
use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::cli::{ReminderAddCommand, ReminderRemoveCommand, ReminderUpcomingCommand};
use crate::config::Config;
use crate::util::{hours, parse_id};
use crate::views::table;

pub async fn add_reminder(
    store: &impl EventStore,
    config: &Config,
    command: ReminderAddCommand,
) -> Result<()> {
    let event_id = parse_id(&command.event_id, "event")?;
    let coordinator = EventMutationCoordinator::new(store, config.expansion());
    let reminder = coordinator
        .add_reminder(
            event_id,
            NewReminder {
                minutes_before: command.minutes,
                method: command.method.into(),
            },
        )
        .await?;

    println!(
        "Added {} reminder {} minutes before each occurrence",
        reminder.method, reminder.minutes_before
    );
    println!("  Reminder ID: {}", reminder.id);
    Ok(())
}

pub async fn remove_reminder(
    store: &impl EventStore,
    config: &Config,
    command: ReminderRemoveCommand,
) -> Result<()> {
    let reminder_id = parse_id(&command.id, "reminder")?;
    EventMutationCoordinator::new(store, config.expansion())
        .remove_reminder(reminder_id)
        .await?;
    println!("Removed reminder {}", reminder_id);
    Ok(())
}

pub async fn upcoming_reminders(
    store: &impl EventStore,
    config: &Config,
    user_id: Uuid,
    command: ReminderUpcomingCommand,
) -> Result<()> {
    let horizon = hours(command.hours)?;
    let upcoming = CalendarQueryService::new(store, config.expansion())
        .upcoming_reminders(user_id, Utc::now(), horizon)
        .await?;
    table::display_upcoming(&upcoming);
    Ok(())
}
