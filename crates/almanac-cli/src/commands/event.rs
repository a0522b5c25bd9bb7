use almanac_core::calendar::CalendarQueryService;
use almanac_core::coordinator::EventMutationCoordinator;
use almanac_core::error::CoreError;
use almanac_core::models::{
    NewEventData, NewReminder, RecurrenceRule, ReminderMethod, TimeWindow, Transparency,
    UpdateEventData,
};
use almanac_core::repository::EventStore;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use dialoguer::Confirm;
use owo_colors::{OwoColorize, Style};
use uuid::Uuid;

use crate::cli::{
    EventAddCommand, EventDeleteCommand, EventEditCommand, EventShowCommand, RecurrenceArgs,
};
use crate::config::Config;
use crate::parser::{parse_datetime, parse_numbers, parse_weekdays};
use crate::util::parse_id;
use crate::views::table;

/// How far ahead `event show` looks for upcoming occurrences.
const SHOW_LOOKAHEAD_DAYS: i64 = 366;

pub async fn add_event(
    store: &impl EventStore,
    config: &Config,
    user_id: Uuid,
    command: EventAddCommand,
) -> Result<()> {
    let now = Utc::now();
    let start_at = parse_datetime(&command.start, now)?;
    let end_at = match &command.end {
        Some(end) => parse_datetime(end, now)?,
        None => start_at + Duration::minutes(command.duration),
    };

    let mut data = NewEventData::new(user_id, command.title, start_at, end_at);
    data.description = command.description;
    data.all_day = command.all_day;
    data.location = command.location;
    data.color = command.color;
    if command.free {
        data.transparency = Transparency::Transparent;
    }
    data.event_type = command.event_type;
    data.project_id = command
        .project
        .as_deref()
        .map(|p| parse_id(p, "project"))
        .transpose()?;
    data.rule = build_rule(&command.recurrence, None, now)?;

    let coordinator = EventMutationCoordinator::new(store, config.expansion());
    let series = coordinator.create_series(data).await?;
    for minutes_before in command.remind {
        coordinator
            .add_reminder(
                series.event.id,
                NewReminder {
                    minutes_before,
                    method: ReminderMethod::Notification,
                },
            )
            .await?;
    }

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    let kind = if series.is_recurring() {
        "recurring event"
    } else {
        "event"
    };
    println!(
        "{} Created {}: {}",
        "✓".style(success_style),
        kind,
        series.event.title.bright_white().bold()
    );
    println!(
        "  {} Event ID: {}",
        "→".style(info_style),
        series.event.id.to_string().yellow()
    );
    println!(
        "  {} Repeats: {}",
        "→".style(info_style),
        table::describe_rule(series.rule.as_ref())
    );
    Ok(())
}

pub async fn edit_event(
    store: &impl EventStore,
    config: &Config,
    command: EventEditCommand,
) -> Result<()> {
    let now = Utc::now();
    let event_id = parse_id(&command.id, "event")?;
    let coordinator = EventMutationCoordinator::new(store, config.expansion());

    let rule = if command.recurrence_clear {
        Some(None)
    } else if command.recurrence.is_empty() {
        None
    } else {
        let current = coordinator.get_series(event_id).await?;
        Some(build_rule(&command.recurrence, current.rule, now)?)
    };

    let transparency = if command.free {
        Some(Transparency::Transparent)
    } else if command.busy {
        Some(Transparency::Opaque)
    } else {
        None
    };

    let project_id = if command.project_clear {
        Some(None)
    } else {
        command
            .project
            .as_deref()
            .map(|p| parse_id(p, "project").map(Some))
            .transpose()?
    };

    let patch = UpdateEventData {
        title: command.title,
        description: clearable(command.description, command.description_clear),
        start_at: command
            .start
            .as_deref()
            .map(|s| parse_datetime(s, now))
            .transpose()?,
        end_at: command
            .end
            .as_deref()
            .map(|s| parse_datetime(s, now))
            .transpose()?,
        all_day: command.all_day,
        location: clearable(command.location, command.location_clear),
        color: clearable(command.color, command.color_clear),
        transparency,
        event_type: clearable(command.event_type, command.type_clear),
        project_id,
        rule,
    };

    let series = coordinator.update_series(event_id, patch).await?;
    println!("Updated event: {}", series.event.title);
    println!("  Repeats: {}", table::describe_rule(series.rule.as_ref()));
    if !series.exceptions.is_empty() {
        println!(
            "  {} occurrence edit(s) kept",
            series.exceptions.len().to_string().yellow()
        );
    }
    Ok(())
}

pub async fn delete_event(
    store: &impl EventStore,
    config: &Config,
    command: EventDeleteCommand,
) -> Result<()> {
    let event_id = parse_id(&command.id, "event")?;
    let coordinator = EventMutationCoordinator::new(store, config.expansion());
    let series = coordinator.get_series(event_id).await?;

    if !command.force {
        let prompt = if series.is_recurring() {
            format!(
                "Delete '{}' and every occurrence of it?",
                series.event.title
            )
        } else {
            format!("Delete '{}'?", series.event.title)
        };
        let confirmation = Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    coordinator.delete_series(event_id).await?;
    println!("Deleted event: {}", series.event.title);
    Ok(())
}

pub async fn show_event(
    store: &impl EventStore,
    config: &Config,
    command: EventShowCommand,
) -> Result<()> {
    let event_id = parse_id(&command.id, "event")?;
    let coordinator = EventMutationCoordinator::new(store, config.expansion());
    let series = coordinator.get_series(event_id).await?;

    table::display_series(&series);
    table::display_exceptions(&series.exceptions);
    table::display_reminders(&series.reminders);

    if command.next == 0 {
        return Ok(());
    }

    let now = Utc::now();
    let from = now.max(series.event.start_at);
    let window = TimeWindow::new(from, from + Duration::days(SHOW_LOOKAHEAD_DAYS))?;
    let service = CalendarQueryService::new(store, config.expansion());
    let mut occurrences = match service.expand_series(&series, &window) {
        Ok(occurrences) => occurrences,
        Err(CoreError::WindowTooLarge { .. }) => {
            return Err(anyhow!(
                "'{}' repeats too often to preview; use `almanac agenda` with a narrower window",
                series.event.title
            ))
        }
        Err(e) => return Err(e.into()),
    };
    occurrences.truncate(command.next);

    println!("\n{}", "Next occurrences:".bold());
    table::display_occurrences(&occurrences, now);
    Ok(())
}

fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

/// Builds a rule from the recurrence flags.
///
/// With `--every` the flags describe a fresh rule. Without it they adjust
/// `base`, so `event edit <id> --count 3` keeps the existing cadence.
pub fn build_rule(
    args: &RecurrenceArgs,
    base: Option<RecurrenceRule>,
    now: DateTime<Utc>,
) -> Result<Option<RecurrenceRule>> {
    if args.is_empty() {
        return Ok(base);
    }

    let mut rule = match (args.every, base) {
        (Some(shortcut), _) => RecurrenceRule::new(shortcut.into()),
        (None, Some(base)) if base.frequency.is_periodic() => base,
        (None, _) => {
            return Err(CoreError::InvalidInput(
                "--every is required to make an event repeat".to_string(),
            )
            .into())
        }
    };

    if let Some(interval) = args.interval {
        rule.interval = interval;
    }
    if let Some(on) = &args.on {
        rule.by_weekday = parse_weekdays(on)?;
    }
    if let Some(months) = &args.months {
        rule.by_month = parse_numbers(months, "month")?;
    }
    if let Some(days) = &args.month_days {
        rule.by_month_day = parse_numbers(days, "day of month")?;
    }
    if let Some(count) = args.count {
        rule.count = Some(count);
    }
    if let Some(until) = &args.until {
        rule.until = Some(parse_datetime(until, now)?);
    }
    Ok(Some(rule))
}
