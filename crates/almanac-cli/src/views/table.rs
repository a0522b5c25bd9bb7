use almanac_core::calendar::UpcomingReminder;
use almanac_core::models::{
    weekday_code, EventException, EventReminder, Frequency, Occurrence, RecurrenceRule,
    SeriesSnapshot, Transparency,
};
use almanac_core::query::SeriesFailure;
use chrono::{DateTime, Utc};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};
use owo_colors::OwoColorize;

use crate::util::short_id;

const TIME_FORMAT: &str = "%a %Y-%m-%d %H:%M";

pub fn display_occurrences(occurrences: &[Occurrence], now: DateTime<Utc>) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Occurrence", "When", "Title", "Location", "Reminders"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        row.add_cell(Cell::new(occurrence.id.to_string()));

        let when = if occurrence.all_day {
            format!("{} (all day)", occurrence.start_at.format("%a %Y-%m-%d"))
        } else {
            format!(
                "{} - {}",
                occurrence.start_at.format(TIME_FORMAT),
                occurrence.end_at.format("%H:%M")
            )
        };
        let when_cell = if occurrence.end_at <= now {
            Cell::new(when).fg(Color::DarkGrey)
        } else if occurrence.start_at <= now {
            Cell::new(when).fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            Cell::new(when)
        };
        row.add_cell(when_cell);

        let mut title = String::new();
        if occurrence.is_recurring {
            title.push('↻');
            title.push(' ');
        }
        title.push_str(&occurrence.title);
        if occurrence.is_exception {
            title.push_str(" (edited)");
        }
        let mut title_cell = Cell::new(title);
        if occurrence.transparency == Transparency::Transparent {
            title_cell = title_cell.add_attribute(Attribute::Italic);
        }
        if occurrence.is_exception {
            title_cell = title_cell.fg(Color::Yellow);
        }
        row.add_cell(title_cell);

        row.add_cell(Cell::new(occurrence.location.as_deref().unwrap_or("")));

        let reminders = occurrence
            .reminders
            .iter()
            .map(|r| format!("{}m {}", r.minutes_before, r.method))
            .collect::<Vec<_>>()
            .join(", ");
        row.add_cell(Cell::new(reminders));

        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_failures(failures: &[SeriesFailure]) {
    for failure in failures {
        eprintln!(
            "{} series {} was skipped: {}",
            "Warning:".yellow().bold(),
            failure.event_id,
            failure.message
        );
    }
}

pub fn describe_rule(rule: Option<&RecurrenceRule>) -> String {
    let rule = match rule {
        Some(rule) if rule.frequency.is_periodic() => rule,
        _ => return "does not repeat".to_string(),
    };

    let cadence = match (rule.frequency, rule.interval) {
        (Frequency::Custom, 1) => "every weekday".to_string(),
        (Frequency::Custom, n) => format!("every {} days, weekdays only", n),
        (Frequency::Biweekly, 1) => "every other week".to_string(),
        (Frequency::Biweekly, n) => format!("every {} weeks", n * 2),
        (freq, 1) => freq.to_string(),
        (freq, n) => format!("{} (every {})", freq, n),
    };

    let mut parts = vec![cadence];
    if !rule.by_weekday.is_empty() {
        let days: Vec<&str> = rule.by_weekday.iter().map(|d| weekday_code(*d)).collect();
        parts.push(format!("on {}", days.join(",")));
    }
    if !rule.by_month.is_empty() {
        let months: Vec<String> = rule.by_month.iter().map(ToString::to_string).collect();
        parts.push(format!("in months {}", months.join(",")));
    }
    if !rule.by_month_day.is_empty() {
        let days: Vec<String> = rule.by_month_day.iter().map(ToString::to_string).collect();
        parts.push(format!("on days {}", days.join(",")));
    }
    if let Some(count) = rule.count {
        parts.push(format!("{} times", count));
    }
    if let Some(until) = rule.until {
        parts.push(format!("until {}", until.format(TIME_FORMAT)));
    }
    if !rule.is_bounded() {
        parts.push("no end date".to_string());
    }
    parts.join(", ")
}

pub fn display_series(series: &SeriesSnapshot) {
    let event = &series.event;
    println!("{} {}", event.title.bold(), format!("({})", event.id).dimmed());
    println!(
        "  {} {} - {}",
        "When:".bold(),
        event.start_at.format(TIME_FORMAT),
        event.end_at.format(TIME_FORMAT)
    );
    println!("  {} {}", "Repeats:".bold(), describe_rule(series.rule.as_ref()));
    if let Some(description) = &event.description {
        println!("  {} {}", "Description:".bold(), description);
    }
    if let Some(location) = &event.location {
        println!("  {} {}", "Location:".bold(), location);
    }
    if let Some(event_type) = &event.event_type {
        println!("  {} {}", "Type:".bold(), event_type);
    }
    if let Some(project_id) = &event.project_id {
        println!("  {} {}", "Project:".bold(), project_id);
    }
    if event.transparency == Transparency::Transparent {
        println!("  {} free", "Shows as:".bold());
    }
    println!("  {} {}", "Updated:".bold(), event.updated_at.humanize());
}

pub fn display_exceptions(exceptions: &[EventException]) {
    if exceptions.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Occurrence", "Original", "Change", "Moved To", "Title"]);

    for exception in exceptions {
        let mut row = Row::new();
        row.add_cell(Cell::new(exception.occurrence_id().to_string()));
        row.add_cell(Cell::new(exception.original_time.format(TIME_FORMAT)));
        if exception.is_deleted {
            row.add_cell(Cell::new("cancelled").fg(Color::Red));
        } else {
            row.add_cell(Cell::new("edited").fg(Color::Yellow));
        }
        row.add_cell(Cell::new(
            exception
                .start_at
                .map(|s| s.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
        ));
        row.add_cell(Cell::new(exception.title.as_deref().unwrap_or("")));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_reminders(reminders: &[EventReminder]) {
    if reminders.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Reminder", "Before", "Method"]);

    for reminder in reminders {
        let mut row = Row::new();
        row.add_cell(Cell::new(reminder.id.to_string()));
        row.add_cell(Cell::new(format!("{} min", reminder.minutes_before)));
        row.add_cell(Cell::new(reminder.method.to_string()));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_upcoming(upcoming: &[UpcomingReminder]) {
    if upcoming.is_empty() {
        println!("No upcoming reminders.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Fires", "Method", "Event", "Starts"]);

    for item in upcoming {
        let mut row = Row::new();
        row.add_cell(Cell::new(format!(
            "{} ({})",
            item.trigger.trigger_at.format(TIME_FORMAT),
            item.trigger.trigger_at.humanize()
        )));
        row.add_cell(Cell::new(item.trigger.method.to_string()));
        row.add_cell(Cell::new(format!("{} [{}]", item.title, short_id(&item.event_id))));
        row.add_cell(Cell::new(item.occurrence_start.format(TIME_FORMAT)));
        table.add_row(row);
    }

    println!("{table}");
}
