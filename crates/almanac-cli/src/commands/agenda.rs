use almanac_core::calendar::CalendarQueryService;
use almanac_core::models::{shift_instant, TimeWindow};
use almanac_core::query::{CalendarQuery, EventFilter, Page};
use almanac_core::repository::EventStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cli::AgendaCommand;
use crate::config::Config;
use crate::parser::parse_datetime;
use crate::util::{days, parse_id};
use crate::views::table;

pub async fn show_agenda(
    store: &impl EventStore,
    config: &Config,
    user_id: Uuid,
    command: AgendaCommand,
) -> Result<()> {
    let now = Utc::now();
    let window = agenda_window(&command, config, now)?;

    let filter = EventFilter {
        event_type: command.event_type,
        project_id: command
            .project
            .as_deref()
            .map(|p| parse_id(p, "project"))
            .transpose()?,
    };
    let mut query = CalendarQuery::new(user_id, window).with_filter(filter);
    if command.offset > 0 || command.limit.is_some() {
        query = query.with_page(Page::new(
            command.offset,
            command.limit.unwrap_or(usize::MAX),
        ));
    }

    let service = CalendarQueryService::new(store, config.expansion());
    let page = service.query(&query).await?;

    println!(
        "Agenda {} to {}",
        window.start.format("%Y-%m-%d %H:%M"),
        window.end.format("%Y-%m-%d %H:%M")
    );
    table::display_occurrences(&page.occurrences, now);
    if page.occurrences.len() < page.total {
        println!(
            "Showing {} of {} occurrences.",
            page.occurrences.len(),
            page.total
        );
    }
    table::display_failures(&page.failures);
    Ok(())
}

/// `--from` defaults to the start of today; the end comes from `--to`,
/// `--days` or the configured agenda length, in that order.
fn agenda_window(
    command: &AgendaCommand,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<TimeWindow> {
    let start = match &command.from {
        Some(from) => parse_datetime(from, now)?,
        None => start_of_day(now),
    };
    let end = match (&command.to, command.days) {
        (Some(to), _) => parse_datetime(to, now)?,
        (None, Some(count)) => shift_instant(start, days(count)?)?,
        (None, None) => shift_instant(start, days(config.agenda_days)?)?,
    };
    Ok(TimeWindow::new(start, end)?)
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}
