use almanac_core::coordinator::EventMutationCoordinator;
use almanac_core::error::CoreError;
use almanac_core::models::{OccurrenceOverride, Transparency};
use almanac_core::repository::EventStore;
use anyhow::Result;
use chrono::Utc;
use owo_colors::OwoColorize;

use crate::cli::{OccurrenceEditCommand, OccurrenceTargetCommand};
use crate::config::Config;
use crate::parser::parse_datetime;
use crate::util::parse_occurrence_id;

pub async fn edit_occurrence(
    store: &impl EventStore,
    config: &Config,
    command: OccurrenceEditCommand,
) -> Result<()> {
    let now = Utc::now();
    let id = parse_occurrence_id(&command.id)?;

    let fields = OccurrenceOverride {
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
        title: command.title,
        description: command.description,
        location: command.location,
        color: command.color,
        transparency: if command.free {
            Some(Transparency::Transparent)
        } else if command.busy {
            Some(Transparency::Opaque)
        } else {
            None
        },
    };
    if fields.is_empty() {
        return Err(CoreError::InvalidInput(
            "nothing to change; pass at least one field".to_string(),
        )
        .into());
    }

    let coordinator = EventMutationCoordinator::new(store, config.expansion());
    let stored = coordinator.update_occurrence(id, fields).await?;
    println!(
        "Edited occurrence {} of event {}",
        stored.original_time.format("%Y-%m-%d %H:%M"),
        stored.event_id
    );
    if let Some(start_at) = stored.start_at {
        println!("  Moved to {}", start_at.format("%Y-%m-%d %H:%M").cyan());
    }
    Ok(())
}

pub async fn delete_occurrence(
    store: &impl EventStore,
    config: &Config,
    command: OccurrenceTargetCommand,
) -> Result<()> {
    let id = parse_occurrence_id(&command.id)?;
    let coordinator = EventMutationCoordinator::new(store, config.expansion());

    match coordinator.delete_occurrence(id).await? {
        Some(stored) => println!(
            "Cancelled occurrence {} of event {}",
            stored.original_time.format("%Y-%m-%d %H:%M"),
            stored.event_id
        ),
        None => println!(
            "{} Event {} has no occurrence at that time; nothing to cancel.",
            "Note:".yellow(),
            id.event_id
        ),
    }
    Ok(())
}

pub async fn restore_occurrence(
    store: &impl EventStore,
    config: &Config,
    command: OccurrenceTargetCommand,
) -> Result<()> {
    let id = parse_occurrence_id(&command.id)?;
    let coordinator = EventMutationCoordinator::new(store, config.expansion());

    if coordinator.restore_occurrence(id).await? {
        println!("Restored occurrence {}", id);
    } else {
        println!("Occurrence {} already follows its series.", id);
    }
    Ok(())
}
