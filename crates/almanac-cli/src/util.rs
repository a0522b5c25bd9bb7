use almanac_core::error::CoreError;
use almanac_core::identity::OccurrenceId;
use anyhow::{anyhow, Result};
use chrono::Duration;
use uuid::Uuid;

use crate::config::Config;

pub fn parse_id(input: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).map_err(|_| {
        anyhow!(CoreError::InvalidInput(format!(
            "'{}' is not a valid {} id",
            input, what
        )))
    })
}

pub fn parse_occurrence_id(input: &str) -> Result<OccurrenceId> {
    Ok(OccurrenceId::parse(input)?)
}

/// The `--user` flag wins over the configured default.
pub fn resolve_user(flag: Option<&str>, config: &Config) -> Result<Uuid> {
    match flag {
        Some(user) => parse_id(user, "user"),
        None => Ok(config.default_user),
    }
}

pub fn days(amount: i64) -> Result<Duration> {
    span(Duration::try_days(amount), amount, "days")
}

pub fn hours(amount: i64) -> Result<Duration> {
    span(Duration::try_hours(amount), amount, "hours")
}

fn span(duration: Option<Duration>, amount: i64, unit: &str) -> Result<Duration> {
    duration.ok_or_else(|| {
        anyhow!(CoreError::InvalidInput(format!(
            "{} {} is out of range",
            amount, unit
        )))
    })
}

/// Shortens an id for tables, like `git` does for hashes.
pub fn short_id(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}
