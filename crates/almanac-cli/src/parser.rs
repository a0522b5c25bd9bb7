use almanac_core::identity::parse_instant;
use almanac_core::models::{parse_weekday, truncate_to_seconds};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc, Weekday};
use chrono_english::{parse_date_string, Dialect};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

/// Parses an instant relative to `now`.
///
/// Accepts RFC 3339, the compact `20240101T090000Z` form, `YYYY-MM-DD[ HH:MM[:SS]]`
/// and English expressions such as "tomorrow 9am". Instants are naive UTC.
pub fn parse_datetime(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(truncate_to_seconds(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = parse_instant(input) {
        return Ok(dt);
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    parse_date_string(input, now, Dialect::Us)
        .map(truncate_to_seconds)
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

pub fn parse_weekdays(input: &str) -> Result<Vec<Weekday>> {
    split_list(input)
        .map(|token| parse_weekday(token).map_err(Into::into))
        .collect()
}

pub fn parse_numbers<T>(input: &str, what: &str) -> Result<Vec<T>>
where
    T: std::str::FromStr,
{
    split_list(input)
        .map(|token| {
            token
                .parse::<T>()
                .map_err(|_| anyhow!("Invalid {} '{}'", what, token))
        })
        .collect()
}

fn split_list(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|t| !t.is_empty())
}
