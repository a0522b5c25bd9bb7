//! Addressing for virtual occurrences.
//!
//! An occurrence has no row of its own until it is overridden, so its identity is
//! derived from the owning event and the instant the rule originally placed it at.
//! The textual form is `<event uuid>_<YYYYMMDDTHHMMSSZ>`, or just `<event uuid>` for
//! the single occurrence of a non-recurring event.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

const INSTANT_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct OccurrenceId {
    pub event_id: Uuid,
    /// `None` only for the single occurrence of a non-recurring event.
    pub original_time: Option<DateTime<Utc>>,
}

impl OccurrenceId {
    pub fn new(event_id: Uuid, original_time: DateTime<Utc>) -> Self {
        Self {
            event_id,
            original_time: Some(original_time),
        }
    }

    /// Identity that collapses to the event row itself.
    pub fn for_event(event_id: Uuid) -> Self {
        Self {
            event_id,
            original_time: None,
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        s.parse()
    }

    /// The addressed original instant, falling back to the event anchor.
    pub fn original_time_or(&self, anchor: DateTime<Utc>) -> DateTime<Utc> {
        self.original_time.unwrap_or(anchor)
    }
}

impl fmt::Display for OccurrenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.original_time {
            Some(instant) => write!(
                f,
                "{}{}{}",
                self.event_id,
                SEPARATOR,
                instant.format(INSTANT_FORMAT)
            ),
            None => write!(f, "{}", self.event_id),
        }
    }
}

impl FromStr for OccurrenceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (event_part, instant_part) = match s.split_once(SEPARATOR) {
            Some((event, instant)) => (event, Some(instant)),
            None => (s, None),
        };

        let event_id = Uuid::parse_str(event_part).map_err(|_| {
            CoreError::MalformedOccurrenceId(format!("'{}' has no valid event id", s))
        })?;

        let original_time = instant_part.map(parse_instant).transpose().map_err(|_| {
            CoreError::MalformedOccurrenceId(format!("'{}' has no valid instant", s))
        })?;

        Ok(Self {
            event_id,
            original_time,
        })
    }
}

/// Parses the compact instant form used inside occurrence identifiers.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, CoreError> {
    NaiveDateTime::parse_from_str(s, INSTANT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CoreError::InvalidInput(format!("unparsable instant '{}': {}", s, e)))
}
