use chrono::{DateTime, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;
use crate::identity::OccurrenceId;

// ============================================================================
// Enumerations
// ============================================================================

/// Whether an event blocks time on the owner's calendar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Transparency {
    #[default]
    Opaque,
    Transparent,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid transparency: {0}")]
pub struct ParseTransparencyError(String);

impl FromStr for Transparency {
    type Err = ParseTransparencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opaque" | "busy" => Ok(Transparency::Opaque),
            "transparent" | "free" => Ok(Transparency::Transparent),
            _ => Err(ParseTransparencyError(s.to_string())),
        }
    }
}

/// Recurrence cadence of a series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    None,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Yearly,
    /// Weekday cadence: every day except Saturday and Sunday.
    Custom,
}

impl Frequency {
    pub fn is_periodic(&self) -> bool {
        !matches!(self, Frequency::None)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::None => write!(f, "none"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Biweekly => write!(f, "biweekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Yearly => write!(f, "yearly"),
            Frequency::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Frequency::None),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" => Ok(Frequency::Biweekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            "custom" | "weekdays" => Ok(Frequency::Custom),
            _ => Err(CoreError::InvalidRule(format!("unknown frequency '{}'", s))),
        }
    }
}

/// How a reminder reaches the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    #[default]
    Notification,
    Email,
    Popup,
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid reminder method: {0}")]
pub struct ParseReminderMethodError(String);

impl FromStr for ReminderMethod {
    type Err = ParseReminderMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notification" => Ok(ReminderMethod::Notification),
            "email" => Ok(ReminderMethod::Email),
            "popup" => Ok(ReminderMethod::Popup),
            _ => Err(ParseReminderMethodError(s.to_string())),
        }
    }
}

impl std::fmt::Display for ReminderMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderMethod::Notification => write!(f, "notification"),
            ReminderMethod::Email => write!(f, "email"),
            ReminderMethod::Popup => write!(f, "popup"),
        }
    }
}

// ============================================================================
// Series
// ============================================================================

/// Root of a series. Exists independently of any recurrence rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Anchor start; the first candidate of a recurring series.
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    pub color: Option<String>,
    pub transparency: Transparency,
    pub event_type: Option<String>,
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn duration(&self) -> Duration {
        self.end_at - self.start_at
    }
}

/// Recurrence rule of an event. At most one per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: i32,
    pub by_weekday: Vec<Weekday>,
    pub by_month: Vec<u32>,
    pub by_month_day: Vec<i32>,
    pub count: Option<i32>,
    pub until: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            by_weekday: Vec::new(),
            by_month: Vec::new(),
            by_month_day: Vec::new(),
            count: None,
            until: None,
        }
    }

    pub fn every(mut self, interval: i32) -> Self {
        self.interval = interval;
        self
    }

    pub fn on_weekdays(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.by_weekday = days.into_iter().collect();
        self
    }

    pub fn in_months(mut self, months: impl IntoIterator<Item = u32>) -> Self {
        self.by_month = months.into_iter().collect();
        self
    }

    pub fn on_month_days(mut self, days: impl IntoIterator<Item = i32>) -> Self {
        self.by_month_day = days.into_iter().collect();
        self
    }

    pub fn with_count(mut self, count: i32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }

    /// Checks the rule against the anchor it will be evaluated from.
    ///
    /// Besides field checks, the rule must produce at least one occurrence.
    pub fn validate(&self, anchor: DateTime<Utc>) -> Result<(), CoreError> {
        crate::recurrence::RuleEvaluator::validate_rule(self, anchor)?;
        if self.frequency.is_periodic()
            && crate::recurrence::RuleEvaluator::first_occurrence(self, anchor)?.is_none()
        {
            return Err(CoreError::InvalidRule(
                "the rule never produces an occurrence".to_string(),
            ));
        }
        Ok(())
    }
}

/// Two-letter RFC 5545 weekday token.
pub fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Parses an RFC 5545 token ("MO") or an English day name ("monday", "mon").
pub fn parse_weekday(s: &str) -> Result<Weekday, CoreError> {
    match s.trim().to_lowercase().as_str() {
        "mo" | "mon" | "monday" => Ok(Weekday::Mon),
        "tu" | "tue" | "tuesday" => Ok(Weekday::Tue),
        "we" | "wed" | "wednesday" => Ok(Weekday::Wed),
        "th" | "thu" | "thursday" => Ok(Weekday::Thu),
        "fr" | "fri" | "friday" => Ok(Weekday::Fri),
        "sa" | "sat" | "saturday" => Ok(Weekday::Sat),
        "su" | "sun" | "sunday" => Ok(Weekday::Sun),
        other => Err(CoreError::InvalidRule(format!("unknown weekday '{}'", other))),
    }
}

/// A stored override or cancellation of one occurrence, keyed by its original instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EventException {
    pub event_id: Uuid,
    /// Un-overridden instant of the occurrence. Never rewritten.
    pub original_time: DateTime<Utc>,
    pub is_deleted: bool,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub transparency: Option<Transparency>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventException {
    pub fn occurrence_id(&self) -> OccurrenceId {
        OccurrenceId::new(self.event_id, self.original_time)
    }
}

/// Override fields for a single occurrence. Unset fields inherit from the series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceOverride {
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color: Option<String>,
    pub transparency: Option<Transparency>,
}

impl OccurrenceOverride {
    pub fn is_empty(&self) -> bool {
        self == &OccurrenceOverride::default()
    }
}

/// Reminder definition attached to a series; applies to every occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EventReminder {
    pub id: Uuid,
    pub event_id: Uuid,
    pub minutes_before: i32,
    pub method: ReminderMethod,
    pub created_at: DateTime<Utc>,
}

/// A series read in one consistent snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub event: Event,
    pub rule: Option<RecurrenceRule>,
    pub exceptions: Vec<EventException>,
    pub reminders: Vec<EventReminder>,
}

impl SeriesSnapshot {
    pub fn is_recurring(&self) -> bool {
        self.rule.as_ref().is_some_and(|r| r.frequency.is_periodic())
    }
}

// ============================================================================
// Data Transfer Objects
// ============================================================================

/// Data required to create a new series.
#[derive(Debug, Clone)]
pub struct NewEventData {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub location: Option<String>,
    pub color: Option<String>,
    pub transparency: Transparency,
    pub event_type: Option<String>,
    pub project_id: Option<Uuid>,
    pub rule: Option<RecurrenceRule>,
}

impl NewEventData {
    pub fn new(user_id: Uuid, title: impl Into<String>, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            title: title.into(),
            description: None,
            start_at,
            end_at,
            all_day: false,
            location: None,
            color: None,
            transparency: Transparency::Opaque,
            event_type: None,
            project_id: None,
            rule: None,
        }
    }
}

/// Whole-series edit. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct UpdateEventData {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub location: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub transparency: Option<Transparency>,
    pub event_type: Option<Option<String>>,
    pub project_id: Option<Option<Uuid>>,
    /// `Some(None)` removes the recurrence, turning the series into a single event.
    pub rule: Option<Option<RecurrenceRule>>,
}

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub minutes_before: i32,
    pub method: ReminderMethod,
}

// ============================================================================
// Materialized occurrences
// ============================================================================

/// When a reminder fires for one occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTrigger {
    pub reminder_id: Uuid,
    pub method: ReminderMethod,
    pub minutes_before: i32,
    pub trigger_at: DateTime<Utc>,
}

/// One concrete instance of a series. Virtual unless an exception exists for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: OccurrenceId,
    pub event_id: Uuid,
    /// Slot the occurrence would have had without any exception.
    pub original_start: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub all_day: bool,
    pub location: Option<String>,
    pub color: Option<String>,
    pub transparency: Transparency,
    pub event_type: Option<String>,
    pub project_id: Option<Uuid>,
    pub is_recurring: bool,
    pub is_exception: bool,
    pub reminders: Vec<ReminderTrigger>,
}

/// Half-open `[start, end)` range of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoreError> {
        if end <= start {
            return Err(CoreError::InvalidInput(format!(
                "window end {} must be after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// The window `[start, start + span)`.
    pub fn starting_at(start: DateTime<Utc>, span: Duration) -> Result<Self, CoreError> {
        Self::new(start, shift_instant(start, span)?)
    }
}

/// `instant + delta`, or `InvalidInput` when the result is out of range.
pub fn shift_instant(instant: DateTime<Utc>, delta: Duration) -> Result<DateTime<Utc>, CoreError> {
    instant.checked_add_signed(delta).ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "{} shifted by {} is outside the supported range",
            instant, delta
        ))
    })
}

/// Drops sub-second precision so identifiers round-trip exactly.
pub fn truncate_to_seconds(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.with_nanosecond(0).unwrap_or(instant)
}

/// Configuration for expansion behavior - core version.
/// This is separate from the CLI config to allow for type differences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionConfig {
    /// Hard cap on occurrences materialized by one query
    pub max_occurrences_per_query: usize,
    /// Hard cap on candidates a single series may produce inside one window
    pub max_candidates_per_series: usize,
    /// Largest accepted reminder lead time
    pub max_reminder_minutes: i32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_occurrences_per_query: 5000,
            max_candidates_per_series: 5000,
            max_reminder_minutes: 40320,
        }
    }
}
