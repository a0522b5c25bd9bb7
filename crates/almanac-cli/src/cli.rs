use almanac_core::models::{Frequency, ReminderMethod};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// A calendar for recurring events with per-occurrence edits and reminders
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Act as this user instead of the configured default
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage event series
    Event(EventCommand),
    /// Show occurrences in a time window
    Agenda(AgendaCommand),
    /// Edit, cancel or restore a single occurrence
    Occurrence(OccurrenceCommand),
    /// Manage reminders
    Reminder(ReminderCommand),
}

// ========== Events ==========

#[derive(Parser, Debug, Clone)]
pub struct EventCommand {
    #[command(subcommand)]
    pub command: EventSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EventSubcommand {
    /// Create an event, optionally recurring
    Add(EventAddCommand),
    /// Edit a whole series
    Edit(EventEditCommand),
    /// Delete a series with all its exceptions and reminders
    Delete(EventDeleteCommand),
    /// Show a series, its exceptions and its next occurrences
    Show(EventShowCommand),
}

/// Recurrence fields shared by `event add` and `event edit`.
#[derive(Args, Debug, Clone, Default)]
pub struct RecurrenceArgs {
    /// How often the event repeats
    #[arg(long, value_enum)]
    pub every: Option<RecurrenceShortcut>,
    /// Repeat every N periods
    #[arg(long)]
    pub interval: Option<i32>,
    /// Days of week (mon,tue,wed,thu,fri,sat,sun)
    #[arg(long)]
    pub on: Option<String>,
    /// Months of the year (1-12, comma separated)
    #[arg(long)]
    pub months: Option<String>,
    /// Days of the month (1-31 or -1 for the last day, comma separated)
    #[arg(long, allow_hyphen_values = true)]
    pub month_days: Option<String>,
    /// Maximum number of occurrences
    #[arg(long)]
    pub count: Option<i32>,
    /// Last possible occurrence (e.g., '2025-12-31')
    #[arg(long)]
    pub until: Option<String>,
}

impl RecurrenceArgs {
    pub fn is_empty(&self) -> bool {
        self.every.is_none()
            && self.interval.is_none()
            && self.on.is_none()
            && self.months.is_none()
            && self.month_days.is_none()
            && self.count.is_none()
            && self.until.is_none()
    }
}

#[derive(Parser, Debug, Clone)]
pub struct EventAddCommand {
    /// The title of the event
    pub title: String,
    /// Start time (e.g., '2024-01-01 09:00', 'tomorrow 9am')
    #[arg(long, short)]
    pub start: String,
    /// End time; defaults to start plus --duration
    #[arg(long, short, conflicts_with = "duration")]
    pub end: Option<String>,
    /// Length in minutes when --end is not given
    #[arg(long, default_value = "60")]
    pub duration: i64,
    #[arg(long)]
    pub all_day: bool,
    #[arg(long, short)]
    pub description: Option<String>,
    #[arg(long, short)]
    pub location: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    /// Do not block time on the calendar
    #[arg(long)]
    pub free: bool,
    /// Event type label, usable as an agenda filter
    #[arg(long = "type")]
    pub event_type: Option<String>,
    /// Project id, usable as an agenda filter
    #[arg(long)]
    pub project: Option<String>,
    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
    /// Add a reminder N minutes before each occurrence (repeatable)
    #[arg(long)]
    pub remind: Vec<i32>,
}

#[derive(Parser, Debug, Clone)]
pub struct EventEditCommand {
    /// The event id
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub all_day: Option<bool>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long)]
    pub location: Option<String>,
    #[arg(long, conflicts_with = "location")]
    pub location_clear: bool,

    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, conflicts_with = "color")]
    pub color_clear: bool,

    #[arg(long, conflicts_with = "busy")]
    pub free: bool,
    #[arg(long)]
    pub busy: bool,

    #[arg(long = "type")]
    pub event_type: Option<String>,
    #[arg(long, conflicts_with = "event_type")]
    pub type_clear: bool,

    #[arg(long)]
    pub project: Option<String>,
    #[arg(long, conflicts_with = "project")]
    pub project_clear: bool,

    #[command(flatten)]
    pub recurrence: RecurrenceArgs,
    /// Remove recurrence (convert to a one-time event)
    #[arg(long, conflicts_with_all = ["every", "interval", "on", "months", "month_days", "count", "until"])]
    pub recurrence_clear: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct EventDeleteCommand {
    /// The event id
    pub id: String,
    /// Force deletion without confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct EventShowCommand {
    /// The event id
    pub id: String,
    /// Number of upcoming occurrences to list
    #[arg(long, short, default_value = "5")]
    pub next: usize,
}

// ========== Agenda ==========

#[derive(Parser, Debug, Clone)]
pub struct AgendaCommand {
    /// Window start; defaults to the start of today
    #[arg(long)]
    pub from: Option<String>,
    /// Window end (exclusive)
    #[arg(long, conflicts_with = "days")]
    pub to: Option<String>,
    /// Window length in days; defaults to the configured agenda length
    #[arg(long)]
    pub days: Option<i64>,
    /// Only events with this type label
    #[arg(long = "type")]
    pub event_type: Option<String>,
    /// Only events of this project
    #[arg(long)]
    pub project: Option<String>,
    /// Skip this many occurrences
    #[arg(long, default_value = "0")]
    pub offset: usize,
    /// Show at most this many occurrences
    #[arg(long)]
    pub limit: Option<usize>,
}

// ========== Occurrences ==========

#[derive(Parser, Debug, Clone)]
pub struct OccurrenceCommand {
    #[command(subcommand)]
    pub command: OccurrenceSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum OccurrenceSubcommand {
    /// Override fields of one occurrence; unset fields follow the series
    Edit(OccurrenceEditCommand),
    /// Cancel one occurrence
    Delete(OccurrenceTargetCommand),
    /// Drop any edit or cancellation of one occurrence
    Restore(OccurrenceTargetCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct OccurrenceEditCommand {
    /// Occurrence id as printed by `agenda`
    pub id: String,
    #[arg(long)]
    pub start: Option<String>,
    #[arg(long)]
    pub end: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long, conflicts_with = "busy")]
    pub free: bool,
    #[arg(long)]
    pub busy: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct OccurrenceTargetCommand {
    /// Occurrence id as printed by `agenda`
    pub id: String,
}

// ========== Reminders ==========

#[derive(Parser, Debug, Clone)]
pub struct ReminderCommand {
    #[command(subcommand)]
    pub command: ReminderSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReminderSubcommand {
    /// Attach a reminder to every occurrence of a series
    Add(ReminderAddCommand),
    /// Remove a reminder
    Remove(ReminderRemoveCommand),
    /// List reminders that fire soon
    Upcoming(ReminderUpcomingCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ReminderAddCommand {
    /// The event id
    pub event_id: String,
    /// Minutes before each occurrence
    #[arg(long, short)]
    pub minutes: i32,
    #[arg(long, value_enum, default_value = "notification")]
    pub method: MethodArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ReminderRemoveCommand {
    /// The reminder id
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ReminderUpcomingCommand {
    /// How far ahead to look, in hours
    #[arg(long, default_value = "24")]
    pub hours: i64,
}

/// Human-friendly recurrence patterns
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceShortcut {
    /// Every day
    Daily,
    /// Every week (same day)
    Weekly,
    /// Every other week
    Biweekly,
    /// Every month (same date)
    Monthly,
    /// Every year (same date)
    Yearly,
    /// Monday to Friday
    Weekdays,
}

impl From<RecurrenceShortcut> for Frequency {
    fn from(shortcut: RecurrenceShortcut) -> Self {
        match shortcut {
            RecurrenceShortcut::Daily => Frequency::Daily,
            RecurrenceShortcut::Weekly => Frequency::Weekly,
            RecurrenceShortcut::Biweekly => Frequency::Biweekly,
            RecurrenceShortcut::Monthly => Frequency::Monthly,
            RecurrenceShortcut::Yearly => Frequency::Yearly,
            RecurrenceShortcut::Weekdays => Frequency::Custom,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    Notification,
    Email,
    Popup,
}

impl From<MethodArg> for ReminderMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Notification => ReminderMethod::Notification,
            MethodArg::Email => ReminderMethod::Email,
            MethodArg::Popup => ReminderMethod::Popup,
        }
    }
}
