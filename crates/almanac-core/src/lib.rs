//! # Almanac Core
//!
//! Recurring calendar events with per-occurrence exceptions and reminders.
//!
//! A series is stored once: an event row plus an optional recurrence rule.
//! Occurrences are never pre-generated. Every read expands the rule over the
//! requested window, merges the sparse exception table onto the result and
//! attaches reminder triggers.
//!
//! ## Core Modules
//!
//! - [`db`]: Connection setup and embedded migrations
//! - [`models`]: Series, exceptions, reminders and resolved occurrences
//! - [`identity`]: Stable identifiers for virtual occurrences
//! - [`recurrence`]: Rule validation and candidate expansion
//! - [`resolver`]: Applies exceptions to candidates
//! - [`reminders`]: Reminder trigger computation
//! - [`coordinator`]: Series and occurrence mutations
//! - [`calendar`]: Window queries and upcoming reminders
//! - [`repository`]: The event store and its SQLite implementation
//! - [`error`]: Error type shared by every module
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use almanac_core::{
//!     calendar::CalendarQueryService,
//!     coordinator::EventMutationCoordinator,
//!     db,
//!     models::{ExpansionConfig, Frequency, NewEventData, RecurrenceRule, TimeWindow},
//!     query::CalendarQuery,
//!     repository::SqliteEventStore,
//! };
//! use chrono::{Duration, TimeZone, Utc};
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("calendar.db").await?;
//!     let store = SqliteEventStore::new(pool);
//!     let config = ExpansionConfig::default();
//!
//!     let user = Uuid::now_v7();
//!     let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
//!     let mut data = NewEventData::new(user, "Standup", start, start + Duration::minutes(15));
//!     data.rule = Some(RecurrenceRule::new(Frequency::Weekly).with_count(10));
//!
//!     EventMutationCoordinator::new(&store, config.clone()).create_series(data).await?;
//!
//!     let window = TimeWindow::new(start, start + Duration::days(31))?;
//!     let page = CalendarQueryService::new(&store, config)
//!         .query(&CalendarQuery::new(user, window))
//!         .await?;
//!     println!("{} occurrences", page.total);
//!     Ok(())
//! }
//! ```

pub mod calendar;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod query;
pub mod recurrence;
pub mod reminders;
pub mod repository;
pub mod resolver;
