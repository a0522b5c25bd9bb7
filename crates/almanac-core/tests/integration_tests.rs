use almanac_core::calendar::CalendarQueryService;
use almanac_core::coordinator::EventMutationCoordinator;
use almanac_core::db::establish_connection;
use almanac_core::error::CoreError;
use almanac_core::identity::OccurrenceId;
use almanac_core::models::*;
use almanac_core::query::{CalendarQuery, EventFilter, Page};
use almanac_core::repository::{
    EventRepository, ExceptionRepository, ReminderRepository, SqliteEventStore,
};
use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};
use rstest::rstest;
use tempfile::TempDir;
use uuid::Uuid;

/// Helper function to create a test database
async fn setup_test_db() -> (SqliteEventStore, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    (SqliteEventStore::new(pool), temp_dir)
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeWindow {
    TimeWindow::new(start, end).unwrap()
}

fn january() -> TimeWindow {
    window(at(2024, 1, 1, 0), at(2024, 1, 31, 0))
}

/// Weekly standup on Mondays at 09:00 from 2024-01-01 until 2024-01-29.
async fn create_weekly_standup(store: &SqliteEventStore, user_id: Uuid) -> SeriesSnapshot {
    let mut data = NewEventData::new(
        user_id,
        "Standup",
        at(2024, 1, 1, 9),
        at(2024, 1, 1, 9) + Duration::minutes(30),
    );
    data.rule = Some(RecurrenceRule::new(Frequency::Weekly).with_until(at(2024, 1, 29, 9)));

    EventMutationCoordinator::new(store, ExpansionConfig::default())
        .create_series(data)
        .await
        .expect("Failed to create series")
}

async fn query_starts(store: &SqliteEventStore, user_id: Uuid, window: TimeWindow) -> Vec<DateTime<Utc>> {
    CalendarQueryService::new(store, ExpansionConfig::default())
        .query(&CalendarQuery::new(user_id, window))
        .await
        .expect("Query failed")
        .occurrences
        .into_iter()
        .map(|o| o.start_at)
        .collect()
}

#[tokio::test]
async fn test_weekly_until_then_delete_one_occurrence() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;

    let starts = query_starts(&store, user, january()).await;
    assert_eq!(
        starts,
        vec![
            at(2024, 1, 1, 9),
            at(2024, 1, 8, 9),
            at(2024, 1, 15, 9),
            at(2024, 1, 22, 9),
            at(2024, 1, 29, 9),
        ]
    );

    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());
    coordinator
        .delete_occurrence(OccurrenceId::new(series.event.id, at(2024, 1, 15, 9)))
        .await
        .unwrap();

    let starts = query_starts(&store, user, january()).await;
    assert_eq!(
        starts,
        vec![
            at(2024, 1, 1, 9),
            at(2024, 1, 8, 9),
            at(2024, 1, 22, 9),
            at(2024, 1, 29, 9),
        ]
    );

    // The series itself is untouched
    let snapshot = coordinator.get_series(series.event.id).await.unwrap();
    assert_eq!(snapshot.rule, series.rule);
    assert_eq!(snapshot.exceptions.len(), 1);
}

#[tokio::test]
async fn test_delete_occurrence_is_idempotent() {
    let (store, _temp_dir) = setup_test_db().await;
    let series = create_weekly_standup(&store, Uuid::now_v7()).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());
    let id = OccurrenceId::new(series.event.id, at(2024, 1, 8, 9));

    let first = coordinator.delete_occurrence(id).await.unwrap().unwrap();
    let second = coordinator.delete_occurrence(id).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(
        store.find_exception(series.event.id, at(2024, 1, 8, 9)).await.unwrap(),
        Some(second.clone())
    );
    assert_eq!(store.find_exceptions(series.event.id).await.unwrap(), vec![second]);
}

#[tokio::test]
async fn test_deleting_a_non_slot_is_a_no_op() {
    let (store, _temp_dir) = setup_test_db().await;
    let series = create_weekly_standup(&store, Uuid::now_v7()).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());

    let result = coordinator
        .delete_occurrence(OccurrenceId::new(series.event.id, at(2024, 1, 9, 9)))
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(store.find_exceptions(series.event.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_occurrence_replaces_and_clears_deletion() {
    let (store, _temp_dir) = setup_test_db().await;
    let series = create_weekly_standup(&store, Uuid::now_v7()).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());
    let id = OccurrenceId::new(series.event.id, at(2024, 1, 22, 9));

    coordinator.delete_occurrence(id).await.unwrap();
    let patch = OccurrenceOverride {
        title: Some("Retro".to_string()),
        location: Some("Room 2".to_string()),
        ..Default::default()
    };
    let stored = coordinator.update_occurrence(id, patch.clone()).await.unwrap();
    assert!(!stored.is_deleted);
    assert_eq!(stored.title.as_deref(), Some("Retro"));

    // Re-issuing the same override leaves the row unchanged
    let again = coordinator.update_occurrence(id, patch).await.unwrap();
    assert_eq!(stored, again);

    // Replace semantics: fields left out go back to inheriting
    let narrower = coordinator
        .update_occurrence(
            id,
            OccurrenceOverride {
                title: Some("Retro".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(narrower.location, None);
    assert_eq!(narrower.original_time, at(2024, 1, 22, 9));
}

#[tokio::test]
async fn test_update_occurrence_rejects_unknown_slot_and_event() {
    let (store, _temp_dir) = setup_test_db().await;
    let series = create_weekly_standup(&store, Uuid::now_v7()).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());

    let off_slot = coordinator
        .update_occurrence(
            OccurrenceId::new(series.event.id, at(2024, 1, 10, 9)),
            OccurrenceOverride::default(),
        )
        .await;
    assert!(matches!(off_slot, Err(CoreError::NotFound(_))));

    let unknown = coordinator
        .delete_occurrence(OccurrenceId::new(Uuid::now_v7(), at(2024, 1, 8, 9)))
        .await;
    assert!(matches!(unknown, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_round_trip_changes_exactly_one_occurrence() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;
    let service = CalendarQueryService::new(&store, ExpansionConfig::default());

    let before = service
        .query(&CalendarQuery::new(user, january()))
        .await
        .unwrap()
        .occurrences;

    EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .update_occurrence(
            OccurrenceId::new(series.event.id, at(2024, 1, 15, 9)),
            OccurrenceOverride {
                color: Some("#ff0000".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let after = service
        .query(&CalendarQuery::new(user, january()))
        .await
        .unwrap()
        .occurrences;

    assert_eq!(before.len(), after.len());
    let differing: Vec<_> = before
        .iter()
        .zip(after.iter())
        .filter(|(a, b)| a != b)
        .collect();
    assert_eq!(differing.len(), 1);
    assert_eq!(differing[0].1.original_start, at(2024, 1, 15, 9));
    assert_eq!(differing[0].1.color.as_deref(), Some("#ff0000"));
    assert!(differing[0].1.is_exception);
}

#[tokio::test]
async fn test_occurrence_moved_into_window_appears_once() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;

    EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .update_occurrence(
            OccurrenceId::new(series.event.id, at(2024, 1, 29, 9)),
            OccurrenceOverride {
                start_at: Some(at(2024, 1, 3, 16)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let page = CalendarQueryService::new(&store, ExpansionConfig::default())
        .query(&CalendarQuery::new(user, window(at(2024, 1, 2, 0), at(2024, 1, 5, 0))))
        .await
        .unwrap();

    assert_eq!(page.occurrences.len(), 1);
    let moved = &page.occurrences[0];
    assert_eq!(moved.start_at, at(2024, 1, 3, 16));
    assert_eq!(moved.end_at, at(2024, 1, 3, 16) + Duration::minutes(30));
    assert_eq!(moved.id, OccurrenceId::new(series.event.id, at(2024, 1, 29, 9)));

    // The original slot no longer shows up
    let late = query_starts(&store, user, window(at(2024, 1, 29, 0), at(2024, 1, 30, 0))).await;
    assert!(late.is_empty());
}

#[tokio::test]
async fn test_restore_reverts_to_series_definition() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());
    let id = OccurrenceId::new(series.event.id, at(2024, 1, 8, 9));

    coordinator.delete_occurrence(id).await.unwrap();
    assert_eq!(query_starts(&store, user, january()).await.len(), 4);

    assert!(coordinator.restore_occurrence(id).await.unwrap());
    assert!(!coordinator.restore_occurrence(id).await.unwrap());
    assert_eq!(query_starts(&store, user, january()).await.len(), 5);
}

#[tokio::test]
async fn test_delete_series_cascades() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());
    let event_id = series.event.id;

    coordinator
        .delete_occurrence(OccurrenceId::new(event_id, at(2024, 1, 8, 9)))
        .await
        .unwrap();
    let reminder = coordinator
        .add_reminder(
            event_id,
            NewReminder {
                minutes_before: 10,
                method: ReminderMethod::Popup,
            },
        )
        .await
        .unwrap();

    coordinator.delete_series(event_id).await.unwrap();

    assert!(store.find_event_by_id(event_id).await.unwrap().is_none());
    assert!(store.find_rule(event_id).await.unwrap().is_none());
    assert!(store.find_exceptions(event_id).await.unwrap().is_empty());
    assert!(store.find_reminder_by_id(reminder.id).await.unwrap().is_none());
    assert!(query_starts(&store, user, january()).await.is_empty());

    let again = coordinator.delete_series(event_id).await;
    assert!(matches!(again, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_update_series_keeps_exceptions() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());

    coordinator
        .update_occurrence(
            OccurrenceId::new(series.event.id, at(2024, 1, 8, 9)),
            OccurrenceOverride {
                location: Some("Offsite".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let updated = coordinator
        .update_series(
            series.event.id,
            UpdateEventData {
                title: Some("Team sync".to_string()),
                end_at: Some(at(2024, 1, 1, 10)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.event.title, "Team sync");
    assert_eq!(updated.exceptions.len(), 1);

    let occurrences = CalendarQueryService::new(&store, ExpansionConfig::default())
        .query(&CalendarQuery::new(user, january()))
        .await
        .unwrap()
        .occurrences;
    assert!(occurrences.iter().all(|o| o.title == "Team sync"));
    assert!(occurrences.iter().all(|o| o.end_at - o.start_at == Duration::hours(1)));
    let offsite: Vec<_> = occurrences
        .iter()
        .filter(|o| o.location.as_deref() == Some("Offsite"))
        .collect();
    assert_eq!(offsite.len(), 1);
    assert_eq!(offsite[0].start_at, at(2024, 1, 8, 9));
}

#[tokio::test]
async fn test_removing_rule_turns_series_into_single_event() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;

    EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .update_series(
            series.event.id,
            UpdateEventData {
                rule: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let page = CalendarQueryService::new(&store, ExpansionConfig::default())
        .query(&CalendarQuery::new(user, january()))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.occurrences[0].id, OccurrenceId::for_event(series.event.id));
    assert!(!page.occurrences[0].is_recurring);
}

#[tokio::test]
async fn test_single_event_occurrence_addressed_by_event_id() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());
    let created = coordinator
        .create_series(NewEventData::new(user, "Dentist", at(2024, 1, 12, 14), at(2024, 1, 12, 15)))
        .await
        .unwrap();

    let id = OccurrenceId::parse(&created.event.id.to_string()).unwrap();
    coordinator
        .update_occurrence(
            id,
            OccurrenceOverride {
                start_at: Some(at(2024, 1, 12, 16)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let starts = query_starts(&store, user, january()).await;
    assert_eq!(starts, vec![at(2024, 1, 12, 16)]);
}

#[rstest]
#[case::empty_title("   ", at(2024, 1, 1, 9), at(2024, 1, 1, 10), None)]
#[case::end_before_start("Call", at(2024, 1, 1, 9), at(2024, 1, 1, 8), None)]
#[case::zero_interval(
    "Call",
    at(2024, 1, 1, 9),
    at(2024, 1, 1, 10),
    Some(RecurrenceRule::new(Frequency::Daily).every(0))
)]
#[case::until_before_anchor(
    "Call",
    at(2024, 1, 1, 9),
    at(2024, 1, 1, 10),
    Some(RecurrenceRule::new(Frequency::Weekly).with_until(at(2023, 1, 1, 9)))
)]
#[case::impossible_month_day(
    "Call",
    at(2024, 1, 1, 9),
    at(2024, 1, 1, 10),
    Some(RecurrenceRule::new(Frequency::Yearly).in_months([2]).on_month_days([30]))
)]
#[tokio::test]
async fn test_create_series_rejects_invalid_input(
    #[case] title: &str,
    #[case] start: DateTime<Utc>,
    #[case] end: DateTime<Utc>,
    #[case] rule: Option<RecurrenceRule>,
) {
    let (store, _temp_dir) = setup_test_db().await;
    let mut data = NewEventData::new(Uuid::now_v7(), title, start, end);
    data.rule = rule;

    let result = EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .create_series(data)
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_) | CoreError::InvalidRule(_)));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_update_series_rejects_rule_that_never_fires() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;

    let result = EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .update_series(
            series.event.id,
            UpdateEventData {
                rule: Some(Some(
                    RecurrenceRule::new(Frequency::Monthly)
                        .in_months([4, 6, 9, 11])
                        .on_month_days([31]),
                )),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(CoreError::InvalidRule(_))));

    // The stored rule is untouched
    assert_eq!(query_starts(&store, user, january()).await.len(), 5);
}

#[rstest]
#[case::weekly_mon_wed(
    RecurrenceRule::new(Frequency::Weekly).on_weekdays([Weekday::Mon, Weekday::Wed]).with_count(4),
    4
)]
#[case::daily_count(RecurrenceRule::new(Frequency::Daily).with_count(7), 7)]
#[case::biweekly_unbounded(RecurrenceRule::new(Frequency::Biweekly), 3)]
#[case::weekdays(RecurrenceRule::new(Frequency::Custom), 23)]
#[case::monthly_last_day(RecurrenceRule::new(Frequency::Monthly).on_month_days([-1]), 1)]
#[tokio::test]
async fn test_rules_survive_storage(#[case] rule: RecurrenceRule, #[case] expected_in_january: usize) {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let mut data = NewEventData::new(user, "Series", at(2024, 1, 1, 9), at(2024, 1, 1, 10));
    data.rule = Some(rule.clone());

    let created = EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .create_series(data)
        .await
        .unwrap();
    assert_eq!(store.find_rule(created.event.id).await.unwrap(), Some(rule));

    let full_january = window(at(2024, 1, 1, 0), at(2024, 2, 1, 0));
    assert_eq!(query_starts(&store, user, full_january).await.len(), expected_in_january);
}

#[tokio::test]
async fn test_query_merges_series_sorted_and_filtered() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let other_user = Uuid::now_v7();
    let project = Uuid::now_v7();
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());

    create_weekly_standup(&store, user).await;
    create_weekly_standup(&store, other_user).await;

    let mut gym = NewEventData::new(user, "Gym", at(2024, 1, 2, 7), at(2024, 1, 2, 8));
    gym.event_type = Some("health".to_string());
    gym.project_id = Some(project);
    gym.rule = Some(RecurrenceRule::new(Frequency::Weekly).with_count(3));
    coordinator.create_series(gym).await.unwrap();

    let service = CalendarQueryService::new(&store, ExpansionConfig::default());
    let page = service
        .query(&CalendarQuery::new(user, january()))
        .await
        .unwrap();
    assert_eq!(page.total, 8);
    assert!(page.failures.is_empty());
    assert!(page
        .occurrences
        .windows(2)
        .all(|pair| pair[0].start_at <= pair[1].start_at));
    assert_eq!(page.occurrences[1].title, "Gym");

    let filtered = service
        .query(&CalendarQuery::new(user, january()).with_filter(EventFilter {
            event_type: Some("health".to_string()),
            project_id: None,
        }))
        .await
        .unwrap();
    assert_eq!(filtered.total, 3);

    let by_project = service
        .query(&CalendarQuery::new(user, january()).with_filter(EventFilter {
            event_type: None,
            project_id: Some(project),
        }))
        .await
        .unwrap();
    assert_eq!(by_project.total, 3);

    let paged = service
        .query(&CalendarQuery::new(user, january()).with_page(Page::new(2, 3)))
        .await
        .unwrap();
    assert_eq!(paged.total, 8);
    assert_eq!(paged.occurrences.len(), 3);
    assert_eq!(paged.occurrences[0], page.occurrences[2]);
}

#[tokio::test]
async fn test_query_bound_is_window_too_large() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let mut data = NewEventData::new(user, "Hourly", at(2000, 1, 1, 9), at(2000, 1, 1, 10));
    data.rule = Some(RecurrenceRule::new(Frequency::Daily));
    EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .create_series(data)
        .await
        .unwrap();

    let config = ExpansionConfig {
        max_occurrences_per_query: 100,
        ..ExpansionConfig::default()
    };
    let result = CalendarQueryService::new(&store, config)
        .query(&CalendarQuery::new(user, window(at(2000, 1, 1, 0), at(2001, 1, 1, 0))))
        .await;
    assert!(matches!(result, Err(CoreError::WindowTooLarge { limit: 100, .. })));

    let per_series = ExpansionConfig {
        max_candidates_per_series: 50,
        ..ExpansionConfig::default()
    };
    let result = CalendarQueryService::new(&store, per_series)
        .query(&CalendarQuery::new(user, window(at(2000, 1, 1, 0), at(2001, 1, 1, 0))))
        .await;
    assert!(matches!(result, Err(CoreError::WindowTooLarge { limit: 50, .. })));
}

#[tokio::test]
async fn test_corrupt_series_is_isolated() {
    let (store, temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let healthy = create_weekly_standup(&store, user).await;

    let mut data = NewEventData::new(user, "Broken", at(2024, 1, 2, 9), at(2024, 1, 2, 10));
    data.rule = Some(RecurrenceRule::new(Frequency::Daily));
    let broken = EventMutationCoordinator::new(&store, ExpansionConfig::default())
        .create_series(data)
        .await
        .unwrap();

    // Corrupt the stored rule behind the store's back
    let pool = establish_connection(&temp_dir.path().join("test.db").to_string_lossy())
        .await
        .unwrap();

    sqlx::query("UPDATE recurrence_rules SET by_month = '13' WHERE event_id = $1")
        .bind(broken.event.id)
        .execute(&pool)
        .await
        .unwrap();
    let page = CalendarQueryService::new(&store, ExpansionConfig::default())
        .query(&CalendarQuery::new(user, january()))
        .await
        .unwrap();
    assert_eq!(page.failures.len(), 1);
    assert_eq!(page.failures[0].event_id, broken.event.id);
    assert_eq!(page.total, 5);
    assert!(page.occurrences.iter().all(|o| o.event_id == healthy.event.id));
}

#[tokio::test]
async fn test_reminders_follow_moved_occurrences() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());

    coordinator
        .add_reminder(
            series.event.id,
            NewReminder {
                minutes_before: 15,
                method: ReminderMethod::Notification,
            },
        )
        .await
        .unwrap();
    coordinator
        .update_occurrence(
            OccurrenceId::new(series.event.id, at(2024, 1, 8, 9)),
            OccurrenceOverride {
                start_at: Some(at(2024, 1, 8, 13)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let page = CalendarQueryService::new(&store, ExpansionConfig::default())
        .query(&CalendarQuery::new(user, january()))
        .await
        .unwrap();
    for occurrence in &page.occurrences {
        assert_eq!(occurrence.reminders.len(), 1);
        assert_eq!(
            occurrence.reminders[0].trigger_at,
            occurrence.start_at - Duration::minutes(15)
        );
    }
    let moved = page.occurrences.iter().find(|o| o.is_exception).unwrap();
    assert_eq!(moved.reminders[0].trigger_at, at(2024, 1, 8, 12) + Duration::minutes(45));
}

#[tokio::test]
async fn test_reminder_bounds_and_removal() {
    let (store, _temp_dir) = setup_test_db().await;
    let series = create_weekly_standup(&store, Uuid::now_v7()).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());

    for minutes in [-1, ExpansionConfig::default().max_reminder_minutes + 1] {
        let result = coordinator
            .add_reminder(
                series.event.id,
                NewReminder {
                    minutes_before: minutes,
                    method: ReminderMethod::Email,
                },
            )
            .await;
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    let missing_event = coordinator
        .add_reminder(
            Uuid::now_v7(),
            NewReminder {
                minutes_before: 5,
                method: ReminderMethod::Email,
            },
        )
        .await;
    assert!(matches!(missing_event, Err(CoreError::NotFound(_))));

    let reminder = coordinator
        .add_reminder(
            series.event.id,
            NewReminder {
                minutes_before: 60,
                method: ReminderMethod::Email,
            },
        )
        .await
        .unwrap();
    assert_eq!(coordinator.list_reminders(series.event.id).await.unwrap(), vec![reminder.clone()]);

    coordinator.remove_reminder(reminder.id).await.unwrap();
    assert!(coordinator.list_reminders(series.event.id).await.unwrap().is_empty());
    assert!(matches!(
        coordinator.remove_reminder(reminder.id).await,
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_upcoming_reminders_within_horizon() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    let series = create_weekly_standup(&store, user).await;
    let coordinator = EventMutationCoordinator::new(&store, ExpansionConfig::default());

    coordinator
        .add_reminder(
            series.event.id,
            NewReminder {
                minutes_before: 60 * 24,
                method: ReminderMethod::Email,
            },
        )
        .await
        .unwrap();
    coordinator
        .add_reminder(
            series.event.id,
            NewReminder {
                minutes_before: 10,
                method: ReminderMethod::Popup,
            },
        )
        .await
        .unwrap();

    // Sunday 2024-01-07 12:00, two days of horizon
    let now = at(2024, 1, 7, 12);
    let upcoming = CalendarQueryService::new(&store, ExpansionConfig::default())
        .upcoming_reminders(user, now, Duration::days(2))
        .await
        .unwrap();

    let triggers: Vec<_> = upcoming.iter().map(|u| u.trigger.trigger_at).collect();
    assert_eq!(
        triggers,
        vec![at(2024, 1, 8, 9) - Duration::minutes(10)]
    );
    assert_eq!(upcoming[0].occurrence_start, at(2024, 1, 8, 9));
    assert_eq!(upcoming[0].trigger.method, ReminderMethod::Popup);

    // Starting earlier catches the day-before email too
    let upcoming = CalendarQueryService::new(&store, ExpansionConfig::default())
        .upcoming_reminders(user, at(2024, 1, 7, 8), Duration::days(1))
        .await
        .unwrap();
    let methods: Vec<_> = upcoming.iter().map(|u| u.trigger.method).collect();
    assert_eq!(methods, vec![ReminderMethod::Email]);
}

#[tokio::test]
async fn test_upcoming_reminders_past_the_calendar_range_is_invalid_input() {
    let (store, _temp_dir) = setup_test_db().await;
    let user = Uuid::now_v7();
    create_weekly_standup(&store, user).await;
    let service = CalendarQueryService::new(&store, ExpansionConfig::default());

    let result = service
        .upcoming_reminders(user, at(2024, 1, 1, 0), Duration::days(100_000_000))
        .await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));

    // In range, but the reminder lead time pushes the occurrence window over the edge
    let near_the_end = DateTime::<Utc>::MAX_UTC - Duration::days(1);
    let result = service
        .upcoming_reminders(user, near_the_end, Duration::hours(12))
        .await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
}
