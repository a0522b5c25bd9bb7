use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use rrule::{RRuleSet, Tz as RRuleTz};

use crate::error::CoreError;
use crate::models::{weekday_code, Frequency, RecurrenceRule, TimeWindow};

const RRULE_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const WORKING_DAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

/// RuleEvaluator: maps (anchor, rule, window) to the ordered candidate instants.
///
/// Responsibilities:
/// 1. Validate recurrence rules before they are stored or evaluated
/// 2. Translate rules into canonical RFC 5545 form for the rrule engine
/// 3. Produce strictly increasing, de-duplicated candidates clipped to a window
/// 4. Refuse to materialize more than `max_candidates` instants for one series
///
/// The evaluator holds no mutable state and never reads the clock, so the same
/// inputs always produce the same sequence.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    max_candidates: usize,
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(crate::models::ExpansionConfig::default().max_candidates_per_series)
    }
}

impl RuleEvaluator {
    /// Creates an evaluator that fails with `WindowTooLarge` past `max_candidates`.
    pub fn new(max_candidates: usize) -> Self {
        // rrule caps a single collection at u16::MAX entries
        let ceiling = u16::MAX as usize - 2;
        Self {
            max_candidates: max_candidates.clamp(1, ceiling),
        }
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Expands a series into its candidate instants inside `window`.
    ///
    /// # Behavior
    /// - No rule, or `Frequency::None`: the anchor alone, if it falls in the window
    /// - Periodic rules: advance from the anchor by `interval` periods, stopping at
    ///   the window end, `until`, or the `count`-th filtered candidate, whichever
    ///   comes first
    /// - Day/month filters expand each period and `count` applies to the filtered
    ///   sequence
    pub fn expand(
        &self,
        anchor: DateTime<Utc>,
        rule: Option<&RecurrenceRule>,
        window: &TimeWindow,
    ) -> Result<Vec<DateTime<Utc>>, CoreError> {
        let rule = match rule {
            Some(rule) if rule.frequency.is_periodic() => rule,
            _ => {
                return Ok(if window.contains(anchor) {
                    vec![anchor]
                } else {
                    Vec::new()
                });
            }
        };

        if anchor >= window.end || rule.until.is_some_and(|until| until < window.start) {
            return Ok(Vec::new());
        }

        let (rrule_string, rrule_set) = Self::parse_rule(rule, anchor)?;

        // Bounds are widened by a second and the half-open window is applied below,
        // so the result does not depend on whether rrule treats them as inclusive.
        let after = window
            .start
            .checked_sub_signed(Duration::seconds(1))
            .unwrap_or(window.start)
            .with_timezone(&RRuleTz::UTC);
        let before = window.end.with_timezone(&RRuleTz::UTC);
        let limit = (self.max_candidates + 2) as u16;

        let (dates, limited) = rrule_set.after(after).before(before).all(limit);
        // `limited` with room left means rrule gave up searching, not that the window is full
        if limited && dates.len() < usize::from(limit) {
            return Err(CoreError::InvalidRule(format!(
                "no date matching '{}' was found within the iteration limit",
                rrule_string
            )));
        }

        let mut candidates: Vec<DateTime<Utc>> = dates
            .into_iter()
            .map(|dt| dt.with_timezone(&Utc))
            .filter(|dt| window.contains(*dt))
            .filter(|dt| rule.until.map_or(true, |until| *dt <= until))
            .collect();
        candidates.sort();
        candidates.dedup();

        if candidates.len() > self.max_candidates {
            return Err(CoreError::WindowTooLarge {
                produced: candidates.len(),
                limit: self.max_candidates,
            });
        }

        tracing::trace!(count = candidates.len(), rrule = %rrule_string, "expanded rule");
        Ok(candidates)
    }

    /// Whether `instant` is one of the series' original slots under the current rule.
    pub fn occurs_at(
        &self,
        anchor: DateTime<Utc>,
        rule: Option<&RecurrenceRule>,
        instant: DateTime<Utc>,
    ) -> Result<bool, CoreError> {
        let window = TimeWindow::starting_at(instant, Duration::seconds(1))?;
        Ok(self.expand(anchor, rule, &window)?.contains(&instant))
    }

    /// The first instant a periodic rule produces from `anchor`, if any.
    ///
    /// A rule whose filters never line up (February 30th) is `InvalidRule`.
    /// `None` means the rule is satisfiable in principle but `until` ends it
    /// before the first match.
    pub fn first_occurrence(
        rule: &RecurrenceRule,
        anchor: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        let (rrule_string, rrule_set) = Self::parse_rule(rule, anchor)?;
        let (dates, limited) = rrule_set.all(1);
        match dates.first() {
            Some(first) => Ok(Some(first.with_timezone(&Utc))),
            None if limited => Err(CoreError::InvalidRule(format!(
                "no date matches the filters of '{}'",
                rrule_string
            ))),
            None => Ok(None),
        }
    }

    fn parse_rule(rule: &RecurrenceRule, anchor: DateTime<Utc>) -> Result<(String, RRuleSet), CoreError> {
        let rrule_string = Self::to_rrule_string(rule, anchor)?;
        let rrule_set = rrule_string
            .parse::<RRuleSet>()
            .map_err(|e| CoreError::InvalidRule(format!("Failed to parse RRULE '{}': {}", rrule_string, e)))?;
        Ok((rrule_string, rrule_set))
    }

    /// Validates a rule against the anchor it will be evaluated from.
    pub fn validate_rule(rule: &RecurrenceRule, anchor: DateTime<Utc>) -> Result<(), CoreError> {
        if rule.interval < 1 {
            return Err(CoreError::InvalidRule(format!(
                "interval must be a positive integer, got {}",
                rule.interval
            )));
        }

        if let Some(count) = rule.count {
            if count < 1 {
                return Err(CoreError::InvalidRule(format!(
                    "count must be a positive integer, got {}",
                    count
                )));
            }
        }

        if let Some(month) = rule.by_month.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(CoreError::InvalidRule(format!("month {} is out of range 1-12", month)));
        }

        if let Some(day) = rule
            .by_month_day
            .iter()
            .find(|d| **d == 0 || !(-31..=31).contains(*d))
        {
            return Err(CoreError::InvalidRule(format!(
                "day of month {} is out of range (1-31 or -31 to -1)",
                day
            )));
        }

        if !rule.by_month_day.is_empty()
            && matches!(rule.frequency, Frequency::Weekly | Frequency::Biweekly)
        {
            return Err(CoreError::InvalidRule(
                "a day-of-month filter cannot be combined with a weekly cadence".to_string(),
            ));
        }

        if rule.frequency == Frequency::Custom
            && !rule.by_weekday.is_empty()
            && !rule.by_weekday.iter().any(|d| WORKING_DAYS.contains(d))
        {
            return Err(CoreError::InvalidRule(
                "the weekday cadence excludes every selected day".to_string(),
            ));
        }

        if let Some(until) = rule.until {
            if until < anchor {
                return Err(CoreError::InvalidRule(format!(
                    "until {} is before the series start {}",
                    until, anchor
                )));
            }
        }

        Ok(())
    }

    /// Builds the canonical RFC 5545 text (`DTSTART` line plus `RRULE` line) for a rule.
    pub fn to_rrule_string(rule: &RecurrenceRule, anchor: DateTime<Utc>) -> Result<String, CoreError> {
        Self::validate_rule(rule, anchor)?;

        let (freq, interval, weekdays) = match rule.frequency {
            Frequency::None => {
                return Err(CoreError::InvalidRule(
                    "a non-recurring rule has no RRULE form".to_string(),
                ))
            }
            Frequency::Daily => ("DAILY", rule.interval, rule.by_weekday.clone()),
            Frequency::Weekly => ("WEEKLY", rule.interval, rule.by_weekday.clone()),
            Frequency::Biweekly => {
                let doubled = rule.interval.checked_mul(2).ok_or_else(|| {
                    CoreError::InvalidRule(format!("interval {} is too large", rule.interval))
                })?;
                ("WEEKLY", doubled, rule.by_weekday.clone())
            }
            Frequency::Monthly => ("MONTHLY", rule.interval, rule.by_weekday.clone()),
            Frequency::Yearly => ("YEARLY", rule.interval, rule.by_weekday.clone()),
            Frequency::Custom => {
                let days = if rule.by_weekday.is_empty() {
                    WORKING_DAYS.to_vec()
                } else {
                    rule.by_weekday
                        .iter()
                        .copied()
                        .filter(|d| WORKING_DAYS.contains(d))
                        .collect()
                };
                ("DAILY", rule.interval, days)
            }
        };

        let mut parts = vec![format!("FREQ={}", freq), format!("INTERVAL={}", interval)];

        if let Some(count) = rule.count {
            parts.push(format!("COUNT={}", count));
        }
        if let Some(until) = rule.until {
            parts.push(format!("UNTIL={}", until.format(RRULE_DATE_FORMAT)));
        }
        if !weekdays.is_empty() {
            let mut weekdays = weekdays;
            weekdays.sort_by_key(|d| d.num_days_from_monday());
            weekdays.dedup();
            let codes: Vec<&str> = weekdays.into_iter().map(weekday_code).collect();
            parts.push(format!("BYDAY={}", codes.join(",")));
        }
        if !rule.by_month.is_empty() {
            parts.push(format!("BYMONTH={}", join_sorted(&rule.by_month)));
        }
        if !rule.by_month_day.is_empty() {
            parts.push(format!("BYMONTHDAY={}", join_sorted(&rule.by_month_day)));
        }

        Ok(format!(
            "DTSTART:{}\nRRULE:{}",
            anchor.format(RRULE_DATE_FORMAT),
            parts.join(";")
        ))
    }
}

fn join_sorted<T: Ord + Copy + ToString>(values: &[T]) -> String {
    let mut values = values.to_vec();
    values.sort();
    values.dedup();
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Weekday of an instant, for callers that want to inspect candidates.
pub fn weekday_of(instant: DateTime<Utc>) -> Weekday {
    instant.weekday()
}
