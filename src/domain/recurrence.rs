use crate::domain::models::{EventRecord, Ordinal, RecurrenceRule, WeekdayCode, YearMonth};
use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use tracing::{debug, warn};

pub const DEFAULT_WINDOW_MONTHS: u32 = 6;
pub const DEFAULT_MAX_OCCURRENCES: usize = 6;
const BIWEEKLY_SPACING_DAYS: u64 = 14;
const DAYS_PER_WEEK: u64 = 7;

/// Forward-looking range that bounds recurrence expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionWindow {
    pub start: NaiveDate,
    pub months: u32,
    pub max_occurrences: usize,
}

impl ExpansionWindow {
    pub fn new(start: NaiveDate, months: u32, max_occurrences: usize) -> Self {
        Self {
            start,
            months,
            max_occurrences,
        }
    }

    pub fn starting(start: NaiveDate) -> Self {
        Self::new(start, DEFAULT_WINDOW_MONTHS, DEFAULT_MAX_OCCURRENCES)
    }

    /// Inclusive last day. Month-end starts clamp to the shorter target month.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_months(Months::new(self.months))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }
}

/// Concrete occurrence dates of `event` inside `window`, ascending and without duplicates.
///
/// A non-blank `date` field claims the event even when it fails to parse; otherwise the
/// recurrence rule decides. Anything unrecognised yields an empty list.
pub fn expand(event: &EventRecord, window: &ExpansionWindow) -> Vec<NaiveDate> {
    let has_date = event
        .date
        .as_deref()
        .map(str::trim)
        .is_some_and(|raw| !raw.is_empty());
    let mut dates = if has_date {
        expand_single_date(event, window)
    } else {
        match &event.recurrence {
            Some(RecurrenceRule::Weekly { days }) => expand_weekly(days, window),
            Some(RecurrenceRule::Monthly { which, weekday }) => {
                expand_monthly(&which.to_vec(), weekday.to_weekday(), window)
            }
            Some(RecurrenceRule::Biweekly) => expand_biweekly(window),
            Some(RecurrenceRule::Unsupported) => {
                warn!(title = %event.title, "skipping event with unsupported recurrence type");
                Vec::new()
            }
            None => {
                debug!(title = %event.title, "event has neither date nor recurrence");
                Vec::new()
            }
        }
    };
    dates.sort_unstable();
    dates.dedup();
    dates
}

fn expand_single_date(event: &EventRecord, window: &ExpansionWindow) -> Vec<NaiveDate> {
    match event.parsed_date() {
        Some(date) if window.contains(date) => vec![date],
        Some(date) => {
            debug!(title = %event.title, %date, "single-date event outside expansion window");
            Vec::new()
        }
        None => {
            warn!(
                title = %event.title,
                date = event.date.as_deref().unwrap_or_default(),
                "skipping event with unparseable date"
            );
            Vec::new()
        }
    }
}

fn expand_weekly(days: &[WeekdayCode], window: &ExpansionWindow) -> Vec<NaiveDate> {
    let mut weekdays: Vec<Weekday> = Vec::with_capacity(days.len());
    for day in days.iter().map(|code| code.to_weekday()) {
        if !weekdays.contains(&day) {
            weekdays.push(day);
        }
    }
    if weekdays.is_empty() {
        return Vec::new();
    }

    let end = window.end();
    let mut dates = Vec::new();
    let mut cycle_start = window.start;
    while cycle_start <= end {
        for weekday in &weekdays {
            let offset = days_until(cycle_start.weekday(), *weekday);
            let Some(candidate) = cycle_start.checked_add_days(Days::new(offset)) else {
                continue;
            };
            if candidate <= end {
                dates.push(candidate);
            }
        }
        let Some(next_cycle) = cycle_start.checked_add_days(Days::new(DAYS_PER_WEEK)) else {
            break;
        };
        cycle_start = next_cycle;
    }
    dates
}

fn expand_monthly(ordinals: &[Ordinal], weekday: Weekday, window: &ExpansionWindow) -> Vec<NaiveDate> {
    let end = window.end();
    let mut dates = Vec::new();
    let mut month = YearMonth::from_date(window.start);

    for _ in 0..window.months {
        for ordinal in ordinals {
            if dates.len() >= window.max_occurrences {
                return dates;
            }
            let candidate = match ordinal.nth() {
                Some(n) => nth_weekday_of_month(month, n, weekday),
                None => Some(last_weekday_of_month(month, weekday)),
            };
            if let Some(date) = candidate.filter(|date| *date >= window.start && *date <= end) {
                dates.push(date);
            }
        }
        let following = month.next();
        if following == month {
            break;
        }
        month = following;
    }
    dates
}

fn expand_biweekly(window: &ExpansionWindow) -> Vec<NaiveDate> {
    (0..window.max_occurrences as u64)
        .map_while(|step| {
            window
                .start
                .checked_add_days(Days::new(step * BIWEEKLY_SPACING_DAYS))
        })
        .collect()
}

/// The `n`th `weekday` of `month`, or `None` when the month has fewer than `n` of them.
pub fn nth_weekday_of_month(month: YearMonth, n: u32, weekday: Weekday) -> Option<NaiveDate> {
    if n == 0 {
        return None;
    }
    let first = month.first_day();
    let offset = days_until(first.weekday(), weekday) + DAYS_PER_WEEK * u64::from(n - 1);
    let candidate = first.checked_add_days(Days::new(offset))?;
    (candidate.month() == month.month() && candidate.year() == month.year()).then_some(candidate)
}

pub fn last_weekday_of_month(month: YearMonth, weekday: Weekday) -> NaiveDate {
    let last = month.last_day();
    let back = days_until(weekday, last.weekday());
    last.checked_sub_days(Days::new(back)).unwrap_or(last)
}

fn days_until(from: Weekday, to: Weekday) -> u64 {
    u64::from((7 + to.num_days_from_sunday() - from.num_days_from_sunday()) % 7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{OrdinalSelection, RecurrenceRule};
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn event_with(recurrence: Option<RecurrenceRule>, date: Option<&str>) -> EventRecord {
        EventRecord {
            title: "Sample".to_string(),
            summary: None,
            tags: Vec::new(),
            date: date.map(ToOwned::to_owned),
            recurrence,
            time: None,
            location: None,
            registration: None,
            cta: None,
            short_label: None,
        }
    }

    fn monthly(which: OrdinalSelection, weekday: WeekdayCode) -> EventRecord {
        event_with(Some(RecurrenceRule::Monthly { which, weekday }), None)
    }

    #[test]
    fn window_end_is_inclusive_and_month_based() {
        let window = ExpansionWindow::starting(date("2025-01-15"));
        assert_eq!(window.end(), date("2025-07-15"));
        assert!(window.contains(date("2025-01-15")));
        assert!(window.contains(date("2025-07-15")));
        assert!(!window.contains(date("2025-07-16")));
        assert!(!window.contains(date("2025-01-14")));
    }

    #[test]
    fn single_date_inside_window_appears_once() {
        let event = event_with(None, Some("2025-03-10"));
        let inside = ExpansionWindow::starting(date("2025-01-01"));
        let before = ExpansionWindow::starting(date("2025-04-01"));
        let after = ExpansionWindow::starting(date("2024-09-01"));

        assert_eq!(expand(&event, &inside), vec![date("2025-03-10")]);
        assert!(expand(&event, &before).is_empty());
        assert!(expand(&event, &after).is_empty());
    }

    #[test]
    fn single_date_on_window_boundaries_is_included() {
        let event = event_with(None, Some("2025-03-10"));
        assert_eq!(
            expand(&event, &ExpansionWindow::starting(date("2025-03-10"))),
            vec![date("2025-03-10")]
        );
        assert_eq!(
            expand(&event, &ExpansionWindow::starting(date("2024-09-10"))),
            vec![date("2025-03-10")]
        );
    }

    #[test]
    fn unparseable_date_yields_nothing_even_with_recurrence() {
        let event = event_with(Some(RecurrenceRule::Biweekly), Some("sometime soon"));
        assert!(expand(&event, &ExpansionWindow::starting(date("2025-01-01"))).is_empty());
    }

    #[test]
    fn blank_date_falls_through_to_recurrence() {
        let window = ExpansionWindow::starting(date("2024-01-01"));
        let weekly = Some(RecurrenceRule::Weekly {
            days: vec![WeekdayCode::Mo],
        });
        let dated = expand(&event_with(weekly.clone(), None), &window);

        assert_eq!(expand(&event_with(weekly.clone(), Some("")), &window), dated);
        assert_eq!(expand(&event_with(weekly, Some("   ")), &window), dated);
        assert_eq!(dated.first(), Some(&date("2024-01-01")));
        assert_eq!(dated.len(), 27);
    }

    #[test]
    fn date_takes_priority_over_recurrence() {
        let event = event_with(Some(RecurrenceRule::Biweekly), Some("2025-02-01"));
        assert_eq!(
            expand(&event, &ExpansionWindow::starting(date("2025-01-01"))),
            vec![date("2025-02-01")]
        );
    }

    #[test]
    fn unsupported_or_missing_rule_yields_nothing() {
        let window = ExpansionWindow::starting(date("2025-01-01"));
        assert!(expand(&event_with(Some(RecurrenceRule::Unsupported), None), &window).is_empty());
        assert!(expand(&event_with(None, None), &window).is_empty());
        assert!(
            expand(
                &event_with(Some(RecurrenceRule::Weekly { days: Vec::new() }), None),
                &window
            )
            .is_empty()
        );
    }

    #[test]
    fn weekly_expansion_covers_window_and_ignores_duplicate_days() {
        let event = event_with(
            Some(RecurrenceRule::Weekly {
                days: vec![WeekdayCode::We, WeekdayCode::Mo, WeekdayCode::We],
            }),
            None,
        );
        let window = ExpansionWindow::new(date("2024-01-03"), 1, DEFAULT_MAX_OCCURRENCES);
        let dates = expand(&event, &window);

        assert_eq!(dates.first(), Some(&date("2024-01-03")));
        assert_eq!(dates.last(), Some(&date("2024-01-31")));
        assert_eq!(dates.len(), 9);
        assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn weekly_expansion_is_not_capped_by_max_occurrences() {
        let event = event_with(
            Some(RecurrenceRule::Weekly {
                days: vec![WeekdayCode::Sa],
            }),
            None,
        );
        let window = ExpansionWindow::new(date("2024-01-01"), 6, 2);
        assert_eq!(expand(&event, &window).len(), 26);
    }

    #[test]
    fn biweekly_expansion_is_count_bounded() {
        let event = event_with(Some(RecurrenceRule::Biweekly), None);
        let window = ExpansionWindow::new(date("2024-01-01"), 6, 6);
        assert_eq!(
            expand(&event, &window),
            vec![
                date("2024-01-01"),
                date("2024-01-15"),
                date("2024-01-29"),
                date("2024-02-12"),
                date("2024-02-26"),
                date("2024-03-11"),
            ]
        );

        let narrow = ExpansionWindow::new(date("2024-01-01"), 1, 10);
        let dates = expand(&event, &narrow);
        assert_eq!(dates.len(), 10);
        assert!(dates.last().is_some_and(|last| *last > narrow.end()));
    }

    #[test]
    fn monthly_last_friday_matches_known_dates() {
        let event = monthly(OrdinalSelection::One(Ordinal::Last), WeekdayCode::Fr);
        let window = ExpansionWindow::starting(date("2024-01-01"));
        assert_eq!(
            expand(&event, &window),
            vec![
                date("2024-01-26"),
                date("2024-02-23"),
                date("2024-03-29"),
                date("2024-04-26"),
                date("2024-05-31"),
                date("2024-06-28"),
            ]
        );
    }

    #[test]
    fn monthly_expansion_never_emits_past_dates() {
        let event = monthly(OrdinalSelection::One(Ordinal::Second), WeekdayCode::We);
        let window = ExpansionWindow::starting(date("2024-01-20"));
        let dates = expand(&event, &window);
        assert_eq!(dates.first(), Some(&date("2024-02-14")));
        assert!(dates.iter().all(|value| *value >= window.start));
        assert_eq!(dates.len(), 5);
    }

    #[test]
    fn monthly_expansion_respects_occurrence_cap() {
        let event = monthly(
            OrdinalSelection::Many(vec![Ordinal::First, Ordinal::Third]),
            WeekdayCode::Tu,
        );
        let window = ExpansionWindow::new(date("2024-01-01"), 6, 4);
        assert_eq!(
            expand(&event, &window),
            vec![
                date("2024-01-02"),
                date("2024-01-16"),
                date("2024-02-06"),
                date("2024-02-20"),
            ]
        );
    }

    #[test]
    fn monthly_expansion_crosses_year_boundary() {
        let event = monthly(OrdinalSelection::One(Ordinal::First), WeekdayCode::Mo);
        let window = ExpansionWindow::new(date("2024-11-01"), 4, 10);
        assert_eq!(
            expand(&event, &window),
            vec![
                date("2024-11-04"),
                date("2024-12-02"),
                date("2025-01-06"),
                date("2025-02-03"),
            ]
        );
    }

    #[test]
    fn nth_weekday_does_not_spill_into_next_month() {
        let november = YearMonth::new(2024, 11).expect("month");
        assert_eq!(november.first_day().weekday(), Weekday::Fri);
        let fourth = nth_weekday_of_month(november, 4, Weekday::Fri).expect("fourth friday");
        assert_eq!(fourth, date("2024-11-22"));
        assert!(fourth <= november.last_day());

        let february = YearMonth::new(2024, 2).expect("month");
        assert_eq!(
            nth_weekday_of_month(february, 4, Weekday::Fri),
            Some(date("2024-02-23"))
        );
        assert_eq!(nth_weekday_of_month(february, 5, Weekday::Fri), None);
        assert_eq!(nth_weekday_of_month(february, 0, Weekday::Fri), None);
    }

    proptest! {
        #[test]
        fn weekly_dates_fall_on_declared_days_seven_days_apart(
            offset in 0u64..3650u64,
            months in 1u32..12u32
        ) {
            let start = date("2020-01-01") + Days::new(offset);
            let event = event_with(
                Some(RecurrenceRule::Weekly { days: vec![WeekdayCode::Mo, WeekdayCode::We] }),
                None,
            );
            let window = ExpansionWindow::new(start, months, DEFAULT_MAX_OCCURRENCES);
            let dates = expand(&event, &window);

            prop_assert!(!dates.is_empty());
            for weekday in [Weekday::Mon, Weekday::Wed] {
                let matching: Vec<NaiveDate> =
                    dates.iter().copied().filter(|value| value.weekday() == weekday).collect();
                for pair in matching.windows(2) {
                    prop_assert_eq!((pair[1] - pair[0]).num_days(), 7);
                }
            }
            prop_assert!(dates
                .iter()
                .all(|value| matches!(value.weekday(), Weekday::Mon | Weekday::Wed)));
            prop_assert!(dates.iter().all(|value| window.contains(*value)));
        }

        #[test]
        fn last_weekday_is_final_match_in_month(
            year in 1990i32..2100i32,
            month in 1u32..=12u32,
            weekday_index in 0u8..7u8
        ) {
            let month = YearMonth::new(year, month).expect("valid month");
            let weekday = Weekday::try_from(weekday_index).expect("valid weekday");
            let last = last_weekday_of_month(month, weekday);

            prop_assert_eq!(last.weekday(), weekday);
            prop_assert_eq!(last.month(), month.month());
            prop_assert!(last + Days::new(7) > month.last_day());
        }

        #[test]
        fn monthly_last_emits_one_date_per_month(offset in 0u64..3650u64) {
            let start = date("2020-01-01") + Days::new(offset);
            let event = monthly(OrdinalSelection::One(Ordinal::Last), WeekdayCode::Fr);
            let window = ExpansionWindow::new(start, 6, 12);
            let dates = expand(&event, &window);

            let mut months: Vec<(i32, u32)> =
                dates.iter().map(|value| (value.year(), value.month())).collect();
            let total = months.len();
            months.dedup();
            prop_assert_eq!(months.len(), total);
            prop_assert!(total == 5 || total == 6);
            for value in &dates {
                let month = YearMonth::from_date(*value);
                prop_assert_eq!(*value, last_weekday_of_month(month, Weekday::Fri));
            }
        }
    }
}
