use crate::domain::category::{Category, resolve_category};
use crate::domain::models::{Occurrence, YearMonth, clock_label};
use crate::domain::occurrence_index::OccurrenceIndex;
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

pub const MONTH_GRID_CELLS: usize = 42;
pub const DAYS_PER_WEEK: usize = 7;
pub const WEEKDAY_LABELS: [&str; DAYS_PER_WEEK] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CellEntry {
    pub occurrence: Occurrence,
    pub label: String,
    pub category: Category,
    pub css_class: String,
    pub start_label: Option<String>,
}

impl CellEntry {
    fn from_occurrence(occurrence: &Occurrence) -> Self {
        let category = resolve_category(&occurrence.event.tags);
        Self {
            occurrence: occurrence.clone(),
            label: occurrence.event.display_label().to_string(),
            category,
            css_class: category.css_class(),
            start_label: occurrence.event.start_time().map(clock_label),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthCell {
    pub day_number: u32,
    pub date: NaiveDate,
    pub is_active: bool,
    pub occurrences: Vec<CellEntry>,
}

impl MonthCell {
    fn inactive(date: NaiveDate) -> Self {
        Self {
            day_number: date.day(),
            date,
            is_active: false,
            occurrences: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub year_month: YearMonth,
    pub title: String,
    pub weekday_labels: [&'static str; DAYS_PER_WEEK],
    pub cells: Vec<MonthCell>,
}

impl MonthGrid {
    pub fn active_cells(&self) -> impl Iterator<Item = &MonthCell> {
        self.cells.iter().filter(|cell| cell.is_active)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekCell {
    pub date: NaiveDate,
    pub day_number: u32,
    pub weekday_label: &'static str,
    pub occurrences: Vec<CellEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub week_start: NaiveDate,
    pub title: String,
    pub cells: Vec<WeekCell>,
}

/// Fixed 6x7 month layout, Monday first. Only days of `year_month` are active and
/// only active days are looked up in the index.
pub fn build_month_grid(index: &OccurrenceIndex, year_month: YearMonth) -> MonthGrid {
    let first = year_month.first_day();
    let leading = first.weekday().num_days_from_monday();
    let mut cells = Vec::with_capacity(MONTH_GRID_CELLS);

    for back in (1..=u64::from(leading)).rev() {
        if let Some(date) = first.checked_sub_days(Days::new(back)) {
            cells.push(MonthCell::inactive(date));
        }
    }

    for day in 1..=year_month.days_in_month() {
        let Some(date) = year_month.day(day) else {
            continue;
        };
        cells.push(MonthCell {
            day_number: day,
            date,
            is_active: true,
            occurrences: entries_for(index, date),
        });
    }

    let mut trailing = year_month.last_day();
    while cells.len() < MONTH_GRID_CELLS {
        let Some(date) = trailing.succ_opt() else {
            break;
        };
        cells.push(MonthCell::inactive(date));
        trailing = date;
    }

    MonthGrid {
        year_month,
        title: year_month.title(),
        weekday_labels: WEEKDAY_LABELS,
        cells,
    }
}

/// Monday of the week containing `date`.
pub fn normalize_to_monday(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday();
    date.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(date)
}

pub fn build_week_grid(index: &OccurrenceIndex, anchor: NaiveDate) -> WeekGrid {
    let week_start = normalize_to_monday(anchor);
    let cells = week_start
        .iter_days()
        .take(DAYS_PER_WEEK)
        .zip(WEEKDAY_LABELS)
        .map(|(date, weekday_label)| WeekCell {
            date,
            day_number: date.day(),
            weekday_label,
            occurrences: entries_for(index, date),
        })
        .collect();

    WeekGrid {
        week_start,
        title: format!("Week of {}", week_start.format("%B %-d")),
        cells,
    }
}

fn entries_for(index: &OccurrenceIndex, date: NaiveDate) -> Vec<CellEntry> {
    index
        .query_date(date)
        .iter()
        .map(CellEntry::from_occurrence)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EventRecord, EventTime, RecurrenceRule, WeekdayCode};
    use crate::domain::recurrence::ExpansionWindow;
    use chrono::Weekday;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn month(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    fn event(title: &str, tags: &[&str], date: Option<&str>, recurrence: Option<RecurrenceRule>) -> EventRecord {
        EventRecord {
            title: title.to_string(),
            summary: None,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            date: date.map(ToOwned::to_owned),
            recurrence,
            time: Some(EventTime {
                start: Some("10:00".to_string()),
                end: Some("11:00".to_string()),
                timezone: None,
            }),
            location: None,
            registration: None,
            cta: None,
            short_label: None,
        }
    }

    fn sample_index() -> OccurrenceIndex {
        let events: Vec<Arc<EventRecord>> = vec![
            event("Clay Night", &["Art"], Some("2024-02-15"), None),
            event(
                "Voice Practice",
                &["speech", "support"],
                None,
                Some(RecurrenceRule::Weekly {
                    days: vec![WeekdayCode::Th],
                }),
            ),
            event("Leap Social", &[], Some("2024-02-29"), None),
        ]
        .into_iter()
        .map(Arc::new)
        .collect();
        OccurrenceIndex::build(&events, &ExpansionWindow::starting(date("2024-01-01")))
    }

    #[test]
    fn february_2024_has_three_leading_and_ten_trailing_cells() {
        let grid = build_month_grid(&sample_index(), month(2024, 2));

        assert_eq!(grid.cells.len(), MONTH_GRID_CELLS);
        let leading: Vec<u32> = grid
            .cells
            .iter()
            .take_while(|cell| !cell.is_active)
            .map(|cell| cell.day_number)
            .collect();
        assert_eq!(leading, vec![29, 30, 31]);
        assert_eq!(grid.active_cells().count(), 29);
        let trailing: Vec<u32> = grid
            .cells
            .iter()
            .skip(3 + 29)
            .map(|cell| cell.day_number)
            .collect();
        assert_eq!(trailing, (1..=10).collect::<Vec<u32>>());
        assert!(grid.cells.iter().skip(32).all(|cell| !cell.is_active));
        assert_eq!(grid.title, "February 2024");
    }

    #[test]
    fn active_cells_carry_occurrences_with_categories() {
        let grid = build_month_grid(&sample_index(), month(2024, 2));
        let fifteenth = grid
            .cells
            .iter()
            .find(|cell| cell.is_active && cell.day_number == 15)
            .expect("15th cell");

        let labels: Vec<(&str, Category)> = fifteenth
            .occurrences
            .iter()
            .map(|entry| (entry.label.as_str(), entry.category))
            .collect();
        assert_eq!(
            labels,
            vec![("Clay Night", Category::Art), ("Voice Practice", Category::Speech)]
        );
        assert_eq!(fifteenth.occurrences[0].css_class, "calendar-dot-art");
        assert_eq!(fifteenth.occurrences[0].start_label.as_deref(), Some("10:00 AM"));
    }

    #[test]
    fn inactive_cells_never_carry_occurrences() {
        // 2024-03-07 is a Thursday shown in February's trailing cells.
        let grid = build_month_grid(&sample_index(), month(2024, 2));
        assert!(
            grid.cells
                .iter()
                .filter(|cell| !cell.is_active)
                .all(|cell| cell.occurrences.is_empty())
        );
        assert!(grid.cells.iter().any(|cell| cell.date == date("2024-03-07")));
    }

    #[test]
    fn month_starting_on_monday_has_no_leading_cells() {
        let grid = build_month_grid(&OccurrenceIndex::default(), month(2024, 1));
        assert!(grid.cells[0].is_active);
        assert_eq!(grid.cells[0].day_number, 1);
        assert_eq!(grid.cells.len(), MONTH_GRID_CELLS);
    }

    #[test]
    fn rendering_twice_is_structurally_identical() {
        let index = sample_index();
        assert_eq!(
            build_month_grid(&index, month(2024, 2)),
            build_month_grid(&index, month(2024, 2))
        );
        assert_eq!(
            build_week_grid(&index, date("2024-02-14")),
            build_week_grid(&index, date("2024-02-14"))
        );
    }

    #[test]
    fn week_grid_spans_monday_to_sunday() {
        let grid = build_week_grid(&sample_index(), date("2024-02-29"));

        assert_eq!(grid.week_start, date("2024-02-26"));
        assert_eq!(grid.cells.len(), DAYS_PER_WEEK);
        assert_eq!(grid.cells[0].weekday_label, "Mon");
        assert_eq!(grid.cells[6].date, date("2024-03-03"));
        assert_eq!(grid.title, "Week of February 26");

        let thursday = &grid.cells[3];
        let titles: Vec<&str> = thursday
            .occurrences
            .iter()
            .map(|entry| entry.occurrence.event.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Voice Practice", "Leap Social"]);
    }

    #[test]
    fn sunday_normalizes_back_six_days() {
        assert_eq!(normalize_to_monday(date("2024-03-03")), date("2024-02-26"));
        assert_eq!(normalize_to_monday(date("2024-02-26")), date("2024-02-26"));
    }

    proptest! {
        #[test]
        fn normalize_to_monday_returns_monday_within_six_days(offset in 0u64..20000u64) {
            let input = date("1990-01-01") + Days::new(offset);
            let monday = normalize_to_monday(input);
            prop_assert_eq!(monday.weekday(), Weekday::Mon);
            prop_assert!(monday <= input);
            prop_assert!((input - monday).num_days() <= 6);
        }

        #[test]
        fn every_month_grid_has_42_cells_with_exact_active_days(
            year in 1900i32..2200i32,
            month_number in 1u32..=12u32
        ) {
            let year_month = month(year, month_number);
            let grid = build_month_grid(&OccurrenceIndex::default(), year_month);
            prop_assert_eq!(grid.cells.len(), MONTH_GRID_CELLS);
            prop_assert_eq!(grid.active_cells().count() as u32, year_month.days_in_month());
            prop_assert_eq!(grid.cells[0].date.weekday(), Weekday::Mon);
            for pair in grid.cells.windows(2) {
                prop_assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
            }
        }
    }
}
