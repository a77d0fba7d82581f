use crate::domain::grid::{MonthGrid, WeekGrid, build_month_grid, build_week_grid, normalize_to_monday};
use crate::domain::models::YearMonth;
use crate::domain::occurrence_index::OccurrenceIndex;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

const WEEK_STEP: Days = Days::new(7);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NavigationAction {
    Next,
    Prev,
    Toggle,
}

/// Calendar cursor. Week mode keeps the month it was entered from so toggling back
/// returns there.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ViewState {
    Month {
        cursor: YearMonth,
    },
    Week {
        week_start: NaiveDate,
        month_cursor: YearMonth,
    },
}

impl ViewState {
    pub fn initial(today: NaiveDate) -> Self {
        Self::Month {
            cursor: YearMonth::from_date(today),
        }
    }

    pub fn apply(self, action: NavigationAction, today: NaiveDate) -> Self {
        match action {
            NavigationAction::Next => self.next(),
            NavigationAction::Prev => self.prev(),
            NavigationAction::Toggle => self.toggle(today),
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Month { cursor } => Self::Month {
                cursor: cursor.next(),
            },
            Self::Week {
                week_start,
                month_cursor,
            } => Self::Week {
                week_start: normalize_to_monday(
                    week_start.checked_add_days(WEEK_STEP).unwrap_or(week_start),
                ),
                month_cursor,
            },
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Month { cursor } => Self::Month {
                cursor: cursor.previous(),
            },
            Self::Week {
                week_start,
                month_cursor,
            } => Self::Week {
                week_start: normalize_to_monday(
                    week_start.checked_sub_days(WEEK_STEP).unwrap_or(week_start),
                ),
                month_cursor,
            },
        }
    }

    /// Entering week mode always anchors on the week containing `today`.
    pub fn toggle(self, today: NaiveDate) -> Self {
        match self {
            Self::Month { cursor } => Self::Week {
                week_start: normalize_to_monday(today),
                month_cursor: cursor,
            },
            Self::Week { month_cursor, .. } => Self::Month {
                cursor: month_cursor,
            },
        }
    }

    pub fn render(&self, index: &OccurrenceIndex) -> RenderedView {
        match self {
            Self::Month { cursor } => RenderedView::Month(build_month_grid(index, *cursor)),
            Self::Week { week_start, .. } => RenderedView::Week(build_week_grid(index, *week_start)),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "grid", rename_all = "snake_case")]
pub enum RenderedView {
    Month(MonthGrid),
    Week(WeekGrid),
}

impl RenderedView {
    pub fn title(&self) -> &str {
        match self {
            Self::Month(grid) => &grid.title,
            Self::Week(grid) => &grid.title,
        }
    }

    /// True when no visible cell carries an occurrence.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Month(grid) => grid.active_cells().all(|cell| cell.occurrences.is_empty()),
            Self::Week(grid) => grid.cells.iter().all(|cell| cell.occurrences.is_empty()),
        }
    }
}
