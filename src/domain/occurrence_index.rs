use crate::domain::models::{EventRecord, Occurrence, date_key};
use crate::domain::recurrence::{ExpansionWindow, expand};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Order of occurrences that share a calendar day.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DayOrdering {
    /// Feed order.
    #[default]
    Insertion,
    /// Feed order, then stably by `time.start`; untimed events sort last.
    StartTime,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccurrenceIndex {
    by_day: HashMap<String, Vec<Occurrence>>,
    total: usize,
}

impl OccurrenceIndex {
    pub fn build(events: &[Arc<EventRecord>], window: &ExpansionWindow) -> Self {
        Self::build_with_ordering(events, window, DayOrdering::Insertion)
    }

    pub fn build_with_ordering(
        events: &[Arc<EventRecord>],
        window: &ExpansionWindow,
        ordering: DayOrdering,
    ) -> Self {
        let mut by_day: HashMap<String, Vec<Occurrence>> = HashMap::new();
        let mut total = 0;

        for event in events {
            for date in expand(event, window) {
                by_day
                    .entry(date_key(date))
                    .or_default()
                    .push(Occurrence::new(Arc::clone(event), date));
                total += 1;
            }
        }

        if ordering == DayOrdering::StartTime {
            for occurrences in by_day.values_mut() {
                occurrences.sort_by_key(|occurrence| {
                    let start = occurrence.event.start_time();
                    (start.is_none(), start)
                });
            }
        }

        Self { by_day, total }
    }

    pub fn query(&self, date_key: &str) -> &[Occurrence] {
        self.by_day
            .get(date_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn query_date(&self, date: NaiveDate) -> &[Occurrence] {
        self.query(&date_key(date))
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn day_count(&self) -> usize {
        self.by_day.len()
    }

    /// Soonest occurrences on or after `from`, merged across every event.
    pub fn upcoming(&self, from: NaiveDate, limit: usize) -> Vec<Occurrence> {
        let mut days: Vec<&Vec<Occurrence>> = self
            .by_day
            .values()
            .filter(|occurrences| occurrences.first().is_some_and(|first| first.date >= from))
            .collect();
        days.sort_by_key(|occurrences| occurrences.first().map(|first| first.date));

        days.into_iter()
            .flatten()
            .take(limit)
            .cloned()
            .collect()
    }
}
