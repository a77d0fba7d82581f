use crate::domain::category::{Category, resolve_category};
use crate::domain::models::{EventRecord, EventTime, Occurrence, clock_label, parse_hhmm};
use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::warn;

const DEFAULT_CALL_LABEL: &str = "Call";
const DEFAULT_EMAIL_LABEL: &str = "Email";
const DEFAULT_LINK_LABEL: &str = "Learn More";
const TIME_RANGE_SEPARATOR: &str = "\u{2013}";
const LOCATION_NAME_SEPARATOR: &str = " \u{2014} ";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Phone,
    Email,
    Link,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DetailAction {
    pub kind: ActionKind,
    pub href: String,
    pub label: String,
    pub opens_new_tab: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    pub title: String,
    pub summary: String,
    pub date_key: String,
    pub date_label: String,
    pub time_range: String,
    pub location: String,
    pub location_line: String,
    pub note: String,
    pub category: Category,
    pub actions: Vec<DetailAction>,
}

/// Formats one occurrence for the detail view.
pub fn present(occurrence: &Occurrence, display_timezone: Tz) -> DisplayFields {
    let event = occurrence.event.as_ref();
    DisplayFields {
        title: event.title.clone(),
        summary: event.summary.clone().unwrap_or_default(),
        date_key: occurrence.date_key(),
        date_label: occurrence.date.format("%A, %B %-d, %Y").to_string(),
        time_range: format_time_range(occurrence.date, event.time.as_ref(), display_timezone),
        location: location_label(event),
        location_line: location_line(event),
        note: event
            .registration
            .as_ref()
            .and_then(|registration| registration.note.clone())
            .unwrap_or_default(),
        category: resolve_category(&event.tags),
        actions: detail_actions(event),
    }
}

/// `h:mm AM–h:mm PM` in `display_timezone`; start alone without an end, empty without a start.
pub fn format_time_range(date: NaiveDate, time: Option<&EventTime>, display_timezone: Tz) -> String {
    let Some(time) = time else {
        return String::new();
    };
    let source_timezone = time
        .timezone
        .as_deref()
        .and_then(|raw| match raw.trim().parse::<Tz>() {
            Ok(timezone) => Some(timezone),
            Err(error) => {
                warn!(timezone = raw, %error, "unknown event timezone, using display timezone");
                None
            }
        })
        .unwrap_or(display_timezone);

    let convert = |raw: &str| localize(date, raw, source_timezone, display_timezone);
    let Some(start) = time.start.as_deref().and_then(convert) else {
        return String::new();
    };
    match time.end.as_deref().and_then(convert) {
        Some(end) => format!("{start}{TIME_RANGE_SEPARATOR}{end}"),
        None => start,
    }
}

fn localize(date: NaiveDate, raw: &str, source: Tz, display: Tz) -> Option<String> {
    let time = parse_hhmm(raw)?;
    let shown = source
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|instant| instant.with_timezone(&display).time())
        .unwrap_or(time);
    Some(clock_label(shown))
}

fn location_label(event: &EventRecord) -> String {
    let Some(location) = event.location.as_ref() else {
        return String::new();
    };
    non_empty(location.name.as_deref())
        .or_else(|| non_empty(location.mode.as_deref()))
        .unwrap_or_default()
        .to_string()
}

fn location_line(event: &EventRecord) -> String {
    let Some(location) = event.location.as_ref() else {
        return String::new();
    };
    let mut line = non_empty(location.mode.as_deref()).unwrap_or_default().to_string();
    if let Some(name) = non_empty(location.name.as_deref()) {
        if line.is_empty() {
            line.push_str(name);
        } else {
            line.push_str(LOCATION_NAME_SEPARATOR);
            line.push_str(name);
        }
    }
    if let Some(address) = non_empty(location.address.as_deref()) {
        if !line.is_empty() {
            line.push_str(", ");
        }
        line.push_str(address);
    }
    line
}

fn detail_actions(event: &EventRecord) -> Vec<DetailAction> {
    let mut actions = Vec::new();

    if let Some(registration) = event.registration.as_ref() {
        if let Some(phone) = non_empty(registration.phone.as_deref()) {
            match tel_href(phone) {
                Some(href) => actions.push(DetailAction {
                    kind: ActionKind::Phone,
                    href,
                    label: call_label(registration.contact_name.as_deref()),
                    opens_new_tab: false,
                }),
                None => warn!(title = %event.title, phone, "phone number has no dialable digits"),
            }
        }
        if let Some(email) = non_empty(registration.email.as_deref()) {
            actions.push(DetailAction {
                kind: ActionKind::Email,
                href: mailto_href(email),
                label: DEFAULT_EMAIL_LABEL.to_string(),
                opens_new_tab: false,
            });
        }
    }

    if let Some(cta) = event.cta.as_ref() {
        if let Some(href) = non_empty(cta.href.as_deref()) {
            actions.push(DetailAction {
                kind: ActionKind::Link,
                href: href.to_string(),
                label: non_empty(cta.label.as_deref())
                    .unwrap_or(DEFAULT_LINK_LABEL)
                    .to_string(),
                opens_new_tab: true,
            });
        }
    }

    actions
}

fn call_label(contact_name: Option<&str>) -> String {
    match non_empty(contact_name).and_then(|name| name.split_whitespace().next()) {
        Some(first_name) => format!("{DEFAULT_CALL_LABEL} {first_name}"),
        None => DEFAULT_CALL_LABEL.to_string(),
    }
}

/// `tel:` link keeping only digits and `+`; `None` when nothing dialable remains.
pub fn tel_href(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|character| character.is_ascii_digit() || *character == '+')
        .collect();
    if digits.chars().any(|character| character.is_ascii_digit()) {
        Some(format!("tel:{digits}"))
    } else {
        None
    }
}

pub fn mailto_href(email: &str) -> String {
    format!("mailto:{}", email.trim())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
