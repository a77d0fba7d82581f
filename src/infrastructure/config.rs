use crate::domain::occurrence_index::DayOrdering;
use crate::domain::recurrence::{DEFAULT_MAX_OCCURRENCES, DEFAULT_WINDOW_MONTHS, ExpansionWindow};
use crate::infrastructure::error::InfraError;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

const CALENDAR_JSON: &str = "calendar.json";
const SUPPORTED_SCHEMA: u64 = 1;
const DEFAULT_FEED_URL: &str = "/static/events.json";
const DEFAULT_TIMEZONE: &str = "America/New_York";
const DEFAULT_UPCOMING_LIMIT: usize = 3;
const DEFAULT_FEED_TIMEOUT_SECONDS: u64 = 10;
const ENV_FEED_URL: &str = "CALENDAR_EVENTS_URL";
const ENV_TIMEZONE: &str = "CALENDAR_TIMEZONE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetrySettings {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarConfig {
    pub feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_path: Option<PathBuf>,
    pub display_timezone: String,
    pub window_months: u32,
    pub max_occurrences_per_event: usize,
    pub upcoming_limit: usize,
    pub day_ordering: DayOrdering,
    pub feed_timeout_seconds: u64,
    pub retry: RetrySettings,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            feed_path: None,
            display_timezone: DEFAULT_TIMEZONE.to_string(),
            window_months: DEFAULT_WINDOW_MONTHS,
            max_occurrences_per_event: DEFAULT_MAX_OCCURRENCES,
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            day_ordering: DayOrdering::Insertion,
            feed_timeout_seconds: DEFAULT_FEED_TIMEOUT_SECONDS,
            retry: RetrySettings::default(),
        }
    }
}

impl CalendarConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.window_months == 0 {
            return Err(InfraError::InvalidConfig(
                "windowMonths must be > 0".to_string(),
            ));
        }
        if self.max_occurrences_per_event == 0 {
            return Err(InfraError::InvalidConfig(
                "maxOccurrencesPerEvent must be > 0".to_string(),
            ));
        }
        if self.feed_timeout_seconds == 0 {
            return Err(InfraError::InvalidConfig(
                "feedTimeoutSeconds must be > 0".to_string(),
            ));
        }
        self.display_tz()?;
        if self.feed_path.is_none() {
            let feed_url = self.feed_url.trim();
            if !feed_url.starts_with('/') && Url::parse(feed_url).is_err() {
                return Err(InfraError::InvalidConfig(format!(
                    "feedUrl must be an absolute URL or a root-relative path: {feed_url}"
                )));
            }
        }
        Ok(())
    }

    pub fn display_tz(&self) -> Result<Tz, InfraError> {
        parse_timezone(&self.display_timezone)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_seconds)
    }

    pub fn expansion_window(&self, today: NaiveDate) -> ExpansionWindow {
        ExpansionWindow::new(today, self.window_months, self.max_occurrences_per_event)
    }

    /// Root-relative feed URLs are resolved against `base`, the origin serving the page.
    pub fn resolve_feed_url(&self, base: Option<&Url>) -> Result<Url, InfraError> {
        let feed_url = self.feed_url.trim();
        if let Ok(url) = Url::parse(feed_url) {
            return Ok(url);
        }
        let base = base.ok_or_else(|| {
            InfraError::InvalidConfig(format!(
                "feedUrl '{feed_url}' is relative and no base URL was provided"
            ))
        })?;
        base.join(feed_url).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid feedUrl '{feed_url}': {error}"))
        })
    }

    pub fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(feed_url) = non_empty_lookup(&lookup, ENV_FEED_URL) {
            self.feed_url = feed_url;
            self.feed_path = None;
        }
        if let Some(timezone) = non_empty_lookup(&lookup, ENV_TIMEZONE) {
            self.display_timezone = timezone;
        }
        self
    }
}

pub fn parse_timezone(value: &str) -> Result<Tz, InfraError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::Timezone(format!("'{value}': {error}")))
}

fn default_file() -> serde_json::Value {
    serde_json::json!({
        "schema": SUPPORTED_SCHEMA,
        "feedUrl": DEFAULT_FEED_URL,
        "displayTimezone": DEFAULT_TIMEZONE,
        "windowMonths": DEFAULT_WINDOW_MONTHS,
        "maxOccurrencesPerEvent": DEFAULT_MAX_OCCURRENCES,
        "upcomingLimit": DEFAULT_UPCOMING_LIMIT,
        "dayOrdering": "insertion",
        "feedTimeoutSeconds": DEFAULT_FEED_TIMEOUT_SECONDS,
        "retry": {
            "maxAttempts": 3,
            "baseDelayMs": 200
        }
    })
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(CALENDAR_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_file())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_config(config_dir: &Path) -> Result<CalendarConfig, InfraError> {
    load_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

pub fn load_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<CalendarConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = read_config(&config_dir.join(CALENDAR_JSON))?;
    let config: CalendarConfig = serde_json::from_value(value)?;
    let config = config.apply_overrides(lookup);
    config.validate()?;
    Ok(config)
}

fn non_empty_lookup<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
