use crate::application::bootstrap::bootstrap_workspace;
use crate::application::feed_loader::{FeedLoader, RetryPolicy};
use crate::application::presenter::{DisplayFields, present};
use crate::application::view_state::{NavigationAction, RenderedView, ViewState};
use crate::domain::models::{EventRecord, parse_date_key};
use crate::domain::occurrence_index::OccurrenceIndex;
use crate::infrastructure::config::CalendarConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed_client::EventFeedClient;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

pub type TodayProvider = Arc<dyn Fn(Tz) -> NaiveDate + Send + Sync>;

pub struct AppState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    config: CalendarConfig,
    display_tz: Tz,
    today_provider: TodayProvider,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let display_tz = bootstrap.config.display_tz()?;
        let today_provider: TodayProvider =
            Arc::new(|timezone: Tz| Utc::now().with_timezone(&timezone).date_naive());
        let today = today_provider(display_tz);

        Ok(Self {
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            config: bootstrap.config,
            display_tz,
            today_provider,
            runtime: Mutex::new(RuntimeState::new(today)),
            log_guard: Mutex::new(()),
        })
    }

    /// Replaces the clock and resets the view to the month containing the new `today`.
    pub fn with_today_provider(mut self, today_provider: TodayProvider) -> Self {
        self.today_provider = today_provider;
        let today = self.today();
        if let Ok(runtime) = self.runtime.get_mut() {
            runtime.view = ViewState::initial(today);
        }
        self
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn display_tz(&self) -> Tz {
        self.display_tz
    }

    pub fn today(&self) -> NaiveDate {
        (self.today_provider)(self.display_tz)
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        info!(command, "{message}");
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        error!(command, "{message}");
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug)]
struct RuntimeState {
    events: Vec<Arc<EventRecord>>,
    index: Arc<OccurrenceIndex>,
    view: ViewState,
}

impl RuntimeState {
    fn new(today: NaiveDate) -> Self {
        Self {
            events: Vec::new(),
            index: Arc::new(OccurrenceIndex::default()),
            view: ViewState::initial(today),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub event_count: usize,
    pub occurrence_count: usize,
    pub day_count: usize,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub view: RenderedView,
    /// False when the feed produced no occurrences at all.
    pub has_events: bool,
    /// True when nothing falls inside the visible range.
    pub is_empty: bool,
}

/// Fetches the feed through `client` and swaps in a freshly built index. Feed
/// failures leave the calendar empty rather than failing the command.
pub async fn load_events_impl<C>(state: &AppState, client: Arc<C>) -> Result<LoadSummary, InfraError>
where
    C: EventFeedClient,
{
    let loader =
        FeedLoader::new(client).with_retry_policy(RetryPolicy::from(&state.config.retry));
    let events = loader.load_or_empty().await;
    replace_events_impl(state, events)
}

pub fn replace_events_impl(
    state: &AppState,
    events: Vec<EventRecord>,
) -> Result<LoadSummary, InfraError> {
    let window = state.config.expansion_window(state.today());
    let events: Vec<Arc<EventRecord>> = events.into_iter().map(Arc::new).collect();
    let index = OccurrenceIndex::build_with_ordering(&events, &window, state.config.day_ordering);

    let summary = LoadSummary {
        event_count: events.len(),
        occurrence_count: index.len(),
        day_count: index.day_count(),
        window_start: window.start,
        window_end: window.end(),
    };

    let mut runtime = lock_runtime(state)?;
    runtime.events = events;
    runtime.index = Arc::new(index);
    drop(runtime);

    state.log_info(
        "load_events",
        &format!(
            "indexed {} occurrences across {} days from {} events",
            summary.occurrence_count, summary.day_count, summary.event_count
        ),
    );
    Ok(summary)
}

pub fn render_view_impl(state: &AppState) -> Result<RenderResponse, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(render_response(runtime.view, &runtime.index))
}

pub fn navigate_impl(state: &AppState, action: NavigationAction) -> Result<RenderResponse, InfraError> {
    let today = state.today();
    let mut runtime = lock_runtime(state)?;
    runtime.view = runtime.view.apply(action, today);
    let response = render_response(runtime.view, &runtime.index);
    drop(runtime);

    state.log_info("navigate", &format!("{action:?} -> {}", response.view.title()));
    Ok(response)
}

/// Detail fields for the occurrence at `position` within the day `date_key`.
/// `None` when the day has no occurrence at that position.
pub fn present_detail_impl(
    state: &AppState,
    date_key: &str,
    position: usize,
) -> Result<Option<DisplayFields>, InfraError> {
    let Some(date) = parse_date_key(date_key) else {
        return Ok(None);
    };
    let index = current_index(state)?;
    Ok(index
        .query_date(date)
        .get(position)
        .map(|occurrence| present(occurrence, state.display_tz)))
}

pub fn upcoming_events_impl(state: &AppState) -> Result<Vec<DisplayFields>, InfraError> {
    let index = current_index(state)?;
    Ok(index
        .upcoming(state.today(), state.config.upcoming_limit)
        .iter()
        .map(|occurrence| present(occurrence, state.display_tz))
        .collect())
}

pub fn event_count_impl(state: &AppState) -> Result<usize, InfraError> {
    Ok(lock_runtime(state)?.events.len())
}

fn render_response(view: ViewState, index: &OccurrenceIndex) -> RenderResponse {
    let view = view.render(index);
    RenderResponse {
        has_events: !index.is_empty(),
        is_empty: view.is_empty(),
        view,
    }
}

fn current_index(state: &AppState) -> Result<Arc<OccurrenceIndex>, InfraError> {
    Ok(Arc::clone(&lock_runtime(state)?.index))
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::StateLock(format!("runtime lock poisoned: {error}")))
}
