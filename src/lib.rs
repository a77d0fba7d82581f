pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{
    AppState, LoadSummary, RenderResponse, load_events_impl, navigate_impl, present_detail_impl,
    render_view_impl, replace_events_impl, upcoming_events_impl,
};
pub use application::presenter::{DetailAction, DisplayFields};
pub use application::view_state::{NavigationAction, RenderedView, ViewState};
pub use domain::models::{EventRecord, Occurrence, RecurrenceRule, YearMonth};
pub use infrastructure::error::InfraError;

use infrastructure::feed_client::{FileEventFeedClient, ReqwestEventFeedClient};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

const ENV_BASE_URL: &str = "CALENDAR_BASE_URL";

/// Bootstraps `workspace_root` and loads the configured feed. A local `feedPath`
/// takes precedence over `feedUrl`; relative paths resolve against the workspace.
pub async fn start(workspace_root: &Path, base_url: Option<&Url>) -> Result<AppState, InfraError> {
    let state = AppState::new(workspace_root.to_path_buf())?;

    let summary = match state.config().feed_path.clone() {
        Some(path) => {
            let path = if path.is_relative() {
                workspace_root.join(path)
            } else {
                path
            };
            load_events_impl(&state, Arc::new(FileEventFeedClient::new(path))).await?
        }
        None => match remote_client(&state, base_url) {
            Ok(client) => load_events_impl(&state, Arc::new(client)).await?,
            Err(error) => {
                state.log_error("start", &format!("event feed unavailable: {error}"));
                replace_events_impl(&state, Vec::new())?
            }
        },
    };
    state.log_info(
        "start",
        &format!(
            "calendar ready with {} events ({} occurrences)",
            summary.event_count, summary.occurrence_count
        ),
    );
    Ok(state)
}

fn remote_client(
    state: &AppState,
    base_url: Option<&Url>,
) -> Result<ReqwestEventFeedClient, InfraError> {
    let url = state.config().resolve_feed_url(base_url)?;
    ReqwestEventFeedClient::new(url, state.config().feed_timeout())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartupSnapshot {
    workspace_root: String,
    current: RenderResponse,
    upcoming: Vec<DisplayFields>,
}

/// Starts from the current directory and prints the initial view as JSON.
pub async fn run() {
    let workspace_root: PathBuf = std::env::current_dir().expect("failed to resolve current directory");
    let base_url = std::env::var(ENV_BASE_URL)
        .ok()
        .map(|raw| Url::parse(raw.trim()).expect("CALENDAR_BASE_URL must be an absolute URL"));

    let state = start(&workspace_root, base_url.as_ref())
        .await
        .expect("failed to initialize calendar");
    let snapshot = StartupSnapshot {
        workspace_root: workspace_root.display().to_string(),
        current: render_view_impl(&state)
            .map_err(|error| state.command_error("render_view", &error))
            .expect("failed to render calendar"),
        upcoming: upcoming_events_impl(&state)
            .map_err(|error| state.command_error("upcoming_events", &error))
            .expect("failed to collect upcoming events"),
    };

    let output = serde_json::to_string_pretty(&snapshot).expect("failed to encode snapshot");
    println!("{output}");
}
