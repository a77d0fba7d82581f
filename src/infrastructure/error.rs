use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Feed error: {0}")]
    Feed(String),
    #[error("Feed returned http {status}")]
    FeedStatus { status: u16, body: String },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid timezone: {0}")]
    Timezone(String),
    #[error("State lock poisoned: {0}")]
    StateLock(String),
}
