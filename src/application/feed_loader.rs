use crate::domain::models::EventRecord;
use crate::infrastructure::config::RetrySettings;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::decode_event_feed;
use crate::infrastructure::feed_client::EventFeedClient;
use std::sync::Arc;
use tokio::time::{Duration as TokioDuration, sleep};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay_ms: settings.base_delay_ms,
        }
    }
}

pub struct FeedLoader<C>
where
    C: EventFeedClient,
{
    client: Arc<C>,
    retry_policy: RetryPolicy,
}

impl<C> FeedLoader<C>
where
    C: EventFeedClient,
{
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub async fn load(&self) -> Result<Vec<EventRecord>, InfraError> {
        let body = self.fetch_with_retry().await?;
        decode_event_feed(&body)
    }

    /// Feed failures degrade to an empty event list; the cause is only logged.
    pub async fn load_or_empty(&self) -> Vec<EventRecord> {
        match self.load().await {
            Ok(events) => {
                info!(count = events.len(), "loaded event feed");
                events
            }
            Err(error) => {
                error!(%error, "event feed unavailable, continuing with no events");
                Vec::new()
            }
        }
    }

    async fn fetch_with_retry(&self) -> Result<String, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.client.fetch_feed().await {
                Ok(body) => return Ok(body),
                Err(error) if should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(u32::from(attempt)));
                    warn!(%error, attempt = attempt + 1, delay_ms = delay, "retrying event feed fetch");
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn should_retry(error: &InfraError) -> bool {
    match error {
        InfraError::Feed(message) => {
            let message = message.to_ascii_lowercase();
            message.contains("network error")
                || message.contains("timeout")
                || message.contains("timed out")
                || message.contains("connection reset")
        }
        InfraError::FeedStatus { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}
