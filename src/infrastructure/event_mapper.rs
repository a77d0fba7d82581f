use crate::domain::models::EventRecord;
use crate::infrastructure::error::InfraError;
use tracing::warn;

/// Decodes the feed body. The body must be a JSON array; records that fail to decode or
/// validate are skipped so one bad entry never hides the rest of the feed.
pub fn decode_event_feed(body: &str) -> Result<Vec<EventRecord>, InfraError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body)?;
    let mut events = Vec::with_capacity(records.len());

    for (position, record) in records.into_iter().enumerate() {
        match decode_event_record(record) {
            Ok(event) => events.push(event),
            Err(reason) => warn!(position, %reason, "skipping malformed event record"),
        }
    }

    Ok(events)
}

fn decode_event_record(record: serde_json::Value) -> Result<EventRecord, String> {
    let event: EventRecord = serde_json::from_value(record).map_err(|error| error.to_string())?;
    event.validate()?;
    Ok(event)
}
