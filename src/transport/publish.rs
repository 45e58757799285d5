use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use crate::message::Message;

/// The JSON body accepted by the publish endpoint.
///
/// Only `data` is required; everything else falls back to the message
/// model's zero values (no ID, unnamed event, default topic, no retry
/// hint, no expiry).
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Topic to route the message to. Empty selects the default topic.
    #[serde(default)]
    pub topic: String,
    /// The event type sent as the `event:` field.
    #[serde(default)]
    pub event: String,
    /// The event ID. Replay providers with auto-IDs overwrite it.
    #[serde(default)]
    pub id: String,
    /// Client reconnection delay in milliseconds.
    #[serde(default)]
    pub retry_ms: u64,
    /// How long the message stays valid for replay, in milliseconds.
    /// Omitted means it never expires.
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    /// Payload lines. Each entry may itself span multiple lines and is
    /// split into chunks accordingly.
    pub data: Vec<String>,
}

impl PublishRequest {
    /// Builds the broker message this request describes.
    pub fn into_message(self) -> Message {
        let mut message = Message {
            id: self.id,
            event_type: self.event,
            topic: self.topic,
            retry: Duration::from_millis(self.retry_ms),
            ..Message::default()
        };
        if let Some(ttl) = self.ttl_ms {
            message.expires_at = Some(Instant::now() + Duration::from_millis(ttl));
        }
        message.append_data(self.data);
        message
    }
}
