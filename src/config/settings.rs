use std::time::Duration;

use serde::Deserialize;

use crate::broker::BrokerConfig;
use crate::replay::{Finite, Noop, ReplayProvider, Valid};

/// Top-level configuration settings for the application.
///
/// Aggregates the network settings for the HTTP front-end and the
/// operational parameters for the broker, including its replay policy.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Configuration for the HTTP server, such as host and port.
    pub server: ServerSettings,
    /// Configuration for the broker, such as buffering and replay.
    pub broker: BrokerSettings,
}

/// Configuration settings for the HTTP server.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// The host address (e.g., "127.0.0.1" or "0.0.0.0") the server will bind to.
    pub host: String,
    /// The port number the server will listen on.
    pub port: u16,
}

/// Configuration settings for the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// Capacity of the channel publishers enqueue messages on.
    pub message_channel_buffer: usize,
    /// Milliseconds a delivery may wait for a slow subscriber before the
    /// message is dropped for it. Zero sends without waiting.
    pub send_timeout_ms: u64,
    /// Capacity of each subscriber's delivery channel.
    pub subscriber_buffer: usize,
    /// Seconds between keep-alive comments on idle event streams.
    pub keep_alive_secs: u64,
    /// The replay policy applied to new subscribers.
    pub replay: ReplaySettings,
}

/// Configuration for message replay.
#[derive(Debug, Deserialize, Clone)]
pub struct ReplaySettings {
    /// Which retention policy backs replay.
    pub policy: ReplayPolicy,
    /// How many messages the `finite` policy retains.
    pub finite_count: usize,
    /// Whether the replay buffer assigns event IDs itself.
    pub auto_ids: bool,
    /// Seconds between replay GC runs; zero disables collection.
    pub gc_interval_secs: u64,
}

/// The retention policies a broker can be configured with.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplayPolicy {
    /// No replay; new subscribers only see new messages.
    None,
    /// Replay up to the latest `finite_count` messages.
    Finite,
    /// Replay every buffered message that has not expired.
    Valid,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled from
/// `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub message_channel_buffer: Option<usize>,
    pub send_timeout_ms: Option<u64>,
    pub subscriber_buffer: Option<usize>,
    pub keep_alive_secs: Option<u64>,
    pub replay: Option<PartialReplaySettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialReplaySettings {
    pub policy: Option<ReplayPolicy>,
    pub finite_count: Option<usize>,
    pub auto_ids: Option<bool>,
    pub gc_interval_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            broker: BrokerSettings {
                message_channel_buffer: 1,
                send_timeout_ms: 0,
                subscriber_buffer: 16,
                keep_alive_secs: 15,
                replay: ReplaySettings {
                    policy: ReplayPolicy::None,
                    finite_count: 64,
                    auto_ids: true,
                    gc_interval_secs: 0,
                },
            },
        }
    }
}

impl BrokerSettings {
    /// Builds the broker construction options these settings describe.
    pub fn broker_config(&self) -> BrokerConfig {
        let replay_provider: Box<dyn ReplayProvider> = match self.replay.policy {
            ReplayPolicy::None => Box::new(Noop),
            ReplayPolicy::Finite => {
                Box::new(Finite::new(self.replay.finite_count, self.replay.auto_ids))
            }
            ReplayPolicy::Valid => Box::new(Valid::new(self.replay.auto_ids)),
        };

        BrokerConfig {
            message_channel_buffer: self.message_channel_buffer,
            replay_provider,
            replay_gc_interval: nonzero_secs(self.replay.gc_interval_secs),
            send_timeout: nonzero_millis(self.send_timeout_ms),
        }
    }

    /// The per-subscriber delivery wait, or `None` for non-blocking sends.
    pub fn send_timeout(&self) -> Option<Duration> {
        nonzero_millis(self.send_timeout_ms)
    }

    /// The keep-alive cadence for idle event streams.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

fn nonzero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn nonzero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
