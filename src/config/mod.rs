//! The `config` module handles the application's configuration management.
//!
//! It defines the structure of the application settings, provides default
//! values, and implements the logic for loading configuration from files
//! and environment variables.
//!
//! This module uses the `config` crate for flexible and layered
//! configuration.

pub mod settings;

use ::config::{Config, ConfigError, Environment, File};

use crate::config::settings::PartialSettings;

pub use settings::{
    BrokerSettings, ReplayPolicy, ReplaySettings, ServerSettings, Settings,
};

/// Loads application settings from file, environment, and defaults.
///
/// Values are read from an optional `config/default` file (TOML/YAML/JSON)
/// and then from environment variables with `__` separators (e.g.,
/// `SERVER__PORT`, `BROKER__REPLAY__POLICY`). Missing fields are filled
/// from [`Settings::default`].
///
/// # Errors
///
/// Returns an error if the config file cannot be parsed or deserialized.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("__"));

    let config = builder.build()?;

    // Deserialize what is available, then fill the gaps with defaults.
    let partial: PartialSettings = config.try_deserialize()?;
    Ok(merge(partial))
}

fn merge(partial: PartialSettings) -> Settings {
    let default = Settings::default();

    let server = partial.server.unwrap_or(settings::PartialServerSettings {
        host: None,
        port: None,
    });
    let broker = partial.broker.unwrap_or(settings::PartialBrokerSettings {
        message_channel_buffer: None,
        send_timeout_ms: None,
        subscriber_buffer: None,
        keep_alive_secs: None,
        replay: None,
    });
    let replay = broker.replay.unwrap_or(settings::PartialReplaySettings {
        policy: None,
        finite_count: None,
        auto_ids: None,
        gc_interval_secs: None,
    });

    Settings {
        server: ServerSettings {
            host: server.host.unwrap_or(default.server.host),
            port: server.port.unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            message_channel_buffer: broker
                .message_channel_buffer
                .unwrap_or(default.broker.message_channel_buffer),
            send_timeout_ms: broker
                .send_timeout_ms
                .unwrap_or(default.broker.send_timeout_ms),
            subscriber_buffer: broker
                .subscriber_buffer
                .unwrap_or(default.broker.subscriber_buffer),
            keep_alive_secs: broker
                .keep_alive_secs
                .unwrap_or(default.broker.keep_alive_secs),
            replay: ReplaySettings {
                policy: replay.policy.unwrap_or(default.broker.replay.policy),
                finite_count: replay
                    .finite_count
                    .unwrap_or(default.broker.replay.finite_count),
                auto_ids: replay.auto_ids.unwrap_or(default.broker.replay.auto_ids),
                gc_interval_secs: replay
                    .gc_interval_secs
                    .unwrap_or(default.broker.replay.gc_interval_secs),
            },
        },
    }
}

#[cfg(test)]
mod tests;
