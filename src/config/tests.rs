use super::settings::{
    PartialBrokerSettings, PartialReplaySettings, PartialServerSettings, PartialSettings,
};
use super::{merge, ReplayPolicy, Settings};

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.broker.message_channel_buffer, 1);
    assert_eq!(settings.broker.send_timeout_ms, 0);
    assert_eq!(settings.broker.subscriber_buffer, 16);
    assert_eq!(settings.broker.keep_alive_secs, 15);
    assert_eq!(settings.broker.replay.policy, ReplayPolicy::None);
    assert_eq!(settings.broker.replay.gc_interval_secs, 0);
}

#[test]
fn test_merge_fills_missing_fields_with_defaults() {
    let partial = PartialSettings {
        server: Some(PartialServerSettings {
            host: Some("0.0.0.0".to_string()),
            port: None,
        }),
        broker: Some(PartialBrokerSettings {
            message_channel_buffer: None,
            send_timeout_ms: Some(250),
            subscriber_buffer: None,
            keep_alive_secs: None,
            replay: Some(PartialReplaySettings {
                policy: Some(ReplayPolicy::Finite),
                finite_count: Some(10),
                auto_ids: None,
                gc_interval_secs: None,
            }),
        }),
    };

    let settings = merge(partial);
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.broker.send_timeout_ms, 250);
    assert_eq!(settings.broker.message_channel_buffer, 1);
    assert_eq!(settings.broker.replay.policy, ReplayPolicy::Finite);
    assert_eq!(settings.broker.replay.finite_count, 10);
    assert!(settings.broker.replay.auto_ids);
}

#[test]
fn test_merge_of_empty_partial_is_the_default() {
    let settings = merge(PartialSettings {
        server: None,
        broker: None,
    });
    assert_eq!(settings.server.host, Settings::default().server.host);
    assert_eq!(
        settings.broker.subscriber_buffer,
        Settings::default().broker.subscriber_buffer
    );
}

#[test]
fn test_broker_config_reflects_replay_policy() {
    let mut settings = Settings::default();
    settings.broker.replay.policy = ReplayPolicy::Finite;
    settings.broker.replay.gc_interval_secs = 30;
    settings.broker.send_timeout_ms = 100;

    let config = settings.broker.broker_config();
    assert_eq!(config.message_channel_buffer, 1);
    assert_eq!(
        config.replay_gc_interval,
        Some(std::time::Duration::from_secs(30))
    );
    assert_eq!(
        config.send_timeout,
        Some(std::time::Duration::from_millis(100))
    );
}
