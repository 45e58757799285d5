use tracing::{error, info};

use ssepub::broker::Broker;
use ssepub::config::load_settings;
use ssepub::transport::{self, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return;
        }
    };

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let broker = Broker::new(settings.broker.broker_config());
    let state = AppState {
        broker: broker.clone(),
        subscriber_buffer: settings.broker.subscriber_buffer,
        keep_alive: settings.broker.keep_alive(),
    };

    // Serve until interrupted; stopping the broker closes every open
    // event stream.
    tokio::select! {
        result = transport::serve(&addr, state) => {
            if let Err(e) = result {
                error!("HTTP server exited unexpectedly: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping the broker");
            let _ = broker.stop();
        }
    }
}
