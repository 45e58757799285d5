use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::broker::{Broker, Subscription};
use crate::message::Message;
use crate::utils::error::ServerError;

use super::publish::PublishRequest;

const LAST_EVENT_ID: HeaderName = HeaderName::from_static("last-event-id");

/// Shared state handed to every HTTP handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The broker requests publish to and subscribe on.
    pub broker: Broker,
    /// Capacity of each subscriber's delivery channel.
    pub subscriber_buffer: usize,
    /// Cadence of keep-alive comments on idle streams. Zero disables them.
    pub keep_alive: Duration,
}

/// Builds the HTTP router: `GET /events` to subscribe, `POST /publish` to
/// publish.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(subscribe_events))
        .route("/publish", post(publish_message))
        .with_state(state)
}

/// Binds `addr` and serves the router until the listener fails.
pub async fn serve(addr: &str, state: AppState) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_owned(),
            source,
        })?;

    info!("SSE server listening on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .map_err(ServerError::Serve)
}

#[derive(Debug, Deserialize)]
struct SubscribeQuery {
    /// Comma-separated topic names; absent or empty selects the default
    /// topic.
    topics: Option<String>,
}

async fn subscribe_events(
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
) -> Response {
    let topics: Vec<String> = query
        .topics
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|topic| !topic.is_empty())
        .map(str::to_owned)
        .collect();
    let last_event_id = headers
        .get(LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let (tx, mut rx) = mpsc::channel(state.subscriber_buffer.max(1));
    let subscription = Subscription {
        channel: tx,
        topics,
        last_event_id,
    };

    let ctx = CancellationToken::new();
    if state
        .broker
        .subscribe(ctx.clone(), subscription)
        .await
        .is_err()
    {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let connection = Uuid::new_v4();
    info!(%connection, "subscriber connected");

    let guard = Disconnect { ctx, connection };
    let keep_alive = state.keep_alive;
    let body = stream! {
        // Held for the stream's whole life; dropping it (client gone or
        // response aborted) cancels the subscription.
        let _guard = guard;
        let mut heartbeat = (!keep_alive.is_zero())
            .then(|| interval_at(Instant::now() + keep_alive, keep_alive));

        loop {
            tokio::select! {
                delivered = rx.recv() => match delivered {
                    Some(message) => yield Ok::<Bytes, Infallible>(encode_frame(&message)),
                    // The broker closed the sink: unsubscribed or shut down.
                    None => break,
                },
                _ = heartbeat_tick(&mut heartbeat), if heartbeat.is_some() => {
                    yield Ok(Bytes::from_static(b": keep-alive\n\n"));
                },
            }
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            // Disable proxy buffering so events are not held back.
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

async fn publish_message(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> StatusCode {
    match state.broker.publish(request.into_message()).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(_closed) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// Cancels the subscription context when the response stream is dropped.
struct Disconnect {
    ctx: CancellationToken,
    connection: Uuid,
}

impl Drop for Disconnect {
    fn drop(&mut self) {
        debug!(connection = %self.connection, "subscriber stream closed");
        self.ctx.cancel();
    }
}

fn encode_frame(message: &Message) -> Bytes {
    let mut frame = Vec::with_capacity(64);
    message
        .write_to(&mut frame)
        .expect("writing to a Vec cannot fail");
    Bytes::from(frame)
}

async fn heartbeat_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
