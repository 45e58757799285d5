//! The `transport` module exposes the broker over HTTP.
//!
//! It defines the publish request payload and implements the two endpoints
//! of the service: a `text/event-stream` subscription endpoint that streams
//! broker deliveries through the crate's own encoder, and a JSON publish
//! endpoint that forwards messages to the broker.

pub mod http;
pub mod publish;

pub use http::{router, serve, AppState};
pub use publish::PublishRequest;
