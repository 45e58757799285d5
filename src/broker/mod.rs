//! The `broker` module is the core of the SSE fan-out system.
//!
//! It contains the following main components:
//!
//! - `Broker`: a handle to the single-task event loop that owns all topic
//!   and subscriber state and serializes publish, subscribe, unsubscribe,
//!   replay, and GC.
//! - `Subscription`: a subscriber's delivery channel, topic selection, and
//!   last-seen event ID.
//! - `BrokerConfig`: construction-time tuning (channel buffering, replay
//!   provider, GC cadence, send timeout).
//!
//! The broker delivers best-effort: slow subscribers miss messages rather
//! than slowing publishers down.

pub mod engine;
pub mod subscription;

pub use engine::{Broker, BrokerConfig, Closed};
pub use subscription::{Sink, Subscription, DEFAULT_TOPIC};
