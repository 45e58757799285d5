use tokio::sync::mpsc;

use crate::message::Message;

/// The topic used when a publisher or subscriber names none.
///
/// A message published with an empty topic and a subscription with an empty
/// topic list both normalize to this topic, so they pair up.
pub const DEFAULT_TOPIC: &str = "messages";

/// The write half of a subscriber's delivery channel.
pub type Sink = mpsc::Sender<Message>;

/// A request to receive messages from the broker.
///
/// The subscription hands its sink over to the broker: once
/// [`Broker::subscribe`](crate::broker::Broker::subscribe) accepts it, the
/// broker is the only writer and the only closer of the channel. Keep the
/// receiving half and read from it until it yields `None`, which signals
/// unsubscription or broker shutdown. Do not retain extra clones of the
/// sender, or the close signal will never arrive.
#[derive(Debug)]
pub struct Subscription {
    /// Channel on which replayed and live messages are delivered.
    pub channel: Sink,
    /// Topics to receive messages from. Empty selects [`DEFAULT_TOPIC`].
    pub topics: Vec<String>,
    /// The ID of the last event the subscriber has seen, if any. Replay
    /// providers resend the messages that came after it.
    pub last_event_id: Option<String>,
}
