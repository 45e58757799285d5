use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

use crate::broker::Subscription;
use crate::message::Message;

use super::buffer::Buffer;

/// Error raised by replay operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// No buffered message carries the requested ID.
    #[error("no buffered message with ID {id:?}")]
    IdNotFound { id: String },
    /// The provider has nothing to collect; the broker stops scheduling GC.
    #[error("the replay provider does not support garbage collection")]
    GcUnsupported,
}

/// A source of historical messages for newly arriving subscribers.
///
/// The broker owns its provider and guarantees at most one outstanding call
/// at any time, so implementations need no internal locking. `put` runs on
/// every published message and may rewrite the message's ID; `replay` must
/// deliver everything the subscriber is owed before it returns, because the
/// broker registers the subscriber for live messages immediately after.
#[async_trait]
pub trait ReplayProvider: Send {
    /// Adds a published message to the replay buffer. Providers that assign
    /// IDs mutate the message so the live fanout carries the ID too.
    fn put(&mut self, message: &mut Message);

    /// Sends to `subscription.channel` every buffered message on one of the
    /// subscription's topics that is strictly newer than its last-seen
    /// event ID, in original insertion order. An unknown or absent ID
    /// replays nothing; the subscriber just tails live messages.
    async fn replay(&mut self, subscription: &Subscription);

    /// Reclaims buffered messages that are no longer replayable. Returning
    /// an error tells the broker the provider never needs collection and
    /// stops further calls.
    fn gc(&mut self) -> Result<(), ReplayError>;
}

/// A replay provider that remembers nothing. Used when replay is not
/// desired; this is the broker's default.
#[derive(Debug, Default)]
pub struct Noop;

#[async_trait]
impl ReplayProvider for Noop {
    fn put(&mut self, _message: &mut Message) {}

    async fn replay(&mut self, _subscription: &Subscription) {}

    fn gc(&mut self) -> Result<(), ReplayError> {
        Err(ReplayError::GcUnsupported)
    }
}

/// A replay provider bounded by message count.
///
/// Once `count` messages are buffered, each new message evicts the oldest.
/// Expiry times are never consulted; capacity alone decides eviction, so
/// GC has nothing to do.
#[derive(Debug)]
pub struct Finite {
    count: usize,
    buffer: Buffer,
}

impl Finite {
    /// Creates a provider that replays at most the latest `count` messages.
    /// Messages must arrive with unique IDs unless `auto_ids` is set, in
    /// which case the buffer numbers them itself.
    pub fn new(count: usize, auto_ids: bool) -> Self {
        Self {
            count,
            buffer: Buffer::new(auto_ids, count),
        }
    }
}

#[async_trait]
impl ReplayProvider for Finite {
    fn put(&mut self, message: &mut Message) {
        if self.buffer.len() == self.count {
            self.buffer.dequeue();
        }
        self.buffer.queue(message);
    }

    async fn replay(&mut self, subscription: &Subscription) {
        replay_after(&self.buffer, subscription, None).await;
    }

    fn gc(&mut self) -> Result<(), ReplayError> {
        Ok(())
    }
}

/// An unbounded replay provider that filters by message validity.
///
/// Messages stay buffered until their `expires_at` passes; messages without
/// an expiry never leave, so this provider can also replay an unlimited
/// history. Schedule GC periodically to release expired entries.
#[derive(Debug)]
pub struct Valid {
    buffer: Buffer,
}

impl Valid {
    /// Creates a provider that replays all buffered messages still valid at
    /// replay time. Messages must arrive with unique IDs unless `auto_ids`
    /// is set.
    pub fn new(auto_ids: bool) -> Self {
        Self {
            buffer: Buffer::new(auto_ids, 0),
        }
    }
}

#[async_trait]
impl ReplayProvider for Valid {
    fn put(&mut self, message: &mut Message) {
        self.buffer.queue(message);
    }

    async fn replay(&mut self, subscription: &Subscription) {
        replay_after(&self.buffer, subscription, Some(Instant::now())).await;
    }

    fn gc(&mut self) -> Result<(), ReplayError> {
        let now = Instant::now();
        while let Some(front) = self.buffer.front() {
            match front.expires_at {
                Some(at) if at < now => {
                    self.buffer.dequeue();
                }
                _ => break,
            }
        }
        Ok(())
    }
}

// Sends the buffered messages after the subscription's anchor, filtered to
// its topics and, when `now` is given, to messages still valid at `now`.
// A missing or unknown anchor replays nothing; a closed sink aborts early.
async fn replay_after(buffer: &Buffer, subscription: &Subscription, now: Option<Instant>) {
    let Some(from_id) = subscription.last_event_id.as_deref() else {
        return;
    };
    let Ok(events) = buffer.slice(from_id) else {
        return;
    };

    for event in events.skip(1) {
        if let Some(now) = now {
            if event.expires_at.is_some_and(|at| at <= now) {
                continue;
            }
        }
        if !subscription.topics.iter().any(|topic| *topic == event.topic) {
            continue;
        }
        if subscription.channel.send(event.clone()).await.is_err() {
            return;
        }
    }
}
