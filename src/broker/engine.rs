use std::collections::{HashMap, HashSet};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::message::Message;
use crate::replay::{Noop, ReplayProvider};

use super::subscription::{Sink, Subscription, DEFAULT_TOPIC};

/// Error returned by broker operations once the broker has been stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the broker has been stopped")]
pub struct Closed;

/// Tuning knobs for a [`Broker`].
pub struct BrokerConfig {
    /// Capacity of the channel on which publishers hand messages to the
    /// event loop. Raise it if publishers block because the loop cannot
    /// keep up. Defaults to 1.
    pub message_channel_buffer: usize,
    /// The replay provider consulted on every publish and subscribe.
    /// Defaults to [`Noop`], which replays nothing.
    pub replay_provider: Box<dyn ReplayProvider>,
    /// How often the replay provider's GC runs. `None` disables collection;
    /// see the chosen provider for whether it needs any.
    pub replay_gc_interval: Option<Duration>,
    /// How long a delivery may wait for a subscriber to take a message.
    /// `None` sends without waiting and drops the message for any
    /// subscriber whose channel is full.
    pub send_timeout: Option<Duration>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            message_channel_buffer: 1,
            replay_provider: Box::new(Noop),
            replay_gc_interval: None,
            send_timeout: None,
        }
    }
}

/// The central component that routes published messages to subscribers.
///
/// A `Broker` is a cloneable handle to a dedicated event-loop task. The loop
/// owns every piece of mutable state (the topic table, the subscriber set,
/// and the replay provider) and serializes all operations, so publishing,
/// subscribing, and stopping never contend on locks; they queue work on the
/// loop's channels instead.
///
/// Subscribers are served best-effort: a subscriber that cannot take a
/// message within the configured send timeout misses it, and is removed
/// only when its own cancellation token fires or the broker stops. On
/// shutdown the loop closes every subscriber's channel exactly once.
#[derive(Debug, Clone)]
pub struct Broker {
    message_tx: mpsc::Sender<Message>,
    subscription_tx: mpsc::Sender<PendingSubscription>,
    unsubscription_tx: mpsc::Sender<SinkId>,
    shutdown: CancellationToken,
}

type SinkId = Uuid;

// A subscription tagged with the registry key its unsubscription watcher
// will use to remove it.
#[derive(Debug)]
struct PendingSubscription {
    id: SinkId,
    subscription: Subscription,
}

impl Broker {
    /// Creates a broker and starts its event-loop task.
    pub fn new(config: BrokerConfig) -> Self {
        let (message_tx, message_rx) = mpsc::channel(config.message_channel_buffer.max(1));
        let (subscription_tx, subscription_rx) = mpsc::channel(1);
        let (unsubscription_tx, unsubscription_rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();

        let event_loop = EventLoop {
            message_rx,
            subscription_rx,
            unsubscription_rx,
            shutdown: shutdown.clone(),
            replay: config.replay_provider,
            send_timeout: config.send_timeout,
            topics: HashMap::new(),
            subscribers: HashMap::new(),
        };
        tokio::spawn(event_loop.run(config.replay_gc_interval));

        Self {
            message_tx,
            subscription_tx,
            unsubscription_tx,
            shutdown,
        }
    }

    /// Queues a message for delivery to the subscribers of its topic.
    ///
    /// A message with an empty topic is routed to [`DEFAULT_TOPIC`]. The
    /// call returns once the event loop has accepted the message, not once
    /// subscribers have received it.
    pub async fn publish(&self, mut message: Message) -> Result<(), Closed> {
        if message.topic.is_empty() {
            message.topic = DEFAULT_TOPIC.to_owned();
        }

        tokio::select! {
            sent = self.message_tx.send(message) => sent.map_err(|_| Closed),
            () = self.shutdown.cancelled() => Err(Closed),
        }
    }

    /// Registers a subscription.
    ///
    /// The event loop first replays any history the subscriber is owed,
    /// then adds it to each requested topic (an empty topic list selects
    /// [`DEFAULT_TOPIC`]). Subscribing the same channel twice is a no-op.
    ///
    /// Cancelling `ctx` unsubscribes: the broker removes the subscriber
    /// and closes its channel, after which the receiving half yields
    /// `None`. Broker shutdown closes the channel the same way.
    pub async fn subscribe(
        &self,
        ctx: CancellationToken,
        mut subscription: Subscription,
    ) -> Result<(), Closed> {
        if subscription.topics.is_empty() {
            subscription.topics.push(DEFAULT_TOPIC.to_owned());
        }

        let id = Uuid::new_v4();
        let unsubscription_tx = self.unsubscription_tx.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            // Also watch for shutdown so this task isn't left hanging when
            // the broker stops before the subscriber's context does.
            tokio::select! {
                () = ctx.cancelled() => {}
                () = shutdown.cancelled() => return,
            }
            // The loop may already be gone; shutdown keeps the send from
            // blocking forever in that case.
            tokio::select! {
                _ = unsubscription_tx.send(id) => {}
                () = shutdown.cancelled() => {}
            }
        });

        tokio::select! {
            sent = self.subscription_tx.send(PendingSubscription { id, subscription }) => {
                sent.map_err(|_| Closed)
            }
            () = self.shutdown.cancelled() => Err(Closed),
        }
    }

    /// Stops the broker.
    ///
    /// The first call signals shutdown and returns `Ok`; later calls return
    /// `Closed`. Stopping is asynchronous: the event loop drains on its next
    /// iteration, closing every subscriber channel as it exits.
    pub fn stop(&self) -> Result<(), Closed> {
        if self.shutdown.is_cancelled() {
            return Err(Closed);
        }
        self.shutdown.cancel();
        Ok(())
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(BrokerConfig::default())
    }
}

// All broker state lives here, owned by the single loop task. Subscriber
// sinks are closed by dropping them; the loop holds the only sender clones,
// so dropping this struct (on a normal exit or while unwinding from a panic
// in the replay provider) closes every remaining subscriber exactly once.
struct EventLoop {
    message_rx: mpsc::Receiver<Message>,
    subscription_rx: mpsc::Receiver<PendingSubscription>,
    unsubscription_rx: mpsc::Receiver<SinkId>,
    shutdown: CancellationToken,
    replay: Box<dyn ReplayProvider>,
    send_timeout: Option<Duration>,
    topics: HashMap<String, HashSet<SinkId>>,
    subscribers: HashMap<SinkId, Sink>,
}

impl EventLoop {
    async fn run(mut self, gc_interval: Option<Duration>) {
        let mut gc = gc_interval.map(|period| interval_at(Instant::now() + period, period));

        loop {
            tokio::select! {
                message = self.message_rx.recv() => match message {
                    Some(message) => self.on_message(message).await,
                    None => break,
                },
                pending = self.subscription_rx.recv() => match pending {
                    Some(pending) => self.on_subscription(pending).await,
                    None => break,
                },
                id = self.unsubscription_rx.recv() => match id {
                    Some(id) => self.on_unsubscription(id),
                    None => break,
                },
                _ = gc_tick(&mut gc), if gc.is_some() => {
                    if let Err(e) = self.replay.gc() {
                        debug!("disabling replay GC: {e}");
                        gc = None;
                    }
                },
                () = self.shutdown.cancelled() => break,
            }
        }
    }

    async fn on_message(&mut self, mut message: Message) {
        self.replay.put(&mut message);

        let Some(ids) = self.topics.get(&message.topic) else {
            return;
        };
        for id in ids {
            if let Some(sink) = self.subscribers.get(id) {
                deliver(sink, message.clone(), self.send_timeout).await;
            }
        }
    }

    async fn on_subscription(&mut self, pending: PendingSubscription) {
        let PendingSubscription { id, subscription } = pending;

        // Subscribing an already-registered channel is a no-op.
        if self
            .subscribers
            .values()
            .any(|sink| sink.same_channel(&subscription.channel))
        {
            return;
        }

        // Replay completes before the subscriber joins the topic tables, so
        // no live message can interleave with the replayed history.
        self.replay.replay(&subscription).await;

        for topic in &subscription.topics {
            self.topics.entry(topic.clone()).or_default().insert(id);
        }
        self.subscribers.insert(id, subscription.channel);
    }

    fn on_unsubscription(&mut self, id: SinkId) {
        for ids in self.topics.values_mut() {
            ids.remove(&id);
        }
        if self.subscribers.remove(&id).is_some() {
            // Dropping the sink closes the subscriber's channel.
            debug!(subscriber = %id, "unsubscribed");
        }
    }
}

async fn gc_tick(gc: &mut Option<Interval>) {
    match gc {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

// Best-effort delivery: without a timeout the send must succeed right away,
// otherwise it may wait up to the timeout. Either way a miss only skips
// this message for this subscriber.
async fn deliver(sink: &Sink, message: Message, send_timeout: Option<Duration>) {
    match send_timeout {
        None => {
            if let Err(e) = sink.try_send(message) {
                debug!("dropping message for a subscriber: {e}");
            }
        }
        Some(wait) => {
            if tokio::time::timeout(wait, sink.send(message)).await.is_err() {
                warn!("dropping message for a subscriber: send timed out");
            }
        }
    }
}
