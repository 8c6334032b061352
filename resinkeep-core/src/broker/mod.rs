//! Hierarchical publish/subscribe for change notifications.
//!
//! Connections subscribe to a [`Topic`]. Publishing to `(container, 7)`
//! reaches subscribers of `(container)` and of `(container, 7)`, but not of
//! `(container, 8)`. Each connection owns a bounded queue; a connection whose
//! queue is full or closed is dropped from every topic so one slow reader
//! cannot stall the others.

mod connection;
mod topic;

pub use connection::{Disconnect, Inbound, Transport, TransportError, serve_connection};
pub use topic::Topic;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use resinkeep_sdk::objects::ChangeEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Queue capacity per connection when nothing else is configured.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

pub type ConnectionId = u64;
pub type EventSender = mpsc::Sender<Arc<ChangeEvent>>;
pub type EventReceiver = mpsc::Receiver<Arc<ChangeEvent>>;

/// The sending half of a connection's queue, tagged with its id.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: EventSender,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

type Subscribers = HashMap<ConnectionId, EventSender>;

struct BrokerInner {
    topics: Mutex<HashMap<Topic, Subscribers>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    buffer: usize,
}

/// Shared registry of topic subscriptions. Cheap to clone.
#[derive(Clone)]
pub struct NotificationBroker {
    inner: Arc<BrokerInner>,
}

impl Default for NotificationBroker {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_BUFFER)
    }
}

impl std::fmt::Debug for NotificationBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBroker")
            .field("topics", &self.inner.topics.lock().len())
            .field("buffer", &self.inner.buffer)
            .finish()
    }
}

impl NotificationBroker {
    /// `buffer` is the per-connection queue capacity, clamped to at least 1.
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                topics: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                buffer: buffer.max(1),
            }),
        }
    }

    /// Allocate a fresh connection queue.
    ///
    /// The broker only keeps senders it was handed through [`subscribe`].
    /// Once every clone of the returned handle is dropped and the broker has
    /// forgotten the connection, the receiver yields `None`.
    ///
    /// [`subscribe`]: NotificationBroker::subscribe
    pub fn open_connection(&self) -> (ConnectionHandle, EventReceiver) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.buffer);
        (ConnectionHandle { id, sender }, receiver)
    }

    /// Register `connection` under `topic`. Subscribing twice is a no-op.
    ///
    /// Returns `false` once the broker has been shut down.
    pub fn subscribe(&self, topic: Topic, connection: &ConnectionHandle) -> bool {
        if self.inner.closed.load(Ordering::Acquire) {
            return false;
        }
        let mut topics = self.inner.topics.lock();
        // Re-check under the lock so a concurrent shutdown cannot miss us.
        if self.inner.closed.load(Ordering::Acquire) {
            return false;
        }
        topics
            .entry(topic)
            .or_default()
            .entry(connection.id)
            .or_insert_with(|| connection.sender.clone());
        true
    }

    /// Remove `connection` from `topic`. Unknown pairs are ignored.
    pub fn unsubscribe(&self, topic: &Topic, connection: ConnectionId) {
        let mut topics = self.inner.topics.lock();
        if let Entry::Occupied(mut entry) = topics.entry(topic.clone()) {
            entry.get_mut().remove(&connection);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }

    /// Remove `connection` from every topic it is subscribed to.
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut topics = self.inner.topics.lock();
        remove_connections(&mut topics, &[connection]);
    }

    /// Deliver `event` to every connection subscribed to `topic` or to any
    /// of its prefixes, at most once per connection.
    ///
    /// Never blocks. Returns the number of connections the event was queued
    /// for.
    pub fn publish(&self, topic: &Topic, event: ChangeEvent) -> usize {
        let targets: Subscribers = {
            let topics = self.inner.topics.lock();
            let mut targets = Subscribers::new();
            for prefix in topic.prefixes() {
                if let Some(subscribers) = topics.get(prefix) {
                    for (id, sender) in subscribers {
                        targets.entry(*id).or_insert_with(|| sender.clone());
                    }
                }
            }
            targets
        };
        if targets.is_empty() {
            return 0;
        }

        let event = Arc::new(event);
        let mut delivered = 0;
        let mut evicted = Vec::new();
        for (id, sender) in targets {
            match sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection = id, %topic, "Subscriber queue full, dropping connection");
                    evicted.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection = id, %topic, "Subscriber went away, dropping connection");
                    evicted.push(id);
                }
            }
        }
        if !evicted.is_empty() {
            let mut topics = self.inner.topics.lock();
            remove_connections(&mut topics, &evicted);
        }
        delivered
    }

    /// Number of connections subscribed to exactly `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.inner
            .topics
            .lock()
            .get(topic)
            .map_or(0, HashMap::len)
    }

    /// Forget every subscription and refuse new ones. Open connections see
    /// their queue close and wind down.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let dropped = std::mem::take(&mut *self.inner.topics.lock());
        tracing::info!(topics = dropped.len(), "Notification broker shut down");
    }
}

fn remove_connections(topics: &mut HashMap<Topic, Subscribers>, connections: &[ConnectionId]) {
    topics.retain(|_, subscribers| {
        for id in connections {
            subscribers.remove(id);
        }
        !subscribers.is_empty()
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use resinkeep_sdk::objects::{EventKind, EventPayload, Resource, VendorResponse};
    use time::macros::datetime;

    fn vendor_event(id: i64) -> ChangeEvent {
        ChangeEvent::new(
            EventKind::Updated,
            EventPayload::Vendor(VendorResponse {
                id,
                registered: datetime!(2024-01-01 00:00 UTC),
                name: "Acme".to_string(),
                comment: None,
                empty_container_weight: None,
            }),
            datetime!(2024-01-02 00:00 UTC),
        )
    }

    #[tokio::test]
    async fn test_prefix_subscriber_receives_child_events() {
        let broker = NotificationBroker::new(8);
        let (all, mut all_rx) = broker.open_connection();
        let (one, mut one_rx) = broker.open_connection();
        let (other, mut other_rx) = broker.open_connection();
        assert!(broker.subscribe(Topic::resource(Resource::Vendor), &all));
        assert!(broker.subscribe(Topic::entity(Resource::Vendor, 1), &one));
        assert!(broker.subscribe(Topic::entity(Resource::Vendor, 2), &other));

        let delivered = broker.publish(&Topic::entity(Resource::Vendor, 1), vendor_event(1));
        assert_eq!(delivered, 2);
        assert_eq!(all_rx.recv().await.map(|e| e.payload.id()), Some(1));
        assert_eq!(one_rx.recv().await.map(|e| e.payload.id()), Some(1));
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_parent_publish_does_not_reach_children() {
        let broker = NotificationBroker::new(8);
        let (one, mut one_rx) = broker.open_connection();
        broker.subscribe(Topic::entity(Resource::Vendor, 1), &one);

        assert_eq!(broker.publish(&Topic::resource(Resource::Vendor), vendor_event(1)), 0);
        assert!(one_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delivers_once_per_connection() {
        let broker = NotificationBroker::new(8);
        let (conn, mut rx) = broker.open_connection();
        broker.subscribe(Topic::resource(Resource::Vendor), &conn);
        broker.subscribe(Topic::entity(Resource::Vendor, 3), &conn);
        broker.subscribe(Topic::entity(Resource::Vendor, 3), &conn);

        assert_eq!(broker.publish(&Topic::entity(Resource::Vendor, 3), vendor_event(3)), 1);
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_evicts_connection() {
        let broker = NotificationBroker::new(1);
        let (slow, mut slow_rx) = broker.open_connection();
        let (fast, mut fast_rx) = broker.open_connection();
        let topic = Topic::resource(Resource::Vendor);
        broker.subscribe(topic.clone(), &slow);
        broker.subscribe(Topic::entity(Resource::Vendor, 1), &slow);
        broker.subscribe(topic.clone(), &fast);
        drop(slow);

        assert_eq!(broker.publish(&topic, vendor_event(1)), 2);
        assert!(fast_rx.recv().await.is_some());

        // `slow` never drains; the second publish overflows its queue.
        assert_eq!(broker.publish(&topic, vendor_event(2)), 1);
        assert_eq!(broker.subscriber_count(&topic), 1);
        assert_eq!(broker.subscriber_count(&Topic::entity(Resource::Vendor, 1)), 0);
        assert!(fast_rx.recv().await.is_some());

        assert!(slow_rx.recv().await.is_some());
        assert!(slow_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_receiver_is_evicted() {
        let broker = NotificationBroker::new(4);
        let (conn, rx) = broker.open_connection();
        let topic = Topic::resource(Resource::Vendor);
        broker.subscribe(topic.clone(), &conn);
        drop(rx);

        assert_eq!(broker.publish(&topic, vendor_event(1)), 0);
        assert_eq!(broker.subscriber_count(&topic), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let broker = NotificationBroker::new(4);
        let (conn, _rx) = broker.open_connection();
        let topic = Topic::entity(Resource::Container, 9);
        broker.subscribe(topic.clone(), &conn);
        assert_eq!(broker.subscriber_count(&topic), 1);

        broker.unsubscribe(&topic, conn.id());
        broker.unsubscribe(&topic, conn.id());
        broker.unsubscribe(&Topic::resource(Resource::Container), conn.id());
        assert_eq!(broker.subscriber_count(&topic), 0);
        assert_eq!(broker.publish(&topic, vendor_event(9)), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_queues() {
        let broker = NotificationBroker::new(4);
        let (conn, mut rx) = broker.open_connection();
        broker.subscribe(Topic::resource(Resource::Container), &conn);
        let id = conn.id();
        drop(conn);

        broker.shutdown();
        assert!(rx.recv().await.is_none());

        let (late, _late_rx) = broker.open_connection();
        assert!(!broker.subscribe(Topic::resource(Resource::Container), &late));
        assert_ne!(late.id(), id);
    }
}
