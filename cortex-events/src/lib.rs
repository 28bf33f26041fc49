//! # cortex-events
//!
//! Per-namespace pub/sub: every write to a namespace (store, update,
//! delete, link, checkpoint) can broadcast a JSON envelope to anyone
//! subscribed to it. Delivery is best-effort — a slow or absent subscriber
//! never blocks a write, and a subscriber that falls behind just misses
//! the oldest events rather than stalling the publisher. Grounded on the
//! wider pack's `tokio::sync::broadcast` + `DashMap` subscription pattern
//! (one broadcast channel per topic, created lazily on first subscribe or
//! publish).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default per-namespace channel capacity. A slow subscriber can fall this
/// far behind the publisher before it starts missing events.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// The kind of change an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MemoryStored,
    MemoryUpdated,
    MemoryDeleted,
    LinkCreated,
    LinkRemoved,
    CheckpointSaved,
}

/// A single change notification broadcast to a namespace's subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub namespace: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, namespace: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }
}

/// Lazily creates one broadcast channel per namespace and hands out
/// receivers and publish handles against it.
pub struct EventHub {
    topics: DashMap<String, broadcast::Sender<Arc<Event>>>,
    channel_capacity: usize,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            channel_capacity,
        }
    }

    fn sender_for(&self, namespace: &str) -> broadcast::Sender<Arc<Event>> {
        if let Some(existing) = self.topics.get(namespace) {
            return existing.clone();
        }
        let (tx, _rx) = broadcast::channel(self.channel_capacity);
        self.topics.entry(namespace.to_string()).or_insert(tx).clone()
    }

    /// Subscribe to every event published on `namespace`, from this point
    /// forward. Dropping the receiver unsubscribes.
    pub fn subscribe(&self, namespace: &str) -> broadcast::Receiver<Arc<Event>> {
        self.sender_for(namespace).subscribe()
    }

    /// Publish an event to its namespace's subscribers. Silently a no-op
    /// if nobody is currently subscribed — this is fire-and-forget
    /// notification, not a durable queue.
    pub fn publish(&self, event: Event) {
        let sender = self.sender_for(&event.namespace);
        let _ = sender.send(Arc::new(event));
    }

    /// Number of active subscribers on a namespace, for diagnostics.
    pub fn subscriber_count(&self, namespace: &str) -> usize {
        self.topics.get(namespace).map(|tx| tx.receiver_count()).unwrap_or(0)
    }

    /// Drop a namespace's channel once nobody holds a sender/receiver
    /// against it. Safe to call speculatively — a namespace that is still
    /// in use is left untouched.
    pub fn evict_idle(&self, namespace: &str) {
        if let Some(entry) = self.topics.get(namespace) {
            if entry.receiver_count() == 0 {
                drop(entry);
                self.topics.remove(namespace);
            }
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_a_published_event() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe("default");
        hub.publish(Event::new(EventKind::MemoryStored, "default", serde_json::json!({"id": 1})));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, EventKind::MemoryStored);
        assert_eq!(event.namespace, "default");
    }

    #[tokio::test]
    async fn subscribers_on_different_namespaces_are_isolated() {
        let hub = EventHub::new();
        let mut rx_a = hub.subscribe("ns-a");
        let mut rx_b = hub.subscribe("ns-b");
        hub.publish(Event::new(EventKind::MemoryStored, "ns-a", serde_json::json!({})));
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn publishing_with_no_subscribers_does_not_panic() {
        let hub = EventHub::new();
        hub.publish(Event::new(EventKind::MemoryDeleted, "default", serde_json::json!({"id": 1})));
    }

    #[tokio::test]
    async fn multiple_subscribers_on_the_same_namespace_all_receive_it() {
        let hub = EventHub::new();
        let mut rx1 = hub.subscribe("default");
        let mut rx2 = hub.subscribe("default");
        hub.publish(Event::new(EventKind::LinkCreated, "default", serde_json::json!({})));
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn evict_idle_removes_a_topic_with_no_subscribers() {
        let hub = EventHub::new();
        {
            let _rx = hub.subscribe("default");
        }
        hub.evict_idle("default");
        assert_eq!(hub.subscriber_count("default"), 0);
    }
}
