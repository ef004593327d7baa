//! Notification Hub
//!
//! Fans out one thing's property, action and event messages to its
//! subscribers. Each message is serialized once and handed to every matching
//! sink without waiting; a sink that is full or closed is dropped from the
//! subscriber set and delivery to the others continues.
//!
//! Events only reach subscribers that registered interest in the event name
//! (wildcards allowed). Property and action status messages reach everyone.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use thing_types::{Envelope, MessageType};
use tokio::sync::mpsc;
use uuid::Uuid;
use wildmatch::WildMatch;

// ─────────────────────────────────────────────────────────────────────────────
// Message Sink
// ─────────────────────────────────────────────────────────────────────────────

/// Why a message could not be handed to a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("subscriber buffer is full")]
    Full,
    #[error("subscriber channel is closed")]
    Closed,
}

/// Outbound half of a subscriber's channel
pub trait MessageSink: Send + Sync {
    /// Hand over a serialized message without blocking
    fn try_deliver(&self, message: Arc<str>) -> Result<(), DeliveryError>;

    fn is_closed(&self) -> bool;
}

impl MessageSink for mpsc::Sender<Arc<str>> {
    fn try_deliver(&self, message: Arc<str>) -> Result<(), DeliveryError> {
        self.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn is_closed(&self) -> bool {
        mpsc::Sender::is_closed(self)
    }
}

/// Subscriber identifier
pub type SubscriberId = Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Notification Hub
// ─────────────────────────────────────────────────────────────────────────────

struct EventInterest {
    matcher: WildMatch,
    subscribers: HashSet<SubscriberId>,
}

/// Subscriber set and fan-out for one thing
pub struct NotificationHub {
    thing_id: String,
    subscribers: DashMap<SubscriberId, Arc<dyn MessageSink>>,
    /// Event name pattern -> interested subscribers
    event_interest: DashMap<String, EventInterest>,
    /// Serializes publishes so subscribers see messages in publish order
    publish_lock: Mutex<()>,
}

impl NotificationHub {
    pub fn new(thing_id: impl Into<String>) -> Self {
        Self {
            thing_id: thing_id.into(),
            subscribers: DashMap::new(),
            event_interest: DashMap::new(),
            publish_lock: Mutex::new(()),
        }
    }

    pub fn thing_id(&self) -> &str {
        &self.thing_id
    }

    /// Add a subscriber
    pub fn subscribe(&self, sink: Arc<dyn MessageSink>) -> SubscriberId {
        let id = Uuid::new_v4();
        self.subscribers.insert(id, sink);
        tracing::debug!(thing_id = %self.thing_id, subscriber = %id, "Subscriber added");
        id
    }

    /// Remove a subscriber and all of its event interest. Returns false if unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        self.event_interest.retain(|_, interest| {
            interest.subscribers.remove(&id);
            !interest.subscribers.is_empty()
        });
        if removed {
            tracing::debug!(thing_id = %self.thing_id, subscriber = %id, "Subscriber removed");
        }
        removed
    }

    /// Register interest in events whose name matches `pattern`
    pub fn add_event_interest(&self, id: SubscriberId, pattern: &str) -> bool {
        if !self.subscribers.contains_key(&id) {
            return false;
        }
        self.event_interest
            .entry(pattern.to_string())
            .or_insert_with(|| EventInterest {
                matcher: WildMatch::new(pattern),
                subscribers: HashSet::new(),
            })
            .subscribers
            .insert(id);

        // An unsubscribe racing with the insert above may have missed it
        if !self.subscribers.contains_key(&id) {
            self.remove_event_interest(id, pattern);
            return false;
        }
        true
    }

    pub fn remove_event_interest(&self, id: SubscriberId, pattern: &str) {
        self.event_interest.remove_if_mut(pattern, |_, interest| {
            interest.subscribers.remove(&id);
            interest.subscribers.is_empty()
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver a message to every matching subscriber. Returns the number reached.
    pub fn publish(&self, envelope: Envelope) -> usize {
        let envelope = envelope.for_thing(self.thing_id.clone());
        let message: Arc<str> = match serde_json::to_string(&envelope) {
            Ok(text) => text.into(),
            Err(e) => {
                tracing::error!(thing_id = %self.thing_id, error = %e, "Failed to serialize message");
                return 0;
            }
        };

        let _order = self.publish_lock.lock();

        let targets: Option<HashSet<SubscriberId>> = match envelope.message_type {
            MessageType::Event => {
                let name = envelope.single_key().unwrap_or_default();
                Some(
                    self.event_interest
                        .iter()
                        .filter(|interest| interest.matcher.matches(name))
                        .flat_map(|interest| interest.subscribers.iter().copied().collect::<Vec<_>>())
                        .collect(),
                )
            }
            _ => None,
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for entry in self.subscribers.iter() {
            if let Some(targets) = &targets {
                if !targets.contains(entry.key()) {
                    continue;
                }
            }
            match entry.value().try_deliver(Arc::clone(&message)) {
                Ok(()) => delivered += 1,
                Err(reason) => failed.push((*entry.key(), reason)),
            }
        }

        // Removal happens after iteration so the shard guards are released
        for (id, reason) in failed {
            tracing::warn!(
                thing_id = %self.thing_id,
                subscriber = %id,
                reason = %reason,
                "Dropping subscriber"
            );
            self.unsubscribe(id);
        }

        tracing::trace!(
            thing_id = %self.thing_id,
            message_type = %envelope.message_type,
            delivered,
            "Published"
        );
        delivered
    }

    /// Drop subscribers whose channel has closed
    pub fn prune_closed(&self) -> usize {
        let closed: Vec<_> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().is_closed())
            .map(|entry| *entry.key())
            .collect();
        for id in &closed {
            self.unsubscribe(*id);
        }
        closed.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
