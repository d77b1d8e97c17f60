//! Live event broadcast to in-process subscribers.
//!
//! A single global stream carries every lifecycle event; per-user rooms
//! carry only events addressed to that user. The hub is injected where
//! it is needed rather than living in a process-wide global.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;

use async_trait::async_trait;

use crate::domain::{OpportunityEvent, UserId};
use crate::error::ChannelError;
use crate::service::NotificationChannel;

/// Fan-out hub for opportunity events.
pub struct BroadcastHub {
    capacity: usize,
    global: broadcast::Sender<OpportunityEvent>,
    rooms: DashMap<UserId, broadcast::Sender<OpportunityEvent>>,
}

impl BroadcastHub {
    /// Create a hub whose streams buffer up to `capacity` events per
    /// subscriber before lagging.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (global, _) = broadcast::channel(capacity);
        Self {
            capacity,
            global,
            rooms: DashMap::new(),
        }
    }

    /// Subscribe to every published event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OpportunityEvent> {
        self.global.subscribe()
    }

    /// Subscribe to events addressed to one user. The room is created on
    /// first use.
    #[must_use]
    pub fn subscribe_user(&self, user_id: &UserId) -> broadcast::Receiver<OpportunityEvent> {
        self.rooms
            .entry(user_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish an event to every global subscriber. Returns how many
    /// subscribers received it.
    pub fn publish(&self, event: &OpportunityEvent) -> usize {
        self.global.send(event.clone()).unwrap_or(0)
    }

    /// Publish an event into one user's room. Returns how many
    /// subscribers received it; zero when the room does not exist.
    pub fn publish_for(&self, user_id: &UserId, event: &OpportunityEvent) -> usize {
        match self.rooms.get(user_id) {
            Some(room) => room.send(event.clone()).unwrap_or(0),
            None => 0,
        }
    }

    /// Drop rooms whose last subscriber has disconnected.
    pub fn prune_rooms(&self) {
        self.rooms.retain(|user_id, sender| {
            if sender.receiver_count() == 0 {
                debug!(user_id = %user_id, "Dropped empty broadcast room");
                false
            } else {
                true
            }
        });
    }

    /// Number of live global subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.global.receiver_count()
    }

    /// Number of open per-user rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

/// Notification channel that feeds the hub's global stream.
pub struct BroadcastChannel {
    hub: Arc<BroadcastHub>,
}

impl BroadcastChannel {
    #[must_use]
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl NotificationChannel for BroadcastChannel {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn send(&self, event: &OpportunityEvent) -> Result<(), ChannelError> {
        let delivered = self.hub.publish(event);
        debug!(
            event_type = event.event_type(),
            delivered, "Broadcast event to live subscribers"
        );
        Ok(())
    }
}
