//! Fan-out of opportunity events to notification channels.
//!
//! Channels are independent: one failing, unavailable, or uninterested
//! channel never blocks delivery to the rest.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::OpportunityEvent;
use crate::error::ChannelError;

/// A delivery target for opportunity lifecycle events.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name used in logs.
    fn name(&self) -> &str;

    /// Whether the channel can currently deliver.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether the channel wants events of this type.
    fn supports(&self, event_type: &str) -> bool {
        let _ = event_type;
        true
    }

    /// Deliver one event.
    async fn send(&self, event: &OpportunityEvent) -> Result<(), ChannelError>;
}

/// Dispatches each event to every registered channel in order.
#[derive(Default)]
pub struct NotificationDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, channel: Box<dyn NotificationChannel>) {
        info!(channel = channel.name(), "Registered notification channel");
        self.channels.push(channel);
    }

    /// Deliver `event` to all channels, returning how many accepted it.
    ///
    /// Failures are logged and swallowed so later channels still run.
    pub async fn dispatch(&self, event: &OpportunityEvent) -> usize {
        let mut delivered = 0;
        for channel in &self.channels {
            if !channel.is_available() {
                debug!(channel = channel.name(), "Skipping unavailable channel");
                continue;
            }
            if !channel.supports(event.event_type()) {
                debug!(
                    channel = channel.name(),
                    event_type = event.event_type(),
                    "Channel does not take this event type"
                );
                continue;
            }
            match channel.send(event).await {
                Ok(()) => delivered += 1,
                Err(error) => {
                    warn!(
                        channel = channel.name(),
                        event_type = event.event_type(),
                        error = %error,
                        "Channel delivery failed"
                    );
                }
            }
        }
        delivered
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Channel that writes events to the tracing log.
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, event: &OpportunityEvent) -> Result<(), ChannelError> {
        match event {
            OpportunityEvent::OpportunityDetected { opportunity } => {
                info!(
                    symbol = %opportunity.symbol(),
                    id = %opportunity.id(),
                    pairs = opportunity.pairs().len(),
                    net_profit = %opportunity.best().map(|p| p.net_profit()).unwrap_or_default(),
                    "Opportunity detected"
                );
            }
            OpportunityEvent::OpportunityUpdated { opportunity } => {
                info!(
                    symbol = %opportunity.symbol(),
                    id = %opportunity.id(),
                    pairs = opportunity.pairs().len(),
                    net_profit = %opportunity.best().map(|p| p.net_profit()).unwrap_or_default(),
                    "Opportunity updated"
                );
            }
            OpportunityEvent::OpportunityExpired { id, symbol } => {
                info!(symbol = %symbol, id = %id, "Opportunity expired");
            }
        }
        Ok(())
    }
}

/// Channel that accepts and discards every event.
pub struct NullChannel;

#[async_trait]
impl NotificationChannel for NullChannel {
    fn name(&self) -> &str {
        "null"
    }

    async fn send(&self, _event: &OpportunityEvent) -> Result<(), ChannelError> {
        Ok(())
    }
}
