use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::auth::UserId;

/// Marketplace activity fanned out to in-process subscribers (audit log,
/// notification feeds). Each event concerns exactly one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MarketplaceEvent {
    ListingSubmitted {
        listing_id: String,
        owner: UserId,
        approved: bool,
    },
    ListingApproved {
        listing_id: String,
        owner: UserId,
        method: String,
    },
    ListingRejected {
        listing_id: String,
        owner: UserId,
        reason: String,
    },
    VerificationRequested {
        listing_id: String,
        owner: UserId,
        payment_id: String,
    },
    VerificationCompleted {
        listing_id: String,
        owner: UserId,
        verified: bool,
    },
    BookingCreated {
        booking_id: String,
        user: UserId,
        total_amount: u32,
    },
    BookingConfirmed {
        booking_id: String,
        user: UserId,
    },
    BookingCancelled {
        booking_id: String,
        user: UserId,
    },
    ReviewRecorded {
        item_id: String,
        user: UserId,
        rating: u8,
    },
}

impl MarketplaceEvent {
    /// The user this event should be delivered to.
    pub fn topic(&self) -> &UserId {
        match self {
            Self::ListingSubmitted { owner, .. }
            | Self::ListingApproved { owner, .. }
            | Self::ListingRejected { owner, .. }
            | Self::VerificationRequested { owner, .. }
            | Self::VerificationCompleted { owner, .. } => owner,
            Self::BookingCreated { user, .. }
            | Self::BookingConfirmed { user, .. }
            | Self::BookingCancelled { user, .. }
            | Self::ReviewRecorded { user, .. } => user,
        }
    }
}

/// Event wrapped with its emission timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub at: DateTime<Utc>,
    pub event: MarketplaceEvent,
}

/// In-process event bus backed by `tokio::broadcast`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<EventEnvelope>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish to current subscribers. Returns how many received it; zero
    /// subscribers is not an error.
    pub fn publish(&self, event: MarketplaceEvent) -> usize {
        let envelope = EventEnvelope {
            at: Utc::now(),
            event,
        };
        self.sender.send(envelope).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Subscription that only yields events for `user`.
    pub fn subscribe_user(&self, user: UserId) -> UserFeed {
        UserFeed {
            user,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Per-user view over the bus.
pub struct UserFeed {
    user: UserId,
    receiver: broadcast::Receiver<EventEnvelope>,
}

impl UserFeed {
    /// Wait for the next event addressed to this user. Lagged messages are
    /// skipped; `None` once the bus is dropped.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.event.topic() == &self.user => return Some(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(user = %self.user, skipped, "user feed lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
