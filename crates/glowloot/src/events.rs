//! # Lifecycle Notifications
//!
//! Discrete events for presentation code.
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │ LootSession │─────>│  EventBus   │─────>│  Presenter  │
//! │ (lifecycle) │      │ (bounded)   │      │ (toasts/UI) │
//! └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! Sending never blocks a transition. A full channel drops the event with a
//! warning.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use glowloot_economy::{LootItem, RevealTier};

use crate::lootbox::BoxId;

/// Events emitted by the lifecycle.
#[derive(Clone, Debug, PartialEq)]
pub enum LootEvent {
    /// `createLootBox` was issued.
    CreationStarted {
        /// Box being created.
        box_id: BoxId,
        /// Items being committed.
        item_count: u8,
    },

    /// `createLootBox` failed. The box is `Failed`.
    CreationFailed {
        /// Affected box.
        box_id: BoxId,
        /// Human-readable cause.
        reason: String,
    },

    /// Creation confirmed and progress started.
    DecryptionStarted {
        /// Box decrypting.
        box_id: BoxId,
    },

    /// Items assigned.
    Revealed {
        /// Revealed box.
        box_id: BoxId,
        /// Items in draw order.
        items: Vec<LootItem>,
        /// Sum of item values.
        total_value: u64,
        /// Notification variant.
        tier: RevealTier,
    },

    /// `openLootBox` failed. The box is `Failed`.
    RevealFailed {
        /// Affected box.
        box_id: BoxId,
        /// Human-readable cause.
        reason: String,
    },
}

impl LootEvent {
    /// Box the event refers to.
    #[must_use]
    pub const fn box_id(&self) -> &BoxId {
        match self {
            Self::CreationStarted { box_id, .. }
            | Self::CreationFailed { box_id, .. }
            | Self::DecryptionStarted { box_id }
            | Self::Revealed { box_id, .. }
            | Self::RevealFailed { box_id, .. } => box_id,
        }
    }
}

/// Bounded notification channel.
pub struct EventBus {
    sender: Sender<LootEvent>,
    receiver: Receiver<LootEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

/// Handle for sending events.
#[derive(Clone)]
pub struct EventSender {
    sender: Sender<LootEvent>,
}

impl EventSender {
    /// Sends without blocking. Returns `false` if the event was dropped.
    #[inline]
    pub fn send(&self, event: LootEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(box_id = %event.box_id(), "event channel full; dropping notification");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone)]
pub struct EventReceiver {
    receiver: Receiver<LootEvent>,
}

impl EventReceiver {
    /// All pending events, in order.
    #[inline]
    pub fn drain(&self) -> Vec<LootEvent> {
        self.receiver.try_iter().collect()
    }

    /// One event, if any.
    #[inline]
    pub fn try_recv(&self) -> Option<LootEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> LootEvent {
        LootEvent::DecryptionStarted {
            box_id: BoxId::from(id),
        }
    }

    #[test]
    fn test_send_and_drain_in_order() {
        let bus = EventBus::new(8);
        let sender = bus.sender();
        let receiver = bus.receiver();

        assert!(sender.send(started("box-1")));
        assert!(sender.send(started("box-2")));
        assert_eq!(receiver.pending_count(), 2);

        let events = receiver.drain();
        assert_eq!(events, vec![started("box-1"), started("box-2")]);
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_full_channel_drops() {
        let bus = EventBus::new(1);
        let sender = bus.sender();

        assert!(sender.send(started("box-1")));
        assert!(!sender.send(started("box-2")));
        assert_eq!(bus.receiver().drain(), vec![started("box-1")]);
    }
}
