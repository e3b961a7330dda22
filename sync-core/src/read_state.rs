//! Read-state machine for read-trackable interactions.
//!
//! This module provides a pure, side-effect-free state machine for read
//! status. It takes a read event as input and produces a new state plus a
//! list of effects to dispatch.
//!
//! Dispatching the effects (starting timers, notifying, queueing receipts)
//! is done by [`ReadStateReconciler`](crate::ReadStateReconciler), not by
//! this module. This keeps every branch testable without collaborators.
//!
//! ## Transitions
//!
//! ```text
//! Unread ──read──► Read ──read──► Read (no-op)
//! ```
//!
//! There is no `Read -> Unread` transition here. Marking something unread is
//! an operation of whoever owns the interaction, not of reconciliation.

use devsync_types::{ReadCircumstance, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Read status of one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReadState {
    /// Timestamp of the first read that was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    read_at: Option<Timestamp>,
    /// Origin of the disappearing-message timer, if it has started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expire_started_at: Option<Timestamp>,
}

impl ReadState {
    /// An unread interaction with no expiration timer running.
    pub fn unread() -> Self {
        Self::default()
    }

    /// An unread interaction whose expiration timer was already started
    /// elsewhere (for example by a linked device).
    pub fn unread_expiring_since(expire_started_at: Timestamp) -> Self {
        Self {
            read_at: None,
            expire_started_at: Some(expire_started_at),
        }
    }

    /// Has the local user seen the interaction?
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// When the first applied read happened.
    pub fn read_at(&self) -> Option<Timestamp> {
        self.read_at
    }

    /// When the disappearing-message timer started, `None` if unset.
    pub fn expire_started_at(&self) -> Option<Timestamp> {
        self.expire_started_at
    }

    /// Process a read event and return the new state plus effects to dispatch.
    ///
    /// This is a pure function. Once read, the state never changes again:
    /// the first applied event wins, whatever the timestamps of later ones.
    pub fn on_read(
        self,
        expires_in: Option<Duration>,
        event: &ReadEvent,
    ) -> (Self, Vec<ReadEffect>) {
        if self.is_read() {
            return (self, vec![]);
        }

        let mut next = Self {
            read_at: Some(event.read_at),
            expire_started_at: self.expire_started_at,
        };
        let mut effects = Vec::new();

        if let (None, Some(expires_in)) = (self.expire_started_at, expires_in) {
            next.expire_started_at = Some(event.read_at);
            effects.push(ReadEffect::StartExpiration {
                origin: event.read_at,
                expires_in,
            });
        }

        effects.push(ReadEffect::ReadObserved {
            read_at: event.read_at,
            circumstance: event.circumstance,
            should_clear_notifications: event.should_clear_notifications,
        });

        effects.extend(
            receipt_kinds(event.circumstance)
                .iter()
                .map(|&kind| ReadEffect::EnqueueReceipt {
                    kind,
                    read_at: event.read_at,
                }),
        );

        (next, effects)
    }
}

/// A read observed locally or reported by a linked device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadEvent {
    /// When the read happened.
    pub read_at: Timestamp,
    /// Where, and in what thread state, it happened.
    pub circumstance: ReadCircumstance,
    /// Advisory for the notification collaborator. Never affects stored state.
    pub should_clear_notifications: bool,
}

impl ReadEvent {
    /// Create a read event that clears notifications.
    pub fn new(read_at: Timestamp, circumstance: ReadCircumstance) -> Self {
        Self {
            read_at,
            circumstance,
            should_clear_notifications: true,
        }
    }

    /// Set whether notifications for the interaction should be cleared.
    pub fn clear_notifications(mut self, clear: bool) -> Self {
        self.should_clear_notifications = clear;
        self
    }
}

/// Where a read receipt should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReceiptKind {
    /// Tell the sender now.
    ToSender,
    /// Tell the sender once the message request is accepted. Reading a
    /// pending request never accepts it.
    ToSenderWhenAccepted,
    /// Tell this account's other devices.
    ToLinkedDevices,
}

/// Effects produced by a read transition.
///
/// These are instructions, not side effects. The reconciler interprets them
/// and calls the collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEffect {
    /// Start the disappearing-message timer.
    StartExpiration {
        /// Timer origin (the read timestamp).
        origin: Timestamp,
        /// How long after the origin the interaction expires.
        expires_in: Duration,
    },
    /// Tell the notification collaborator about the read.
    ReadObserved {
        /// When the read happened.
        read_at: Timestamp,
        /// Passed through unchanged.
        circumstance: ReadCircumstance,
        /// Passed through unchanged.
        should_clear_notifications: bool,
    },
    /// Queue a read receipt.
    EnqueueReceipt {
        /// Destination of the receipt.
        kind: ReceiptKind,
        /// When the read happened.
        read_at: Timestamp,
    },
}

/// Receipt routing for a circumstance.
///
/// Reads reported by a linked device were already announced by that device,
/// so only the deferred sender receipt of a pending request is kept here.
fn receipt_kinds(circumstance: ReadCircumstance) -> &'static [ReceiptKind] {
    match circumstance {
        ReadCircumstance::OnLinkedDevice => &[],
        ReadCircumstance::OnLinkedDeviceWhilePendingMessageRequest => {
            &[ReceiptKind::ToSenderWhenAccepted]
        }
        ReadCircumstance::OnThisDevice => &[ReceiptKind::ToLinkedDevices, ReceiptKind::ToSender],
        ReadCircumstance::OnThisDeviceWhilePendingMessageRequest => &[
            ReceiptKind::ToLinkedDevices,
            ReceiptKind::ToSenderWhenAccepted,
        ],
    }
}
