//! The read-tracking capability.

use devsync_types::{InteractionId, SortId, ThreadId, Timestamp};
use std::time::Duration;

use crate::ReadState;

/// Implemented by every interaction that tracks read/unread status,
/// e.g. incoming messages and call notifications.
///
/// Implementors own a [`ReadState`] and expose it; transitions are applied by
/// [`ReadStateReconciler`](crate::ReadStateReconciler).
pub trait ReadTrackable {
    /// Identifier of the interaction.
    fn unique_id(&self) -> InteractionId;

    /// Thread that owns the interaction.
    fn thread_id(&self) -> ThreadId;

    /// Ordering key within the thread.
    fn sort_id(&self) -> SortId;

    /// Current read state.
    fn read_state(&self) -> &ReadState;

    /// Mutable access to the read state.
    fn read_state_mut(&mut self) -> &mut ReadState;

    /// Disappearing-message policy, if the interaction has one.
    fn expires_in(&self) -> Option<Duration> {
        None
    }

    /// Has the local user seen the interaction?
    fn is_read(&self) -> bool {
        self.read_state().is_read()
    }

    /// When the expiration timer started, `None` if unset.
    fn expire_started_at(&self) -> Option<Timestamp> {
        self.read_state().expire_started_at()
    }
}
