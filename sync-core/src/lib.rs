//! # sync-core
//!
//! Core logic for devsync (no network, no disk, instant tests).
//!
//! This crate holds the state machine for read tracking, the construction
//! rules for key-sync messages, and the contracts of the collaborators that
//! surround them (persistence, timers, notifications, receipts, delivery).
//!
//! ## Design Philosophy
//!
//! The read transition itself is **pure**: [`ReadState::on_read`] takes an
//! event and returns the next state plus a list of [`ReadEffect`]s. The
//! [`ReadStateReconciler`] persists that state through the caller's
//! transaction and interprets the effects. This enables:
//! - Instant unit tests (no async, no I/O)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! [`MemoryStore`] is a reference persistence collaborator used by tests and
//! by `sync-cli`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod effects;
pub mod error;
pub mod interaction;
pub mod key_sync;
pub mod keys_message;
pub mod read_state;
pub mod reconciler;
pub mod store;
pub mod thread;
pub mod trackable;
pub mod transaction;

pub use effects::{
    ExpirationStart, ExpirationTimer, NoopEffects, ReadNotice, ReadObserver, ReadReceipt,
    ReceiptQueue, SideEffectFailure,
};
#[cfg(any(test, feature = "test-util"))]
pub use effects::RecordingEffects;
pub use error::{ConstructionError, ReadError, StoreError, StoreResult};
pub use interaction::{CallKind, CallNotification, IncomingMessage, Interaction};
pub use key_sync::{DeliveryError, KeySync, KeySyncError, KeySyncTrigger, OutboundDelivery};
pub use keys_message::DeviceSyncKeysMessage;
pub use read_state::{ReadEffect, ReadEvent, ReadState, ReceiptKind};
pub use reconciler::{ReadOutcome, ReadStateReconciler, ThreadReadSummary};
pub use store::{MemoryStore, ReadSnapshot, StoreState, WriteTx};
pub use thread::{ContactThread, GroupThread, Thread};
pub use trackable::ReadTrackable;
pub use transaction::{ReadTransaction, WriteTransaction};
