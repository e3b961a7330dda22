//! Read reconciliation.
//!
//! [`ReadStateReconciler`] runs the [`ReadState`] machine for one
//! trackable, persists the result through the caller's transaction, and then
//! dispatches the effects to the side-effect collaborators.
//!
//! Order of operations in [`mark_as_read`](ReadStateReconciler::mark_as_read):
//!
//! 1. Reject a thread that does not own the trackable. Nothing is mutated.
//! 2. Compute the transition from the state held in the transaction, not
//!    the caller's copy. Already read means no-op, and the copy is refreshed.
//! 3. Persist the new state. A store failure aborts with nothing applied.
//! 4. Apply the state to the in-memory trackable.
//! 5. Dispatch effects. Failures are logged and counted, never reverted.

use devsync_types::{SortId, Timestamp};
use std::sync::Arc;

use crate::effects::{
    ExpirationStart, ExpirationTimer, ReadNotice, ReadObserver, ReadReceipt, ReceiptQueue,
};
use crate::error::ReadError;
use crate::{ReadEffect, ReadEvent, ReadTrackable, Thread, WriteTransaction};

/// Result of a single [`mark_as_read`](ReadStateReconciler::mark_as_read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The trackable was already read. Nothing changed.
    AlreadyRead,
    /// The trackable transitioned to read.
    MarkedRead {
        /// Timestamp recorded as the read time.
        read_at: Timestamp,
        /// Origin of the expiration timer if this read started it.
        expiration_started: Option<Timestamp>,
        /// Number of side effects that failed and were swallowed.
        side_effect_failures: usize,
    },
}

impl ReadOutcome {
    /// Did this call perform the transition?
    pub fn changed(&self) -> bool {
        matches!(self, ReadOutcome::MarkedRead { .. })
    }
}

/// Result of [`mark_thread_read_through`](ReadStateReconciler::mark_thread_read_through).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadReadSummary {
    /// Interactions that transitioned to read.
    pub marked: usize,
    /// Interactions in range that were already read.
    pub already_read: usize,
    /// Side effects that failed across all interactions.
    pub side_effect_failures: usize,
}

/// Applies read events to trackables.
pub struct ReadStateReconciler {
    timer: Arc<dyn ExpirationTimer>,
    observer: Arc<dyn ReadObserver>,
    receipts: Arc<dyn ReceiptQueue>,
}

impl ReadStateReconciler {
    /// Create a reconciler from three collaborators.
    pub fn new(
        timer: Arc<dyn ExpirationTimer>,
        observer: Arc<dyn ReadObserver>,
        receipts: Arc<dyn ReceiptQueue>,
    ) -> Self {
        Self {
            timer,
            observer,
            receipts,
        }
    }

    /// Create a reconciler from one value that implements every collaborator.
    pub fn with_effects<E>(effects: Arc<E>) -> Self
    where
        E: ExpirationTimer + ReadObserver + ReceiptQueue + 'static,
    {
        Self {
            timer: effects.clone(),
            observer: effects.clone(),
            receipts: effects,
        }
    }

    /// Mark one trackable as read.
    ///
    /// `tx` must stay open for the whole call; the expiration timer and
    /// receipts are registered inside it.
    ///
    /// # Errors
    ///
    /// - [`ReadError::ThreadMismatch`] if `thread` does not own `item`.
    /// - [`ReadError::Store`] if the new read state could not be persisted.
    ///
    /// In both cases `item` is left untouched.
    ///
    /// The read state stored in `tx` wins over the one carried by `item`, so
    /// concurrent callers holding stale copies of the same interaction apply
    /// only the first read. `item` is updated to the stored state either way.
    pub fn mark_as_read(
        &self,
        item: &mut dyn ReadTrackable,
        event: ReadEvent,
        thread: &Thread,
        tx: &mut dyn WriteTransaction,
    ) -> Result<ReadOutcome, ReadError> {
        let interaction = item.unique_id();
        let expected = item.thread_id();
        if thread.id() != expected {
            tracing::error!(
                %interaction,
                %expected,
                actual = %thread.id(),
                "read event routed to wrong thread"
            );
            return Err(ReadError::ThreadMismatch {
                interaction,
                expected,
                actual: thread.id(),
            });
        }

        // Stale copies lose to whatever the store already holds.
        let current = match tx.interaction(&interaction) {
            Some(stored) => *stored.read_state(),
            None => *item.read_state(),
        };
        let (next, effects) = current.on_read(item.expires_in(), &event);
        if effects.is_empty() {
            *item.read_state_mut() = current;
            tracing::debug!(%interaction, circumstance = %event.circumstance, "already read");
            return Ok(ReadOutcome::AlreadyRead);
        }

        tx.save_read_state(&interaction, &next)?;
        *item.read_state_mut() = next;

        let mut expiration_started = None;
        let mut failures = 0;
        for effect in effects {
            if let ReadEffect::StartExpiration { origin, .. } = effect {
                expiration_started = Some(origin);
            }
            if let Err(error) = self.dispatch(item, effect, tx) {
                failures += 1;
                tracing::warn!(%interaction, %error, "side effect failed; read state kept");
            }
        }

        tracing::debug!(
            %interaction,
            read_at = %event.read_at,
            circumstance = %event.circumstance,
            failures,
            "marked read"
        );

        Ok(ReadOutcome::MarkedRead {
            read_at: event.read_at,
            expiration_started,
            side_effect_failures: failures,
        })
    }

    /// Mark every interaction in `thread` with a sort id up to and including
    /// `through` as read, in sort order.
    ///
    /// Each interaction is loaded from `tx`, reconciled, and its new state
    /// saved back through `tx`.
    ///
    /// # Errors
    ///
    /// Stops at the first [`ReadError`]. Interactions already marked stay
    /// marked within `tx`; whether they are kept is up to the caller's commit.
    pub fn mark_thread_read_through(
        &self,
        thread: &Thread,
        through: SortId,
        event: ReadEvent,
        tx: &mut dyn WriteTransaction,
    ) -> Result<ThreadReadSummary, ReadError> {
        let mut summary = ThreadReadSummary::default();

        for mut interaction in tx.interactions_in_thread(&thread.id()) {
            if interaction.sort_id() > through {
                break;
            }
            match self.mark_as_read(&mut interaction, event, thread, tx)? {
                ReadOutcome::AlreadyRead => summary.already_read += 1,
                ReadOutcome::MarkedRead {
                    side_effect_failures,
                    ..
                } => {
                    summary.marked += 1;
                    summary.side_effect_failures += side_effect_failures;
                }
            }
        }

        tracing::info!(
            thread = %thread.id(),
            %through,
            marked = summary.marked,
            already_read = summary.already_read,
            "thread read through"
        );
        Ok(summary)
    }

    fn dispatch(
        &self,
        item: &dyn ReadTrackable,
        effect: ReadEffect,
        tx: &mut dyn WriteTransaction,
    ) -> Result<(), crate::effects::SideEffectFailure> {
        let interaction = item.unique_id();
        let thread = item.thread_id();
        match effect {
            ReadEffect::StartExpiration { origin, expires_in } => self.timer.start(
                &ExpirationStart {
                    interaction,
                    thread,
                    origin,
                    expires_in,
                },
                tx,
            ),
            ReadEffect::ReadObserved {
                read_at,
                circumstance,
                should_clear_notifications,
            } => self.observer.read_observed(&ReadNotice {
                interaction,
                thread,
                read_at,
                circumstance,
                should_clear_notifications,
            }),
            ReadEffect::EnqueueReceipt { kind, read_at } => self.receipts.enqueue(
                &ReadReceipt {
                    interaction,
                    thread,
                    read_at,
                    kind,
                },
                tx,
            ),
        }
    }
}

impl std::fmt::Debug for ReadStateReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadStateReconciler").finish_non_exhaustive()
    }
}
