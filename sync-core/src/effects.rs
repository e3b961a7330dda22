//! Side-effect collaborators for read reconciliation.
//!
//! The reconciler tells these collaborators what happened; it never waits on
//! them and never rolls a read back because one of them failed.

use devsync_types::{InteractionId, ReadCircumstance, ThreadId, Timestamp};
#[cfg(any(test, feature = "test-util"))]
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::{ReceiptKind, WriteTransaction};

/// Request to start a disappearing-message timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationStart {
    /// Interaction whose timer starts.
    pub interaction: InteractionId,
    /// Thread that owns the interaction.
    pub thread: ThreadId,
    /// Timer origin.
    pub origin: Timestamp,
    /// Duration of the timer.
    pub expires_in: Duration,
}

impl ExpirationStart {
    /// When the interaction should be deleted.
    pub fn expires_at(&self) -> Timestamp {
        self.origin.saturating_add(self.expires_in)
    }
}

/// Advisory notice for the notification collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadNotice {
    /// Interaction that was read.
    pub interaction: InteractionId,
    /// Thread that owns it.
    pub thread: ThreadId,
    /// When the read happened.
    pub read_at: Timestamp,
    /// Where, and in what thread state, it happened.
    pub circumstance: ReadCircumstance,
    /// Whether notifications for the interaction should be cleared.
    pub should_clear_notifications: bool,
}

/// A read receipt to queue for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadReceipt {
    /// Interaction that was read.
    pub interaction: InteractionId,
    /// Thread that owns it.
    pub thread: ThreadId,
    /// When the read happened.
    pub read_at: Timestamp,
    /// Destination.
    pub kind: ReceiptKind,
}

/// A side-effect collaborator failed.
///
/// Logged and swallowed by the reconciler: read status is never reverted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SideEffectFailure {
    /// The disappearing-message timer could not be started.
    #[error("expiration timer failed: {0}")]
    Timer(String),

    /// The notification collaborator failed.
    #[error("notification failed: {0}")]
    Notification(String),

    /// The receipt could not be queued.
    #[error("receipt queue failed: {0}")]
    Receipt(String),
}

/// Disappearing-message timer collaborator.
pub trait ExpirationTimer: Send + Sync {
    /// Start the timer inside the caller's transaction.
    fn start(
        &self,
        start: &ExpirationStart,
        tx: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure>;
}

/// Notification collaborator. Purely observational.
pub trait ReadObserver: Send + Sync {
    /// A trackable transitioned to read.
    fn read_observed(&self, notice: &ReadNotice) -> Result<(), SideEffectFailure>;
}

/// Receipt collaborator.
pub trait ReceiptQueue: Send + Sync {
    /// Queue a receipt inside the caller's transaction.
    fn enqueue(
        &self,
        receipt: &ReadReceipt,
        tx: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure>;
}

/// Collaborator that accepts everything and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEffects;

impl ExpirationTimer for NoopEffects {
    fn start(
        &self,
        _: &ExpirationStart,
        _: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure> {
        Ok(())
    }
}

impl ReadObserver for NoopEffects {
    fn read_observed(&self, _: &ReadNotice) -> Result<(), SideEffectFailure> {
        Ok(())
    }
}

impl ReceiptQueue for NoopEffects {
    fn enqueue(
        &self,
        _: &ReadReceipt,
        _: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure> {
        Ok(())
    }
}

/// Recording collaborator for tests.
///
/// Captures every call and can be told to fail the next call of a kind.
/// Available to other crates with the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingEffects {
    inner: Arc<Mutex<RecordingInner>>,
}

#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
struct RecordingInner {
    expirations: Vec<ExpirationStart>,
    notices: Vec<ReadNotice>,
    receipts: Vec<ReadReceipt>,
    fail_next_timer: Option<String>,
    fail_next_notice: Option<String>,
    fail_next_receipt: Option<String>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingEffects {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordingInner> {
        // A panicking test thread must not hide what was recorded.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Timer starts seen so far.
    pub fn expirations(&self) -> Vec<ExpirationStart> {
        self.lock().expirations.clone()
    }

    /// Read notices seen so far.
    pub fn notices(&self) -> Vec<ReadNotice> {
        self.lock().notices.clone()
    }

    /// Receipts seen so far.
    pub fn receipts(&self) -> Vec<ReadReceipt> {
        self.lock().receipts.clone()
    }

    /// Cause the next timer start to fail.
    pub fn fail_next_timer(&self, error: &str) {
        self.lock().fail_next_timer = Some(error.to_string());
    }

    /// Cause the next read notice to fail.
    pub fn fail_next_notice(&self, error: &str) {
        self.lock().fail_next_notice = Some(error.to_string());
    }

    /// Cause the next receipt to fail.
    pub fn fail_next_receipt(&self, error: &str) {
        self.lock().fail_next_receipt = Some(error.to_string());
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clone for RecordingEffects {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl ExpirationTimer for RecordingEffects {
    fn start(
        &self,
        start: &ExpirationStart,
        _: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure> {
        let mut inner = self.lock();
        if let Some(error) = inner.fail_next_timer.take() {
            return Err(SideEffectFailure::Timer(error));
        }
        inner.expirations.push(*start);
        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
impl ReadObserver for RecordingEffects {
    fn read_observed(&self, notice: &ReadNotice) -> Result<(), SideEffectFailure> {
        let mut inner = self.lock();
        if let Some(error) = inner.fail_next_notice.take() {
            return Err(SideEffectFailure::Notification(error));
        }
        inner.notices.push(*notice);
        Ok(())
    }
}

#[cfg(any(test, feature = "test-util"))]
impl ReceiptQueue for RecordingEffects {
    fn enqueue(
        &self,
        receipt: &ReadReceipt,
        _: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure> {
        let mut inner = self.lock();
        if let Some(error) = inner.fail_next_receipt.take() {
            return Err(SideEffectFailure::Receipt(error));
        }
        inner.receipts.push(*receipt);
        Ok(())
    }
}
