//! Collaborators used by the CLI.
//!
//! The CLI has no timer service, notification center or transport. These
//! implementations report what they were asked to do through `tracing`.

use devsync_core::{
    DeliveryError, DeviceSyncKeysMessage, ExpirationStart, ExpirationTimer, OutboundDelivery,
    ReadNotice, ReadObserver, ReadReceipt, ReceiptQueue, SideEffectFailure, WriteTransaction,
};

/// Logs every side effect at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEffects;

impl ExpirationTimer for LogEffects {
    fn start(
        &self,
        start: &ExpirationStart,
        _tx: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure> {
        tracing::info!(
            interaction = %start.interaction,
            origin = %start.origin,
            expires_at = %start.expires_at(),
            "expiration timer started"
        );
        Ok(())
    }
}

impl ReadObserver for LogEffects {
    fn read_observed(&self, notice: &ReadNotice) -> Result<(), SideEffectFailure> {
        tracing::info!(
            interaction = %notice.interaction,
            circumstance = %notice.circumstance,
            clear_notifications = notice.should_clear_notifications,
            "read observed"
        );
        Ok(())
    }
}

impl ReceiptQueue for LogEffects {
    fn enqueue(
        &self,
        receipt: &ReadReceipt,
        _tx: &mut dyn WriteTransaction,
    ) -> Result<(), SideEffectFailure> {
        tracing::info!(
            interaction = %receipt.interaction,
            kind = ?receipt.kind,
            "read receipt queued"
        );
        Ok(())
    }
}

/// Accepts key-sync messages and logs them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDelivery;

impl OutboundDelivery for LogDelivery {
    fn enqueue(&self, message: DeviceSyncKeysMessage) -> Result<(), DeliveryError> {
        tracing::info!(
            thread = %message.recipient_thread(),
            timestamp = %message.timestamp(),
            keys = message.bundle().present_kinds().len(),
            "key sync accepted for delivery"
        );
        Ok(())
    }
}
