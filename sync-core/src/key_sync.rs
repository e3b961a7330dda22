//! Key-sync orchestration.
//!
//! Decides *what* to send when root keys change or a linked device asks for
//! them, then hands the message to an [`OutboundDelivery`] collaborator.
//! Sending, encryption and retries are the collaborator's concern; a failed
//! hand-off never touches stored key state.

use devsync_types::Timestamp;
use std::fmt;

use crate::error::ConstructionError;
use crate::{DeviceSyncKeysMessage, ReadTransaction};

/// Why a key sync is being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySyncTrigger {
    /// Root key material changed on this device.
    KeysChanged,
    /// A linked device asked for the current keys.
    ResyncRequested {
        /// Human-readable name of the requesting device.
        device_label: String,
    },
}

impl fmt::Display for KeySyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySyncTrigger::KeysChanged => write!(f, "keys-changed"),
            KeySyncTrigger::ResyncRequested { device_label } => {
                write!(f, "resync-requested({device_label})")
            }
        }
    }
}

/// The delivery collaborator refused a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("delivery rejected: {0}")]
pub struct DeliveryError(pub String);

/// Outbound-delivery collaborator.
///
/// Takes ownership of the message. Success means "accepted for delivery",
/// not "delivered".
pub trait OutboundDelivery: Send + Sync {
    /// Queue a message for the account's linked devices.
    fn enqueue(&self, message: DeviceSyncKeysMessage) -> Result<(), DeliveryError>;
}

/// Errors from [`KeySync::sync`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeySyncError {
    /// The snapshot has no self-thread to address the message to.
    #[error("no self-thread in snapshot")]
    NoSelfThread,

    /// The message could not be built.
    #[error("failed to build key sync message: {0}")]
    Construction(#[from] ConstructionError),

    /// The delivery collaborator rejected the message.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Builds key-sync messages and hands them to delivery.
#[derive(Debug)]
pub struct KeySync<D> {
    delivery: D,
}

impl<D: OutboundDelivery> KeySync<D> {
    /// Create a key sync over a delivery collaborator.
    pub fn new(delivery: D) -> Self {
        Self { delivery }
    }

    /// The delivery collaborator.
    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Build a message from `snapshot` and hand it to delivery.
    ///
    /// Returns a copy of the message that was handed off.
    ///
    /// # Errors
    ///
    /// - [`KeySyncError::NoSelfThread`] if the snapshot has no self-thread.
    /// - [`KeySyncError::Construction`] if the message cannot be built.
    /// - [`KeySyncError::Delivery`] if the collaborator rejects it.
    pub fn sync(
        &self,
        trigger: KeySyncTrigger,
        timestamp: Timestamp,
        snapshot: &dyn ReadTransaction,
    ) -> Result<DeviceSyncKeysMessage, KeySyncError> {
        let local_thread = snapshot.local_thread().ok_or(KeySyncError::NoSelfThread)?;
        let message = DeviceSyncKeysMessage::from_snapshot(timestamp, &local_thread, snapshot)?;

        let kinds: Vec<String> = message
            .bundle()
            .present_kinds()
            .iter()
            .map(ToString::to_string)
            .collect();
        let fingerprints: Vec<String> = message
            .bundle()
            .present_kinds()
            .into_iter()
            .filter_map(|kind| message.bundle().get(kind))
            .map(|key| key.fingerprint())
            .collect();

        tracing::info!(
            %trigger,
            thread = %message.recipient_thread(),
            kinds = ?kinds,
            fingerprints = ?fingerprints,
            "sending key sync"
        );

        if message.is_empty_payload() {
            tracing::warn!(%trigger, "key sync carries no keys");
        }

        self.delivery.enqueue(message.clone()).map_err(|e| {
            tracing::warn!(%trigger, error = %e, "key sync delivery rejected");
            KeySyncError::Delivery(e)
        })?;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::{ContactThread, MemoryStore, WriteTransaction};
    use devsync_types::{AccountId, KeyKind, KeyMaterialBundle};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingDelivery {
        sent: Arc<Mutex<Vec<DeviceSyncKeysMessage>>>,
        reject: Option<String>,
    }

    impl OutboundDelivery for RecordingDelivery {
        fn enqueue(&self, message: DeviceSyncKeysMessage) -> Result<(), DeliveryError> {
            if let Some(reason) = &self.reject {
                return Err(DeliveryError(reason.clone()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn store_with_keys() -> (MemoryStore, ContactThread) {
        let store = MemoryStore::new();
        let local = AccountId::new();
        let own = ContactThread::new(local);
        store
            .write(|tx| {
                tx.set_local_account(local);
                tx.upsert_thread(ContactThread::new(AccountId::new()).into());
                tx.upsert_thread(own.into());
                tx.set_key_bundle(
                    KeyMaterialBundle::new(Some(&[1; 32]), Some(&[2; 32]), None).unwrap(),
                );
                Ok::<_, StoreError>(())
            })
            .unwrap();
        (store, own)
    }

    #[test]
    fn keys_changed_hands_message_to_delivery() {
        let (store, own) = store_with_keys();
        let delivery = RecordingDelivery::default();
        let sync = KeySync::new(delivery.clone());

        let message = sync
            .sync(
                KeySyncTrigger::KeysChanged,
                Timestamp::from_millis(100),
                &store.snapshot().unwrap(),
            )
            .unwrap();

        assert_eq!(message.recipient_thread(), own.id);
        assert_eq!(
            message.bundle().present_kinds(),
            vec![KeyKind::StorageService, KeyKind::Master]
        );
        let sent = delivery.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], message);
    }

    #[test]
    fn resync_request_sends_current_keys() {
        let (store, _) = store_with_keys();
        let sync = KeySync::new(RecordingDelivery::default());
        let trigger = KeySyncTrigger::ResyncRequested {
            device_label: "tablet".into(),
        };
        assert_eq!(trigger.to_string(), "resync-requested(tablet)");

        let first = sync
            .sync(trigger.clone(), Timestamp::from_millis(1), &store.snapshot().unwrap())
            .unwrap();
        let second = sync
            .sync(trigger, Timestamp::from_millis(2), &store.snapshot().unwrap())
            .unwrap();
        assert!(first.same_payload(&second));
        assert_eq!(sync.delivery().sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn missing_self_thread_is_reported() {
        let store = MemoryStore::new();
        store
            .write(|tx| {
                tx.set_local_account(AccountId::new());
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let sync = KeySync::new(RecordingDelivery::default());

        let err = sync
            .sync(
                KeySyncTrigger::KeysChanged,
                Timestamp::from_millis(1),
                &store.snapshot().unwrap(),
            )
            .unwrap_err();
        assert_eq!(err, KeySyncError::NoSelfThread);
    }

    #[test]
    fn delivery_rejection_leaves_keys_untouched() {
        let (store, _) = store_with_keys();
        let before = store.snapshot().unwrap().key_bundle().unwrap();
        let sync = KeySync::new(RecordingDelivery {
            reject: Some("queue full".into()),
            ..Default::default()
        });

        let err = sync
            .sync(
                KeySyncTrigger::KeysChanged,
                Timestamp::from_millis(1),
                &store.snapshot().unwrap(),
            )
            .unwrap_err();

        assert_eq!(err, KeySyncError::Delivery(DeliveryError("queue full".into())));
        assert_eq!(store.snapshot().unwrap().key_bundle().unwrap(), before);
    }
}
