//! Outbound key-sync message.
//!
//! A [`DeviceSyncKeysMessage`] carries the account's root keys to its own
//! linked devices over the self-thread. Building one is a pure projection of
//! stored state: it reads, it never writes or sends.

use devsync_types::{KeyMaterialBundle, ThreadId, Timestamp};

use crate::error::ConstructionError;
use crate::{ContactThread, ReadTransaction};

/// Key material addressed to the account's linked devices.
///
/// Fields are private and there is no `Default`: the only way to get one is
/// [`create`](Self::create) or [`from_snapshot`](Self::from_snapshot), both of
/// which verify the recipient is the local self-thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSyncKeysMessage {
    timestamp: Timestamp,
    bundle: KeyMaterialBundle,
    recipient_thread: ThreadId,
}

impl DeviceSyncKeysMessage {
    /// Build a message from explicitly supplied key buffers.
    ///
    /// `snapshot` is used to verify that `local_thread` is the self-thread.
    ///
    /// # Errors
    ///
    /// - [`ConstructionError::LocalAccountUnknown`], [`ConstructionError::ThreadNotFound`]
    ///   or [`ConstructionError::NotSelfThread`] if the recipient cannot be resolved.
    /// - [`ConstructionError::InvalidKeyMaterial`] if a present buffer is empty.
    pub fn create(
        timestamp: Timestamp,
        local_thread: &ContactThread,
        storage_service_key: Option<&[u8]>,
        master_key: Option<&[u8]>,
        media_root_backup_key: Option<&[u8]>,
        snapshot: &dyn ReadTransaction,
    ) -> Result<Self, ConstructionError> {
        let recipient_thread = resolve_self_thread(local_thread, snapshot)?;
        let bundle =
            KeyMaterialBundle::new(storage_service_key, master_key, media_root_backup_key)?;
        Ok(Self {
            timestamp,
            bundle,
            recipient_thread,
        })
    }

    /// Build a message from the key state stored in `snapshot`.
    ///
    /// The bundle is read in one call, so the three keys always come from the
    /// same point in time.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create), plus [`ConstructionError::KeySnapshot`]
    /// if the key state could not be read.
    pub fn from_snapshot(
        timestamp: Timestamp,
        local_thread: &ContactThread,
        snapshot: &dyn ReadTransaction,
    ) -> Result<Self, ConstructionError> {
        let recipient_thread = resolve_self_thread(local_thread, snapshot)?;
        let bundle = snapshot
            .key_bundle()
            .map_err(ConstructionError::KeySnapshot)?;
        Ok(Self {
            timestamp,
            bundle,
            recipient_thread,
        })
    }

    /// When the message was built.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// The keys carried.
    pub fn bundle(&self) -> &KeyMaterialBundle {
        &self.bundle
    }

    /// The self-thread the message is addressed to.
    pub fn recipient_thread(&self) -> ThreadId {
        self.recipient_thread
    }

    /// True if both messages carry the same keys to the same thread,
    /// whatever their timestamps.
    pub fn same_payload(&self, other: &Self) -> bool {
        self.bundle == other.bundle && self.recipient_thread == other.recipient_thread
    }

    /// True if the message carries no key at all.
    pub fn is_empty_payload(&self) -> bool {
        self.bundle.is_empty()
    }
}

fn resolve_self_thread(
    local_thread: &ContactThread,
    snapshot: &dyn ReadTransaction,
) -> Result<ThreadId, ConstructionError> {
    let local = snapshot
        .local_account()
        .ok_or(ConstructionError::LocalAccountUnknown)?;

    let stored = snapshot
        .contact_thread(&local_thread.id)
        .ok_or(ConstructionError::ThreadNotFound(local_thread.id))?;

    if !stored.is_self_thread(local) {
        return Err(ConstructionError::NotSelfThread {
            thread: local_thread.id,
        });
    }
    Ok(stored.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{MemoryStore, ReadSnapshot};
    use crate::{GroupThread, WriteTransaction};
    use devsync_types::{AccountId, KeyKind, KeyMaterialError};

    fn store_with_self_thread() -> (MemoryStore, ContactThread) {
        let store = MemoryStore::new();
        let local = AccountId::new();
        let own = ContactThread::new(local);
        store
            .write(|tx| {
                tx.set_local_account(local);
                tx.upsert_thread(own.into());
                Ok::<_, StoreError>(())
            })
            .unwrap();
        (store, own)
    }

    fn snapshot(store: &MemoryStore) -> ReadSnapshot {
        store.snapshot().unwrap()
    }

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn create_with_all_keys() {
        let (store, own) = store_with_self_thread();
        let msg = DeviceSyncKeysMessage::create(
            Timestamp::from_millis(10),
            &own,
            Some(&[1; 32]),
            Some(&[2; 32]),
            Some(&[3; 32]),
            &snapshot(&store),
        )
        .unwrap();

        assert_eq!(msg.timestamp(), Timestamp::from_millis(10));
        assert_eq!(msg.recipient_thread(), own.id);
        assert_eq!(msg.bundle().present_kinds(), KeyKind::ALL.to_vec());
        assert_eq!(msg.bundle().master_key().unwrap().as_bytes(), &[2u8; 32]);
    }

    #[test]
    fn empty_bundle_messages_differ_only_by_timestamp() {
        let (store, own) = store_with_self_thread();
        let snap = snapshot(&store);
        let a = DeviceSyncKeysMessage::create(at(1), &own, None, None, None, &snap)
            .unwrap();
        let b = DeviceSyncKeysMessage::create(at(2), &own, None, None, None, &snap)
            .unwrap();

        assert!(a.is_empty_payload());
        assert!(a.same_payload(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn empty_key_buffer_is_rejected() {
        let (store, own) = store_with_self_thread();
        let err = DeviceSyncKeysMessage::create(
            Timestamp::from_millis(1),
            &own,
            None,
            Some(&[]),
            None,
            &snapshot(&store),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ConstructionError::InvalidKeyMaterial(KeyMaterialError::Empty {
                kind: KeyKind::Master
            })
        );
    }

    #[test]
    fn unknown_local_account_fails_closed() {
        let store = MemoryStore::new();
        let own = ContactThread::new(AccountId::new());
        let err = DeviceSyncKeysMessage::from_snapshot(at(1), &own, &snapshot(&store))
            .unwrap_err();
        assert_eq!(err, ConstructionError::LocalAccountUnknown);
    }

    #[test]
    fn thread_missing_from_snapshot_fails_closed() {
        let (store, _) = store_with_self_thread();
        let stray = ContactThread::new(AccountId::new());
        let err = DeviceSyncKeysMessage::from_snapshot(at(1), &stray, &snapshot(&store))
            .unwrap_err();
        assert_eq!(err, ConstructionError::ThreadNotFound(stray.id));
    }

    #[test]
    fn other_contact_thread_is_not_a_recipient() {
        let (store, _) = store_with_self_thread();
        let friend = ContactThread::new(AccountId::new());
        store
            .write(|tx| {
                tx.upsert_thread(friend.into());
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let err = DeviceSyncKeysMessage::create(
            Timestamp::from_millis(1),
            &friend,
            Some(&[1; 32]),
            None,
            None,
            &snapshot(&store),
        )
        .unwrap_err();
        assert_eq!(err, ConstructionError::NotSelfThread { thread: friend.id });
    }

    #[test]
    fn group_thread_with_same_id_is_not_found() {
        let (store, _) = store_with_self_thread();
        let group = GroupThread::new("devices");
        let fake = ContactThread {
            id: group.id,
            contact: AccountId::new(),
        };
        store
            .write(|tx| {
                tx.upsert_thread(group.into());
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let err = DeviceSyncKeysMessage::from_snapshot(at(1), &fake, &snapshot(&store))
            .unwrap_err();
        assert_eq!(err, ConstructionError::ThreadNotFound(fake.id));
    }

    #[test]
    fn from_snapshot_reads_stored_bundle() {
        let (store, own) = store_with_self_thread();
        let bundle = KeyMaterialBundle::new(Some(&[9; 32]), None, Some(&[7; 16])).unwrap();
        let stored = bundle.clone();
        store
            .write(|tx| {
                tx.set_key_bundle(stored);
                Ok::<_, StoreError>(())
            })
            .unwrap();

        let msg = DeviceSyncKeysMessage::from_snapshot(at(5), &own, &snapshot(&store))
            .unwrap();
        assert_eq!(msg.bundle(), &bundle);
    }

    #[test]
    fn repeated_construction_from_unchanged_snapshot_is_stable() {
        let (store, own) = store_with_self_thread();
        store
            .write(|tx| {
                tx.set_key_bundle(KeyMaterialBundle::new(None, Some(&[4; 32]), None).unwrap());
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let snap = snapshot(&store);

        let first = DeviceSyncKeysMessage::from_snapshot(at(1), &own, &snap).unwrap();
        let second = DeviceSyncKeysMessage::from_snapshot(at(9), &own, &snap).unwrap();
        assert!(first.same_payload(&second));
        assert_eq!(second.timestamp(), Timestamp::from_millis(9));
    }

    #[test]
    fn message_outlives_store_changes() {
        let (store, own) = store_with_self_thread();
        store
            .write(|tx| {
                tx.set_key_bundle(KeyMaterialBundle::new(None, Some(&[4; 32]), None).unwrap());
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let msg = DeviceSyncKeysMessage::from_snapshot(at(1), &own, &snapshot(&store))
            .unwrap();

        store
            .write(|tx| {
                tx.set_key_bundle(KeyMaterialBundle::empty());
                Ok::<_, StoreError>(())
            })
            .unwrap();

        assert!(!msg.is_empty_payload());
    }

    #[test]
    fn debug_does_not_leak_key_bytes() {
        let (store, own) = store_with_self_thread();
        let msg = DeviceSyncKeysMessage::create(
            Timestamp::from_millis(1),
            &own,
            Some(&[0xAB; 4]),
            None,
            None,
            &snapshot(&store),
        )
        .unwrap();
        let debug = format!("{msg:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("171, 171"));
    }
}
