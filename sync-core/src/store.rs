//! In-memory reference implementation of the persistence collaborator.
//!
//! - [`MemoryStore::snapshot`] returns an owned point-in-time copy; no lock
//!   is held after it returns.
//! - [`MemoryStore::begin`] returns a [`WriteTx`] guard that holds the store
//!   lock and stages changes on a private copy. [`WriteTx::commit`]
//!   publishes them; dropping the guard without committing discards them.
//! - [`MemoryStore::write`] wraps both: commit on `Ok`, roll back on `Err`.
//!
//! [`StoreState`] is serializable so a host can persist it between runs.

use devsync_types::{AccountId, InteractionId, KeyMaterialBundle, SortId, ThreadId};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};
use crate::{Interaction, ReadState, ReadTrackable, ReadTransaction, Thread, WriteTransaction};

/// Everything the store holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    local_account: Option<AccountId>,
    #[serde(default)]
    keys: KeyMaterialBundle,
    #[serde(default)]
    threads: Vec<Thread>,
    /// Append-only, ordered by sort id.
    #[serde(default)]
    interactions: Vec<Interaction>,
    #[serde(default)]
    last_sort_id: SortId,
}

impl StoreState {
    fn interaction_mut(&mut self, id: &InteractionId) -> Option<&mut Interaction> {
        self.interactions.iter_mut().find(|i| i.unique_id() == *id)
    }

    fn last_sort_id_in(&self, thread: &ThreadId) -> Option<SortId> {
        self.interactions
            .iter()
            .filter(|i| i.thread_id() == *thread)
            .map(|i| i.sort_id())
            .max()
    }
}

impl ReadTransaction for StoreState {
    fn local_account(&self) -> Option<AccountId> {
        self.local_account
    }

    fn thread(&self, id: &ThreadId) -> Option<Thread> {
        self.threads.iter().find(|t| t.id() == *id).cloned()
    }

    fn threads(&self) -> Vec<Thread> {
        self.threads.clone()
    }

    fn key_bundle(&self) -> StoreResult<KeyMaterialBundle> {
        Ok(self.keys.clone())
    }

    fn interaction(&self, id: &InteractionId) -> Option<Interaction> {
        self.interactions
            .iter()
            .find(|i| i.unique_id() == *id)
            .cloned()
    }

    fn interactions_in_thread(&self, thread: &ThreadId) -> Vec<Interaction> {
        let mut found: Vec<Interaction> = self
            .interactions
            .iter()
            .filter(|i| i.thread_id() == *thread)
            .cloned()
            .collect();
        found.sort_by_key(|i| i.sort_id());
        found
    }
}

impl WriteTransaction for StoreState {
    fn set_local_account(&mut self, account: AccountId) {
        self.local_account = Some(account);
    }

    fn set_key_bundle(&mut self, bundle: KeyMaterialBundle) {
        self.keys = bundle;
    }

    fn upsert_thread(&mut self, thread: Thread) {
        match self.threads.iter_mut().find(|t| t.id() == thread.id()) {
            Some(existing) => *existing = thread,
            None => self.threads.push(thread),
        }
    }

    fn next_sort_id(&mut self) -> SortId {
        self.last_sort_id = self.last_sort_id.next();
        self.last_sort_id
    }

    fn insert_interaction(&mut self, interaction: Interaction) -> StoreResult<()> {
        let thread = interaction.thread_id();
        if self.thread(&thread).is_none() {
            return Err(StoreError::NotFound {
                entity: "thread",
                id: thread.to_string(),
            });
        }

        let id = interaction.unique_id();
        if self.interaction(&id).is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "interaction",
                id: id.to_string(),
            });
        }

        let sort_id = interaction.sort_id();
        if let Some(last) = self.last_sort_id_in(&thread) {
            if sort_id <= last {
                return Err(StoreError::SortOrder {
                    thread,
                    sort_id,
                    last,
                });
            }
        }

        self.last_sort_id = self.last_sort_id.max(sort_id);
        self.interactions.push(interaction);
        Ok(())
    }

    fn save_read_state(&mut self, id: &InteractionId, state: &ReadState) -> StoreResult<()> {
        let interaction = self.interaction_mut(id).ok_or_else(|| StoreError::NotFound {
            entity: "interaction",
            id: id.to_string(),
        })?;
        *interaction.read_state_mut() = *state;
        Ok(())
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from previously persisted state.
    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    /// Take the state out, e.g. to persist it.
    pub fn into_state(self) -> StoreResult<StoreState> {
        self.state.into_inner().map_err(|_| StoreError::Poisoned)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Owned point-in-time copy for reading.
    pub fn snapshot(&self) -> StoreResult<ReadSnapshot> {
        Ok(ReadSnapshot(self.lock()?.clone()))
    }

    /// Begin an exclusive write transaction.
    ///
    /// Blocks while another write transaction is open.
    pub fn begin(&self) -> StoreResult<WriteTx<'_>> {
        let guard = self.lock()?;
        let staged = guard.clone();
        Ok(WriteTx {
            guard,
            staged,
            committed: false,
        })
    }

    /// Run `f` in a write transaction: commit if it returns `Ok`, roll back
    /// if it returns `Err`.
    pub fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut WriteTx<'_>) -> Result<T, E>,
    {
        let mut tx = self.begin()?;
        let value = f(&mut tx)?;
        tx.commit();
        Ok(value)
    }
}

/// Owned, immutable view of the store at one point in time.
#[derive(Debug, Clone)]
pub struct ReadSnapshot(StoreState);

impl ReadSnapshot {
    /// Wrap state that was loaded elsewhere.
    pub fn from_state(state: StoreState) -> Self {
        Self(state)
    }
}

impl ReadTransaction for ReadSnapshot {
    fn local_account(&self) -> Option<AccountId> {
        self.0.local_account()
    }

    fn thread(&self, id: &ThreadId) -> Option<Thread> {
        self.0.thread(id)
    }

    fn threads(&self) -> Vec<Thread> {
        self.0.threads()
    }

    fn key_bundle(&self) -> StoreResult<KeyMaterialBundle> {
        self.0.key_bundle()
    }

    fn interaction(&self, id: &InteractionId) -> Option<Interaction> {
        self.0.interaction(id)
    }

    fn interactions_in_thread(&self, thread: &ThreadId) -> Vec<Interaction> {
        self.0.interactions_in_thread(thread)
    }
}

/// Write transaction guard.
///
/// Holds the store lock until dropped. Changes are staged and published only
/// by [`commit`](WriteTx::commit).
#[derive(Debug)]
pub struct WriteTx<'a> {
    guard: MutexGuard<'a, StoreState>,
    staged: StoreState,
    committed: bool,
}

impl WriteTx<'_> {
    /// Publish the staged changes and release the lock.
    pub fn commit(mut self) {
        *self.guard = std::mem::take(&mut self.staged);
        self.committed = true;
        tracing::debug!("write transaction committed");
    }
}

impl Drop for WriteTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            tracing::debug!("write transaction rolled back");
        }
    }
}

impl ReadTransaction for WriteTx<'_> {
    fn local_account(&self) -> Option<AccountId> {
        self.staged.local_account()
    }

    fn thread(&self, id: &ThreadId) -> Option<Thread> {
        self.staged.thread(id)
    }

    fn threads(&self) -> Vec<Thread> {
        self.staged.threads()
    }

    fn key_bundle(&self) -> StoreResult<KeyMaterialBundle> {
        self.staged.key_bundle()
    }

    fn interaction(&self, id: &InteractionId) -> Option<Interaction> {
        self.staged.interaction(id)
    }

    fn interactions_in_thread(&self, thread: &ThreadId) -> Vec<Interaction> {
        self.staged.interactions_in_thread(thread)
    }
}

impl WriteTransaction for WriteTx<'_> {
    fn set_local_account(&mut self, account: AccountId) {
        self.staged.set_local_account(account);
    }

    fn set_key_bundle(&mut self, bundle: KeyMaterialBundle) {
        self.staged.set_key_bundle(bundle);
    }

    fn upsert_thread(&mut self, thread: Thread) {
        self.staged.upsert_thread(thread);
    }

    fn next_sort_id(&mut self) -> SortId {
        self.staged.next_sort_id()
    }

    fn insert_interaction(&mut self, interaction: Interaction) -> StoreResult<()> {
        self.staged.insert_interaction(interaction)
    }

    fn save_read_state(&mut self, id: &InteractionId, state: &ReadState) -> StoreResult<()> {
        self.staged.save_read_state(id, state)
    }
}
