//! Persistence collaborator contract.
//!
//! devsync does not own a database. It reads and writes through these
//! traits, implemented by whatever store the host application uses.
//! [`MemoryStore`](crate::MemoryStore) is the reference implementation.
//!
//! # Guarantees expected from implementations
//!
//! - Reads within one handle see a single point-in-time view.
//! - A write handle is exclusive for its lifetime, and its changes become
//!   visible atomically on commit or not at all.

use devsync_types::{AccountId, InteractionId, KeyMaterialBundle, SortId, ThreadId};

use crate::error::StoreResult;
use crate::{ContactThread, Interaction, ReadState, Thread};

/// Snapshot-isolated read access.
pub trait ReadTransaction {
    /// The account this device belongs to, if registered.
    fn local_account(&self) -> Option<AccountId>;

    /// Look up a thread.
    fn thread(&self, id: &ThreadId) -> Option<Thread>;

    /// All threads.
    fn threads(&self) -> Vec<Thread>;

    /// Current root key state, read in one piece.
    fn key_bundle(&self) -> StoreResult<KeyMaterialBundle>;

    /// Look up an interaction.
    fn interaction(&self, id: &InteractionId) -> Option<Interaction>;

    /// Interactions in a thread, ordered by sort id.
    fn interactions_in_thread(&self, thread: &ThreadId) -> Vec<Interaction>;

    /// Look up a contact thread.
    fn contact_thread(&self, id: &ThreadId) -> Option<ContactThread> {
        self.thread(id).and_then(|t| t.as_contact().copied())
    }

    /// The conversation of the local account with itself.
    fn local_thread(&self) -> Option<ContactThread> {
        let local = self.local_account()?;
        self.threads()
            .iter()
            .filter_map(Thread::as_contact)
            .find(|t| t.is_self_thread(local))
            .copied()
    }
}

/// Exclusive write access.
pub trait WriteTransaction: ReadTransaction {
    /// Register the local account.
    fn set_local_account(&mut self, account: AccountId);

    /// Replace the root key state.
    fn set_key_bundle(&mut self, bundle: KeyMaterialBundle);

    /// Insert or replace a thread.
    fn upsert_thread(&mut self, thread: Thread);

    /// Allocate the next sort id.
    fn next_sort_id(&mut self) -> SortId;

    /// Insert a new interaction.
    ///
    /// # Errors
    ///
    /// Fails if the thread is unknown, the id already exists, or the sort id
    /// does not follow every sort id already in the thread.
    fn insert_interaction(&mut self, interaction: Interaction) -> StoreResult<()>;

    /// Persist the read state of an interaction.
    fn save_read_state(&mut self, id: &InteractionId, state: &ReadState) -> StoreResult<()>;
}
