//! Error types for sync-core.

use devsync_types::{InteractionId, KeyMaterialError, SortId, ThreadId};

/// Persistence collaborator errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record ("thread", "interaction").
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A record with the same identifier already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that collided.
        id: String,
    },

    /// An interaction's sort id does not follow the thread's last sort id.
    #[error("sort id {sort_id} does not follow {last} in thread {thread}")]
    SortOrder {
        /// Thread the interaction was inserted into.
        thread: ThreadId,
        /// Sort id of the rejected interaction.
        sort_id: SortId,
        /// Highest sort id already in the thread.
        last: SortId,
    },

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors building a [`DeviceSyncKeysMessage`](crate::DeviceSyncKeysMessage).
///
/// Construction fails closed: no message is produced when any of these occur.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// The snapshot does not know which account is local.
    #[error("local account is not registered")]
    LocalAccountUnknown,

    /// The thread passed in does not exist in the snapshot.
    #[error("thread not found: {0}")]
    ThreadNotFound(ThreadId),

    /// The thread exists but is not the conversation with the local account.
    #[error("thread {thread} is not the local self-thread")]
    NotSelfThread {
        /// The offending thread.
        thread: ThreadId,
    },

    /// A supplied key buffer was present but empty.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(#[from] KeyMaterialError),

    /// Reading the key state from the snapshot failed.
    #[error("failed to read key snapshot: {0}")]
    KeySnapshot(#[source] StoreError),
}

/// Errors from read reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// The thread passed in does not own the interaction.
    ///
    /// A protocol or integrity violation (e.g. a misrouted sync event). Not
    /// retried; nothing was mutated.
    #[error("interaction {interaction} belongs to thread {expected}, not {actual}")]
    ThreadMismatch {
        /// The interaction being marked.
        interaction: InteractionId,
        /// The thread that owns it.
        expected: ThreadId,
        /// The thread that was passed in.
        actual: ThreadId,
    },

    /// Persisting the new read state failed; nothing was applied.
    #[error("failed to persist read state: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
