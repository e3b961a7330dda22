//! CLI command implementations.

pub mod init;
pub mod keys;
pub mod read;
pub mod receive;
pub mod status;

use devsync_core::{ContactThread, ReadTransaction};

/// The contact thread messages are received on: the first contact thread
/// that is not the self-thread.
pub fn peer_thread(snapshot: &dyn ReadTransaction) -> Option<ContactThread> {
    let local = snapshot.local_account()?;
    snapshot
        .threads()
        .iter()
        .filter_map(|t| t.as_contact())
        .find(|t| !t.is_self_thread(local))
        .copied()
}
