//! Simulate an incoming interaction on the peer thread.

use anyhow::{Context, Result};
use devsync_core::{
    CallKind, CallNotification, IncomingMessage, Interaction, ReadTrackable, WriteTransaction,
};
use devsync_types::{InteractionId, SortId, Timestamp};
use std::path::Path;
use std::time::Duration;

use crate::commands::peer_thread;
use crate::config::{load_store, save_store};

/// What was received.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// A text message, optionally disappearing.
    Message {
        /// Message text.
        body: String,
        /// Disappearing-message duration.
        expires_in: Option<Duration>,
    },
    /// A call notification.
    Call(CallKind),
}

/// Run the receive command. Returns the id of the new interaction.
pub async fn run(data_dir: &Path, incoming: Incoming) -> Result<InteractionId> {
    let store = load_store(data_dir).await?;

    let (id, sort_id) = store.write(|tx| -> Result<(InteractionId, SortId)> {
        let thread = peer_thread(&*tx).context("No peer thread. Run 'devsync init' first.")?;
        let sort_id = tx.next_sort_id();
        let now = Timestamp::now();

        let interaction: Interaction = match incoming {
            Incoming::Message { body, expires_in } => {
                let mut message =
                    IncomingMessage::new(thread.id, sort_id, thread.contact, Some(body), now);
                message.expires_in = expires_in;
                message.into()
            }
            Incoming::Call(kind) => {
                CallNotification::new(thread.id, sort_id, thread.contact, kind, now).into()
            }
        };
        let id = interaction.unique_id();

        tx.insert_interaction(interaction)?;
        Ok((id, sort_id))
    })?;

    save_store(data_dir, store).await?;
    tracing::debug!(interaction = %id, %sort_id, "received");

    println!("Received {} (sort {})", id, sort_id);
    Ok(id)
}
