//! Mark interactions as read.

use anyhow::{Context, Result};
use devsync_core::{
    ReadEvent, ReadOutcome, ReadStateReconciler, ReadTrackable, ReadTransaction, Thread,
};
use devsync_types::{InteractionId, ReadCircumstance, SortId, Timestamp};
use std::path::Path;
use std::sync::Arc;

use crate::commands::peer_thread;
use crate::config::{load_store, save_store, CliConfig};
use crate::effects::LogEffects;

/// What to mark.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    /// One interaction.
    Interaction(InteractionId),
    /// Everything in the peer thread up to and including a sort id.
    Through(SortId),
}

/// Options for the read command.
#[derive(Debug, Clone, Copy)]
pub struct ReadArgs {
    /// What to mark.
    pub target: Target,
    /// Read timestamp in milliseconds; now if unset.
    pub at: Option<u64>,
    /// Circumstance; config default if unset.
    pub circumstance: Option<ReadCircumstance>,
    /// Keep notifications even if config says to clear them.
    pub no_clear: bool,
}

impl ReadArgs {
    fn event(&self, config: &CliConfig) -> ReadEvent {
        let read_at = self.at.map(Timestamp::from_millis).unwrap_or_else(Timestamp::now);
        let circumstance = self
            .circumstance
            .unwrap_or(config.reads.default_circumstance);
        ReadEvent::new(read_at, circumstance)
            .clear_notifications(config.reads.clear_notifications && !self.no_clear)
    }
}

/// Run the read command.
pub async fn run(data_dir: &Path, config: &CliConfig, args: ReadArgs) -> Result<()> {
    let store = load_store(data_dir).await?;
    let reconciler = ReadStateReconciler::with_effects(Arc::new(LogEffects));
    let event = args.event(config);

    match args.target {
        Target::Interaction(id) => {
            let outcome = store.write(|tx| -> Result<ReadOutcome> {
                let mut interaction = tx
                    .interaction(&id)
                    .with_context(|| format!("Interaction not found: {id}"))?;
                let thread = tx
                    .thread(&interaction.thread_id())
                    .context("Interaction has no thread")?;
                Ok(reconciler.mark_as_read(&mut interaction, event, &thread, tx)?)
            })?;

            match outcome {
                ReadOutcome::AlreadyRead => println!("{id} was already read"),
                ReadOutcome::MarkedRead {
                    read_at,
                    expiration_started,
                    side_effect_failures,
                } => {
                    println!("Marked {id} read at {read_at} ({})", event.circumstance);
                    if let Some(origin) = expiration_started {
                        println!("  Expiration timer started at {origin}");
                    }
                    if side_effect_failures > 0 {
                        println!("  {side_effect_failures} side effect(s) failed");
                    }
                }
            }
        }
        Target::Through(through) => {
            let summary = store.write(|tx| -> Result<_> {
                let peer = peer_thread(&*tx).context("No peer thread")?;
                let thread = Thread::from(peer);
                Ok(reconciler.mark_thread_read_through(&thread, through, event, tx)?)
            })?;
            println!(
                "Marked {} read through sort {} ({} already read)",
                summary.marked, through, summary.already_read
            );
        }
    }

    save_store(data_dir, store).await?;
    Ok(())
}
