//! Show account, thread and key status.

use anyhow::Result;
use devsync_core::{Interaction, ReadTrackable, ReadTransaction, Thread};
use devsync_types::Timestamp;
use std::path::Path;

use crate::commands::keys::print_fingerprints;
use crate::config::{load_store, state_exists};

/// Run the status command.
pub async fn run(data_dir: &Path) -> Result<()> {
    println!("=== devsync status ===");
    println!();

    if !state_exists(data_dir) {
        println!("Account: NOT INITIALIZED");
        println!();
        println!("Run 'devsync init' to initialize.");
        return Ok(());
    }

    let snapshot = load_store(data_dir).await?.snapshot()?;

    match (snapshot.local_account(), snapshot.local_thread()) {
        (Some(account), Some(own)) => {
            println!("Account:");
            println!("  ID:          {}", account);
            println!("  Self-thread: {}", own.id);
        }
        (Some(account), None) => {
            println!("Account:");
            println!("  ID:          {}", account);
            println!("  Self-thread: MISSING (key sync unavailable)");
        }
        (None, _) => println!("Account: NOT REGISTERED"),
    }

    println!();
    println!("Threads:");
    let now = Timestamp::now();
    for thread in snapshot.threads() {
        let interactions = snapshot.interactions_in_thread(&thread.id());
        let unread = interactions.iter().filter(|i| !i.is_read()).count();
        let expiring = interactions
            .iter()
            .filter(|i| i.expire_started_at().is_some())
            .count();
        let label = match &thread {
            Thread::Contact(t) if Some(t.contact) == snapshot.local_account() => "self".to_string(),
            Thread::Contact(_) => "contact".to_string(),
            Thread::Group(g) => format!("group \"{}\"", g.name),
        };
        println!(
            "  {} [{}] {} interactions, {} unread, {} expiring",
            thread.id(),
            label,
            interactions.len(),
            unread,
            expiring
        );
        for interaction in interactions.iter().filter(|i| !i.is_read()) {
            println!(
                "    unread {} (sort {}, {})",
                interaction.unique_id(),
                interaction.sort_id(),
                format_age(received_at(interaction), now)
            );
        }
    }

    println!();
    println!("Keys:");
    print_fingerprints(&snapshot.key_bundle()?);

    Ok(())
}

fn received_at(interaction: &Interaction) -> Timestamp {
    match interaction {
        Interaction::IncomingMessage(m) => m.received_at,
        Interaction::Call(c) => c.started_at,
    }
}

/// Format the age of a timestamp as a human-readable string.
fn format_age(ts: Timestamp, now: Timestamp) -> String {
    let diff = now.as_millis().saturating_sub(ts.as_millis()) / 1000;

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}
