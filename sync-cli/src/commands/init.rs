//! Initialize the local account.

use anyhow::Result;
use devsync_core::{ContactThread, MemoryStore, WriteTransaction};
use devsync_types::{AccountId, KeyMaterialBundle};
use std::path::Path;

use crate::commands::keys::{generate_bundle, print_fingerprints};
use crate::config::{save_store, set_dir_permissions_0700, state_exists, CliConfig, STATE_FILE};

/// Run the init command.
///
/// Registers a fresh local account with its self-thread and one peer
/// thread, and generates root keys unless disabled in config.
pub async fn run(data_dir: &Path, config: &CliConfig) -> Result<()> {
    if state_exists(data_dir) {
        anyhow::bail!(
            "Already initialized. Delete {} to reinitialize.",
            data_dir.join(STATE_FILE).display()
        );
    }

    let local = AccountId::new();
    let own = ContactThread::new(local);
    let peer = ContactThread::new(AccountId::new());
    let bundle = if config.keys.generate_on_init {
        generate_bundle()?
    } else {
        KeyMaterialBundle::empty()
    };

    let store = MemoryStore::new();
    store.write(|tx| -> Result<()> {
        tx.set_local_account(local);
        tx.upsert_thread(own.into());
        tx.upsert_thread(peer.into());
        tx.set_key_bundle(bundle.clone());
        Ok(())
    })?;

    set_dir_permissions_0700(data_dir).await?;
    save_store(data_dir, store).await?;
    tracing::info!(account = %local, "initialized");

    println!("Initialized successfully!");
    println!();
    println!("  Account:     {}", local);
    println!("  Self-thread: {}", own.id);
    println!("  Peer thread: {}", peer.id);
    println!("  Data dir:    {}", data_dir.display());
    println!();
    println!("Keys:");
    print_fingerprints(&bundle);
    println!();
    println!("Next steps:");
    println!("  1. Receive a message: devsync receive \"hello\"");
    println!("  2. Mark it read:      devsync read <id>");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::peer_thread;
    use crate::config::{load_store, KeysConfig};
    use devsync_core::ReadTransaction;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_creates_state() {
        let dir = tempdir().unwrap();
        run(dir.path(), &CliConfig::default()).await.unwrap();

        assert!(dir.path().join(STATE_FILE).exists());

        let snapshot = load_store(dir.path()).await.unwrap().snapshot().unwrap();
        let local = snapshot.local_account().unwrap();
        assert!(snapshot.local_thread().unwrap().is_self_thread(local));
        assert!(peer_thread(&snapshot).is_some());
        assert!(!snapshot.key_bundle().unwrap().is_empty());
    }

    #[tokio::test]
    async fn init_without_keys() {
        let dir = tempdir().unwrap();
        let config = CliConfig {
            keys: KeysConfig {
                generate_on_init: false,
            },
            ..Default::default()
        };
        run(dir.path(), &config).await.unwrap();

        let snapshot = load_store(dir.path()).await.unwrap().snapshot().unwrap();
        assert!(snapshot.key_bundle().unwrap().is_empty());
    }

    #[tokio::test]
    async fn init_fails_if_already_initialized() {
        let dir = tempdir().unwrap();

        run(dir.path(), &CliConfig::default()).await.unwrap();

        let result = run(dir.path(), &CliConfig::default()).await;
        assert!(result.is_err());
    }
}
