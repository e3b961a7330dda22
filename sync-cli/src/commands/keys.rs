//! Show, rotate and sync root keys.

use anyhow::{Context, Result};
use devsync_core::{KeySync, KeySyncTrigger, ReadTransaction, WriteTransaction};
use devsync_types::{KeyKind, KeyMaterialBundle, Timestamp};
use std::path::Path;
use zeroize::Zeroizing;

use crate::config::{load_store, save_store};
use crate::effects::LogDelivery;

/// Length of freshly generated root keys.
const KEY_LEN: usize = 32;

/// Generate a bundle with all three root keys.
pub fn generate_bundle() -> Result<KeyMaterialBundle> {
    let mut storage = Zeroizing::new([0u8; KEY_LEN]);
    let mut master = Zeroizing::new([0u8; KEY_LEN]);
    let mut backup = Zeroizing::new([0u8; KEY_LEN]);
    for buf in [&mut storage, &mut master, &mut backup] {
        getrandom::getrandom(&mut buf[..])
            .map_err(|e| anyhow::anyhow!("getrandom failed: {e}"))?;
    }

    KeyMaterialBundle::new(Some(&storage[..]), Some(&master[..]), Some(&backup[..]))
        .context("Generated key material was rejected")
}

/// Print fingerprints of the keys in a bundle.
pub fn print_fingerprints(bundle: &KeyMaterialBundle) {
    for kind in KeyKind::ALL {
        match bundle.get(kind) {
            Some(key) => println!("  {:<18} {}", kind.to_string(), key.fingerprint()),
            None => println!("  {:<18} (absent)", kind.to_string()),
        }
    }
}

/// Run the keys command.
///
/// With `rotate`, replaces the stored keys and syncs them. With `resync`,
/// answers a linked device's resync request. Otherwise only shows the keys.
pub async fn run(data_dir: &Path, rotate: bool, resync: Option<String>) -> Result<()> {
    let store = load_store(data_dir).await?;

    let trigger = if rotate {
        let bundle = generate_bundle()?;
        store.write(|tx| -> Result<()> {
            tx.set_key_bundle(bundle);
            Ok(())
        })?;
        Some(KeySyncTrigger::KeysChanged)
    } else {
        resync.map(|device_label| KeySyncTrigger::ResyncRequested { device_label })
    };

    let snapshot = store.snapshot()?;
    println!("Keys:");
    print_fingerprints(&snapshot.key_bundle()?);

    if let Some(trigger) = trigger {
        let sync = KeySync::new(LogDelivery);
        let message = sync
            .sync(trigger.clone(), Timestamp::now(), &snapshot)
            .context("Key sync failed")?;
        println!();
        println!(
            "Key sync ({}) queued for self-thread {} ({} keys)",
            trigger,
            message.recipient_thread(),
            message.bundle().present_kinds().len()
        );
    }

    if rotate {
        save_store(data_dir, store).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init;
    use crate::config::CliConfig;
    use tempfile::tempdir;

    #[test]
    fn generated_bundle_has_all_keys() {
        let bundle = generate_bundle().unwrap();
        assert_eq!(bundle.present_kinds(), KeyKind::ALL.to_vec());
        assert_eq!(bundle.master_key().unwrap().len(), KEY_LEN);
        assert_ne!(bundle.master_key(), bundle.storage_service_key());
    }

    #[tokio::test]
    async fn rotate_replaces_stored_keys() {
        let dir = tempdir().unwrap();
        init::run(dir.path(), &CliConfig::default()).await.unwrap();
        let before = load_store(dir.path())
            .await
            .unwrap()
            .snapshot()
            .unwrap()
            .key_bundle()
            .unwrap();

        run(dir.path(), true, None).await.unwrap();

        let after = load_store(dir.path())
            .await
            .unwrap()
            .snapshot()
            .unwrap()
            .key_bundle()
            .unwrap();
        assert_ne!(before, after);
        assert!(!after.is_empty());
    }

    #[tokio::test]
    async fn resync_leaves_keys_unchanged() {
        let dir = tempdir().unwrap();
        init::run(dir.path(), &CliConfig::default()).await.unwrap();
        let before = load_store(dir.path()).await.unwrap().into_state().unwrap();

        run(dir.path(), false, Some("laptop".into())).await.unwrap();

        let after = load_store(dir.path()).await.unwrap().into_state().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn keys_require_init() {
        let dir = tempdir().unwrap();
        assert!(run(dir.path(), false, None).await.is_err());
    }
}
