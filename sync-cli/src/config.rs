//! Configuration and state files for devsync.
//!
//! - `devsync.toml` (optional): operator settings, loaded with per-field
//!   defaults.
//! - `state.json`: the persisted [`StoreState`], owner read/write only.

use anyhow::{Context, Result};
use devsync_core::{MemoryStore, StoreState};
use devsync_types::ReadCircumstance;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the optional config file inside the data directory.
pub const CONFIG_FILE: &str = "devsync.toml";

/// Name of the state file inside the data directory.
pub const STATE_FILE: &str = "state.json";

/// Root configuration for the CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Read command defaults.
    #[serde(default)]
    pub reads: ReadsConfig,
    /// Key handling.
    #[serde(default)]
    pub keys: KeysConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset (default: info).
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Read command defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadsConfig {
    /// Clear notifications when marking read (default: true).
    #[serde(default = "default_clear_notifications")]
    pub clear_notifications: bool,
    /// Circumstance used when `--circumstance` is not given
    /// (default: on-this-device).
    #[serde(default = "default_circumstance")]
    pub default_circumstance: ReadCircumstance,
}

/// Key handling.
#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    /// Generate fresh root keys during `init` (default: true).
    #[serde(default = "default_generate_on_init")]
    pub generate_on_init: bool,
}

// Default value functions
fn default_filter() -> String {
    "info".to_string()
}

fn default_clear_notifications() -> bool {
    true
}

fn default_circumstance() -> ReadCircumstance {
    ReadCircumstance::OnThisDevice
}

fn default_generate_on_init() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Default for ReadsConfig {
    fn default() -> Self {
        Self {
            clear_notifications: default_clear_notifications(),
            default_circumstance: default_circumstance(),
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            generate_on_init: default_generate_on_init(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load `devsync.toml` from the data directory, or defaults if absent.
    pub fn load_or_default(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// True if `state.json` exists in the data directory.
pub fn state_exists(data_dir: &Path) -> bool {
    data_dir.join(STATE_FILE).exists()
}

/// Load the store from `state.json`.
pub async fn load_store(data_dir: &Path) -> Result<MemoryStore> {
    let path = data_dir.join(STATE_FILE);
    let contents = tokio::fs::read_to_string(&path)
        .await
        .context("Not initialized. Run 'devsync init' first.")?;
    let state: StoreState = serde_json::from_str(&contents).context("Invalid state file")?;
    Ok(MemoryStore::from_state(state))
}

/// Save the store to `state.json`.
pub async fn save_store(data_dir: &Path, store: MemoryStore) -> Result<()> {
    let state = store.into_state().context("Store lock poisoned")?;
    let path = data_dir.join(STATE_FILE);
    let contents = serde_json::to_string_pretty(&state)?;
    tokio::fs::write(&path, contents)
        .await
        .context("Failed to save state")?;
    set_file_permissions_0600(&path).await?;
    Ok(())
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
pub async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devsync_core::{ReadTransaction, StoreError, WriteTransaction};
    use devsync_types::{AccountId, KeyMaterialBundle};
    use tempfile::tempdir;

    #[test]
    fn defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.logging.filter, "info");
        assert!(config.reads.clear_notifications);
        assert_eq!(
            config.reads.default_circumstance,
            ReadCircumstance::OnThisDevice
        );
        assert!(config.keys.generate_on_init);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[reads]\ndefault_circumstance = \"on-linked-device\"\n",
        )
        .unwrap();

        let config = CliConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(
            config.reads.default_circumstance,
            ReadCircumstance::OnLinkedDevice
        );
        assert!(config.reads.clear_notifications);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn unknown_circumstance_is_a_parse_error() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[reads]\ndefault_circumstance = \"somewhere\"\n",
        )
        .unwrap();

        let err = CliConfig::load_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[tokio::test]
    async fn store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new();
        let local = AccountId::new();
        store
            .write(|tx| {
                tx.set_local_account(local);
                tx.set_key_bundle(KeyMaterialBundle::new(None, Some(&[5; 32]), None).unwrap());
                Ok::<_, StoreError>(())
            })
            .unwrap();
        save_store(dir.path(), store).await.unwrap();

        let loaded = load_store(dir.path()).await.unwrap();
        let snapshot = loaded.snapshot().unwrap();
        assert_eq!(snapshot.local_account(), Some(local));
        assert!(snapshot.key_bundle().unwrap().master_key().is_some());
    }

    #[tokio::test]
    async fn load_without_state_fails() {
        let dir = tempdir().unwrap();
        assert!(load_store(dir.path()).await.is_err());
        assert!(!state_exists(dir.path()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn state_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        save_store(dir.path(), MemoryStore::new()).await.unwrap();

        let path = dir.path().join(STATE_FILE);
        let perms = tokio::fs::metadata(&path).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600, "file should be 0600");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn data_dir_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("test-data");
        tokio::fs::create_dir_all(&data_dir).await.unwrap();
        set_dir_permissions_0700(&data_dir).await.unwrap();

        let perms = tokio::fs::metadata(&data_dir).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o700, "dir should be 0700");
    }
}
