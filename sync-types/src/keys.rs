//! Root key material that a device shares with its linked devices.
//!
//! A [`KeyMaterialBundle`] carries up to three keys: the storage-service key,
//! the account master key and the media-root backup key. Each key is opaque
//! to devsync; whether the bytes are cryptographically valid is the business
//! of whatever key-management code supplied them. The only rule enforced here
//! is that a present key is never an empty buffer.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::KeyMaterialError;

/// The kinds of root key carried in a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    /// Key protecting the account's storage-service records.
    StorageService,
    /// Account master key.
    Master,
    /// Root key for media backups.
    MediaRootBackup,
}

impl KeyKind {
    /// All kinds, in bundle field order.
    pub const ALL: [KeyKind; 3] = [
        KeyKind::StorageService,
        KeyKind::Master,
        KeyKind::MediaRootBackup,
    ];
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyKind::StorageService => "storage-service",
            KeyKind::Master => "master",
            KeyKind::MediaRootBackup => "media-root-backup",
        };
        f.write_str(name)
    }
}

/// Opaque, non-empty key bytes. Zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Copy key bytes, rejecting an empty buffer.
    pub fn new(kind: KeyKind, bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        if bytes.is_empty() {
            return Err(KeyMaterialError::Empty { kind });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the key in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the key has no bytes. Never the case for a constructed key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short SHA-256 fingerprint, safe to log or display.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"devsync-key-fingerprint-v1");
        hasher.update(&self.0);
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

// Intentionally opaque debug to avoid logging secrets
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {}])", self.0.len())
    }
}

impl Serialize for KeyMaterial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = Zeroizing::new(STANDARD.encode(&self.0));
        serializer.serialize_str(&encoded)
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Zeroizing::new(String::deserialize(deserializer)?);
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(de::Error::custom)?;
        if bytes.is_empty() {
            return Err(de::Error::custom("key material must not be empty"));
        }
        Ok(Self(bytes))
    }
}

/// Up to three root keys destined for the account's linked devices.
///
/// Built once from the authoritative key state and never mutated. An
/// entirely empty bundle is valid; it just has nothing to say.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyMaterialBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage_service_key: Option<KeyMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    master_key: Option<KeyMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    media_root_backup_key: Option<KeyMaterial>,
}

impl KeyMaterialBundle {
    /// Build a bundle from optional key buffers.
    ///
    /// # Errors
    ///
    /// Returns [`KeyMaterialError::Empty`] if any present buffer is empty.
    pub fn new(
        storage_service_key: Option<&[u8]>,
        master_key: Option<&[u8]>,
        media_root_backup_key: Option<&[u8]>,
    ) -> Result<Self, KeyMaterialError> {
        Ok(Self {
            storage_service_key: storage_service_key
                .map(|bytes| KeyMaterial::new(KeyKind::StorageService, bytes))
                .transpose()?,
            master_key: master_key
                .map(|bytes| KeyMaterial::new(KeyKind::Master, bytes))
                .transpose()?,
            media_root_backup_key: media_root_backup_key
                .map(|bytes| KeyMaterial::new(KeyKind::MediaRootBackup, bytes))
                .transpose()?,
        })
    }

    /// Build a bundle from already-validated key material.
    pub fn from_parts(
        storage_service_key: Option<KeyMaterial>,
        master_key: Option<KeyMaterial>,
        media_root_backup_key: Option<KeyMaterial>,
    ) -> Self {
        Self {
            storage_service_key,
            master_key,
            media_root_backup_key,
        }
    }

    /// A bundle with no keys at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no key is present.
    pub fn is_empty(&self) -> bool {
        self.storage_service_key.is_none()
            && self.master_key.is_none()
            && self.media_root_backup_key.is_none()
    }

    /// The storage-service key, if present.
    pub fn storage_service_key(&self) -> Option<&KeyMaterial> {
        self.storage_service_key.as_ref()
    }

    /// The master key, if present.
    pub fn master_key(&self) -> Option<&KeyMaterial> {
        self.master_key.as_ref()
    }

    /// The media-root backup key, if present.
    pub fn media_root_backup_key(&self) -> Option<&KeyMaterial> {
        self.media_root_backup_key.as_ref()
    }

    /// Look a key up by kind.
    pub fn get(&self, kind: KeyKind) -> Option<&KeyMaterial> {
        match kind {
            KeyKind::StorageService => self.storage_service_key(),
            KeyKind::Master => self.master_key(),
            KeyKind::MediaRootBackup => self.media_root_backup_key(),
        }
    }

    /// Kinds of the keys present in this bundle, in field order.
    pub fn present_kinds(&self) -> Vec<KeyKind> {
        KeyKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }
}
