//! Error types for devsync value types.

use thiserror::Error;

use crate::KeyKind;

/// Errors raised when constructing key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyMaterialError {
    /// A key was present but contained no bytes.
    #[error("{kind} key material is present but empty")]
    Empty {
        /// Which key was empty.
        kind: KeyKind,
    },
}
