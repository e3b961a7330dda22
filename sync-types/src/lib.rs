//! # sync-types
//!
//! Value types for devsync: linked-device key sync and read tracking.
//!
//! This crate provides the foundational types used across all devsync crates:
//! - [`AccountId`], [`ThreadId`], [`InteractionId`] - Identity
//! - [`SortId`], [`Timestamp`] - Ordering and time
//! - [`KeyMaterial`], [`KeyMaterialBundle`] - Root keys shared with linked devices
//! - [`ReadCircumstance`] - Where and in what thread state a read happened
//! - [`KeyMaterialError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod circumstance;
mod error;
mod ids;
mod keys;

pub use circumstance::{ReadCircumstance, UnknownCircumstance};
pub use error::KeyMaterialError;
pub use ids::{AccountId, InteractionId, SortId, ThreadId, Timestamp};
pub use keys::{KeyKind, KeyMaterial, KeyMaterialBundle};
