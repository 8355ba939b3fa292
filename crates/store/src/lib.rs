//! Macaroon root key store: issues, caches, rotates, and looks up the
//! symmetric root keys that sign and verify bearer tokens across a
//! fleet of uncoordinated controller processes.
//!
//! The durable schema and backing contracts live in
//! `rootkeeper-storage`; this crate adds the policy-driven lifecycle on
//! top:
//!
//! - [`RootKeyStore::current_signing_key`] returns a key fit to mint a
//!   token right now, generating and persisting a fresh one when no
//!   existing record has enough validity left.
//! - [`RootKeyStore::key_by_id`] resolves a key id carried inside a
//!   presented token, falling back to the pre-migration legacy schema
//!   when the primary schema reports absence.
//!
//! Rotation is driven entirely by [`Policy`] durations; no process
//! coordinates with any other. See [`RootKeyStore`] for the exact
//! selection rules and the multi-writer convergence story.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod store;

pub use cache::KeyCache;
pub use rootkeeper_storage::{KeyId, KeyStoreError, KeyStoreResult, RootKey};
pub use store::{DEFAULT_CACHE_CAPACITY, Policy, PolicyError, RootKeyStore, SECRET_LEN};
