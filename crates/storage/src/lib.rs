//! Persistence primitives for macaroon root keys.
//!
//! This crate provides the data model and the narrow persistence
//! contract consumed by the root key store in `rootkeeper-store`. A
//! fleet of controller processes shares one durable collection of root
//! key records through the [`Backing`] trait; the collection is
//! append-only, so correctness across uncoordinated writers needs no
//! distributed locking.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 rootkeeper-store                            │
//! │     RootKeyStore (mint / verify) + bounded KeyCache         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 rootkeeper-storage                          │
//! │   Backing trait        │  LegacyBacking trait               │
//! │   (get, find_latest,   │  (read-only bridge to the          │
//! │    insert-only)        │   pre-migration schema)            │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryBacking│        production document store             │
//! │   (testing)  │        (implemented by the embedder)         │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use chrono::{Duration, Utc};
//! use rootkeeper_storage::{Backing, MemoryBacking, RootKey};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backing = MemoryBacking::new();
//!     let now = Utc::now();
//!
//!     let key = RootKey::builder()
//!         .id(vec![1, 2, 3, 4])
//!         .secret(vec![0x5e; 24])
//!         .created(now)
//!         .expires(now + Duration::days(30))
//!         .build();
//!
//!     backing.insert_key(&key).await?;
//!
//!     let fetched = backing.get_key(&key.id).await?;
//!     assert_eq!(fetched, Some(key));
//!     Ok(())
//! }
//! ```
//!
//! # Implementing a Backing
//!
//! 1. Implement [`Backing`] against the production document store
//! 2. Implement [`LegacyBacking`] over the same collection (use [`decode_legacy_doc`])
//! 3. Ensure the indexes from [`required_indexes`] exist, including the TTL reaper index
//! 4. Map store-specific errors to [`KeyStoreError`]
//!
//! See the [`memory`] module source for a reference implementation.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with shared test helpers (record factories,
//!   seeded backings, assertion macros). Enable this in `[dev-dependencies]` for integration
//!   tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backing;
pub mod error;
pub mod legacy;
pub mod memory;
pub mod record;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backing::{
    Backing, CollectionHandle, CollectionProvider, IndexSpec, StaticProvider, required_indexes,
};
pub use error::{BoxError, KeyStoreError, KeyStoreResult};
pub use legacy::{LegacyBacking, LegacyDoc, LegacyPayload, decode_legacy_doc};
pub use memory::MemoryBacking;
pub use record::RootKey;
pub use types::KeyId;
pub use zeroize::Zeroizing;
