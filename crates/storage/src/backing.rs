//! The narrow persistence contract consumed by the root key store.
//!
//! This module provides the [`Backing`] trait that abstracts the durable
//! collection of root key records. Implementations can use different
//! document stores (an in-memory backing ships in [`memory`](crate::memory)
//! for testing); the store core never talks to a database directly.
//!
//! # Append-only by design
//!
//! The contract deliberately exposes no update or delete operation.
//! Multiple controller processes share one collection with no leader
//! election; the absence of in-place mutation removes the whole class of
//! concurrent-mutation bugs that would otherwise require distributed
//! locking. Expired records are removed by the backing store's own TTL
//! reaper (see [`required_indexes`]), never by this subsystem.
//!
//! # Usage
//!
//! ```no_run
//! use rootkeeper_storage::{Backing, KeyId, KeyStoreResult, RootKey};
//!
//! async fn fetch<B: Backing>(backing: &B, id: &KeyId) -> KeyStoreResult<Option<RootKey>> {
//!     backing.get_key(id).await
//! }
//! ```

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::KeyStoreResult,
    legacy::LegacyBacking,
    record::RootKey,
    types::KeyId,
};

/// Persistence contract for root key records.
///
/// # Absence vs failure
///
/// Lookups return `Ok(None)` when no record exists; `Err(..)` always
/// means the store itself failed. Callers rely on this split: the
/// verification path falls through to the legacy schema only on
/// absence, never on failure.
///
/// # Deadlines
///
/// Implementations must honor ambient operation deadlines and surface
/// expiry as [`KeyStoreError::Timeout`](crate::KeyStoreError::Timeout)
/// rather than hanging. Retry policy belongs to the caller.
#[async_trait]
pub trait Backing: Send + Sync {
    /// Retrieves a root key record by exact id.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(key))` if the record exists
    /// - `Ok(None)` if no record has this id in the primary schema
    /// - `Err(..)` on storage failure
    async fn get_key(&self, id: &KeyId) -> KeyStoreResult<Option<RootKey>>;

    /// Returns the most recently created record whose `created` is at
    /// least `created_after` and whose `expires` falls within
    /// `[expires_after, expires_before]`; ties broken by the latest
    /// `created`.
    ///
    /// Used only by the minting path's selection algorithm, never for
    /// verification. Records with unknown creation time are never
    /// candidates.
    async fn find_latest_key(
        &self,
        created_after: DateTime<Utc>,
        expires_after: DateTime<Utc>,
        expires_before: DateTime<Utc>,
    ) -> KeyStoreResult<Option<RootKey>>;

    /// Durably inserts a new record.
    ///
    /// Insert-only: a duplicate id must fail loudly with
    /// [`KeyStoreError::Conflict`](crate::KeyStoreError::Conflict)
    /// rather than silently overwrite (verification correctness depends
    /// on an id never mapping to two different secrets).
    async fn insert_key(&self, key: &RootKey) -> KeyStoreResult<()>;
}

/// An index a persistent [`Backing`] implementation should ensure on
/// its collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Field names, `-`-prefixed for descending order.
    pub keys: &'static [&'static str],
    /// TTL grace period; the store's reaper removes documents this long
    /// after the indexed timestamp has passed.
    pub expire_after: Option<Duration>,
}

/// Indexes the persistence layer must provide: a descending index on
/// `created` so the minting path's windowed query is efficient, and an
/// expiry index on `expires` for the external TTL reaper.
#[must_use]
pub fn required_indexes() -> Vec<IndexSpec> {
    vec![
        IndexSpec { keys: &["-created"], expire_after: None },
        IndexSpec { keys: &["expires"], expire_after: Some(Duration::from_secs(1)) },
    ]
}

/// Scoped access to the live collection.
///
/// The surrounding system owns connection management; this subsystem
/// asks for a handle per logical operation and releases it on every
/// exit path. The optional release callback runs on `Drop`, so early
/// returns and error paths cannot leak the handle.
pub struct CollectionHandle {
    backing: Arc<dyn Backing>,
    legacy: Arc<dyn LegacyBacking>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl CollectionHandle {
    /// Creates a handle over the two schema views of one collection.
    #[must_use]
    pub fn new(backing: Arc<dyn Backing>, legacy: Arc<dyn LegacyBacking>) -> Self {
        Self { backing, legacy, release: None }
    }

    /// Attaches a release callback invoked when the handle is dropped.
    #[must_use]
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// The primary-schema view of the collection.
    #[must_use]
    pub fn backing(&self) -> &dyn Backing {
        self.backing.as_ref()
    }

    /// The legacy-schema view of the collection.
    #[must_use]
    pub fn legacy(&self) -> &dyn LegacyBacking {
        self.legacy.as_ref()
    }
}

impl Drop for CollectionHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for CollectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionHandle").finish_non_exhaustive()
    }
}

/// Factory yielding a live collection handle per logical operation.
///
/// Implemented by the surrounding system against its session pool. The
/// handle's lifetime is bounded to one mint or one verification call.
pub trait CollectionProvider: Send + Sync {
    /// Acquires a collection handle.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Unavailable`](crate::KeyStoreError::Unavailable)
    /// if no collection can be acquired.
    fn collection(&self) -> KeyStoreResult<CollectionHandle>;
}

/// A provider over fixed backing instances, for tests and embedded use.
///
/// Every acquired handle shares the same underlying backing; there is
/// nothing to release.
#[derive(Clone)]
pub struct StaticProvider {
    backing: Arc<dyn Backing>,
    legacy: Arc<dyn LegacyBacking>,
}

impl StaticProvider {
    /// Creates a provider that always hands out the given backings.
    #[must_use]
    pub fn new(backing: Arc<dyn Backing>, legacy: Arc<dyn LegacyBacking>) -> Self {
        Self { backing, legacy }
    }
}

impl CollectionProvider for StaticProvider {
    fn collection(&self) -> KeyStoreResult<CollectionHandle> {
        Ok(CollectionHandle::new(Arc::clone(&self.backing), Arc::clone(&self.legacy)))
    }
}

impl std::fmt::Debug for StaticProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticProvider").finish_non_exhaustive()
    }
}
