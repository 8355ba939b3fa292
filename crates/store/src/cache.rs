//! Process-local, bounded cache of recently used root keys.
//!
//! Each controller process keeps its own cache; nothing here is shared
//! or synchronized across processes. Correctness never depends on the
//! cache; it only saves round-trips to the backing collection.

use moka::future::Cache;
use parking_lot::Mutex;
use rootkeeper_storage::{KeyId, RootKey};

/// Bounded `id → RootKey` cache plus a single "current signing key" slot.
///
/// The id map is backed by [`moka::future::Cache`], which gives a hard
/// capacity ceiling with O(1) amortized access; callers depend only on
/// the ceiling, not on any particular eviction policy. The
/// current-key slot remembers the minting path's
/// last selection so repeat mints within the same lifetime window skip
/// the windowed backing query entirely.
///
/// # Locking
///
/// The slot mutex protects a clone-in, clone-out `Option<RootKey>` and
/// is never held across I/O or `.await` points.
pub struct KeyCache {
    keys: Cache<KeyId, RootKey>,
    current: Mutex<Option<RootKey>>,
}

impl KeyCache {
    /// Creates a cache holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self { keys: Cache::builder().max_capacity(capacity).build(), current: Mutex::new(None) }
    }

    /// Returns the cached record for `id`, if resident.
    pub async fn get(&self, id: &KeyId) -> Option<RootKey> {
        self.keys.get(id).await
    }

    /// Inserts a record, evicting per the bounded policy if needed.
    pub async fn put(&self, key: RootKey) {
        self.keys.insert(key.id.clone(), key).await;
    }

    /// Returns a clone of the current signing key slot.
    #[must_use]
    pub fn current(&self) -> Option<RootKey> {
        self.current.lock().clone()
    }

    /// Replaces the current signing key slot and makes the record
    /// resident in the id map so the verification path can serve it
    /// without I/O.
    pub async fn set_current(&self, key: RootKey) {
        *self.current.lock() = Some(key.clone());
        self.put(key).await;
    }

    /// Returns the number of resident records.
    ///
    /// Note: this count is eventually consistent. For accurate counts
    /// in tests, call [`sync`](Self::sync) first.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.keys.entry_count()
    }

    /// Flushes pending cache maintenance (inserts, evictions).
    ///
    /// Test support: entry counts are eventually consistent until the
    /// pending work has run.
    pub async fn sync(&self) {
        self.keys.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("entry_count", &self.keys.entry_count())
            .finish_non_exhaustive()
    }
}
