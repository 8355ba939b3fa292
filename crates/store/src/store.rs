//! Root key minting, selection, and verification lookup.
//!
//! # Rotation
//!
//! ```text
//! mint ──► cached current slot still good? ──► return (no I/O)
//!              │ no
//!              ▼
//!          windowed query: newest record created within the last
//!          lifetime whose expiry covers [now + min_remaining,
//!          now + lifetime] ──► found? cache as current, return
//!              │ no
//!              ▼
//!          generate random record, insert, cache as current
//! ```
//!
//! Several controller processes run this independently over one shared
//! collection. If two race through the generate step, both inserts
//! succeed (random ids), both keys verify, and later windowed queries
//! converge on whichever record carries the latest creation time. That
//! best-effort convergence is deliberate; there is no leader election
//! and none should be added.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use rootkeeper_storage::{
    CollectionProvider, KeyId, KeyStoreError, KeyStoreResult, RootKey, StaticProvider, Zeroizing,
};
use thiserror::Error;

use crate::cache::KeyCache;

/// Default bound on the number of records held in the process-local cache.
pub const DEFAULT_CACHE_CAPACITY: u64 = 10;

/// Length in bytes of a generated root key secret.
pub const SECRET_LEN: usize = 24;

/// Rotation policy for root keys.
///
/// Configuration only; nothing here is persisted. The window
/// arithmetic in [`RootKeyStore::current_signing_key`] flows entirely
/// from these durations, so deployments can tighten or relax rotation
/// without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// How long a freshly minted key remains eligible to sign new
    /// tokens before a successor must be produced.
    pub key_lifetime: Duration,

    /// Minimum validity a signing key must retain at mint time; a key
    /// closer to expiry than this is passed over even though it keeps
    /// verifying existing tokens.
    pub min_remaining_validity: Duration,

    /// Bound on the process-local cache.
    pub cache_capacity: u64,
}

impl Default for Policy {
    /// 30-day key lifetime, 1-day minimum remaining validity, 10 cached
    /// records. The lifetime exceeds every token lifetime used by the
    /// surrounding system.
    fn default() -> Self {
        Self {
            key_lifetime: Duration::days(30),
            min_remaining_validity: Duration::days(1),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl Policy {
    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if a duration is not positive or the
    /// minimum remaining validity exceeds the key lifetime (such a
    /// policy could never select or mint any key).
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.key_lifetime <= Duration::zero() {
            return Err(PolicyError::NonPositiveLifetime);
        }
        if self.min_remaining_validity <= Duration::zero() {
            return Err(PolicyError::NonPositiveMinRemaining);
        }
        if self.min_remaining_validity > self.key_lifetime {
            return Err(PolicyError::MinRemainingExceedsLifetime);
        }
        Ok(())
    }
}

/// Rejected rotation policy configurations.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PolicyError {
    /// `key_lifetime` must be positive.
    #[error("key lifetime must be positive")]
    NonPositiveLifetime,

    /// `min_remaining_validity` must be positive.
    #[error("minimum remaining validity must be positive")]
    NonPositiveMinRemaining,

    /// `min_remaining_validity` must not exceed `key_lifetime`.
    #[error("minimum remaining validity exceeds key lifetime")]
    MinRemainingExceedsLifetime,
}

/// Issues, caches, and looks up macaroon root keys over a shared
/// backing collection.
///
/// One instance per process; instances in different processes share
/// only the durable collection, never cache state. Both public
/// operations are safe to call concurrently from many request-handling
/// tasks.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::Utc;
/// use rootkeeper_storage::MemoryBacking;
/// use rootkeeper_store::{Policy, RootKeyStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let backing = Arc::new(MemoryBacking::new());
///     let store = RootKeyStore::with_backing(backing.clone(), backing, Policy::default())?;
///
///     let signing_key = store.current_signing_key(Utc::now()).await?;
///     let verified = store.key_by_id(&signing_key.id).await?;
///     assert_eq!(*verified.secret, *signing_key.secret);
///     Ok(())
/// }
/// ```
pub struct RootKeyStore {
    provider: Arc<dyn CollectionProvider>,
    cache: KeyCache,
    policy: Policy,
}

impl RootKeyStore {
    /// Creates a store that acquires a collection handle from
    /// `provider` for each operation.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the policy is invalid.
    pub fn new(provider: Arc<dyn CollectionProvider>, policy: Policy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { provider, cache: KeyCache::new(policy.cache_capacity), policy })
    }

    /// Creates a store over fixed backing instances.
    ///
    /// Convenience for tests and embedded use; wraps a
    /// [`StaticProvider`].
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if the policy is invalid.
    pub fn with_backing(
        backing: Arc<dyn rootkeeper_storage::Backing>,
        legacy: Arc<dyn rootkeeper_storage::LegacyBacking>,
        policy: Policy,
    ) -> Result<Self, PolicyError> {
        Self::new(Arc::new(StaticProvider::new(backing, legacy)), policy)
    }

    /// Returns the rotation policy this store runs under.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Returns a key suitable for minting a token at `now` that must
    /// remain verifiable for at least the policy's minimum remaining
    /// validity.
    ///
    /// Selection order: the cached current slot (no I/O), then the
    /// newest suitable record already in the collection, then a freshly
    /// generated record. Generation never blocks on other processes; a
    /// concurrent mint in another process simply produces a second
    /// valid key and later selections converge on the newest.
    ///
    /// # Errors
    ///
    /// - [`KeyStoreError::Unavailable`] / [`KeyStoreError::Timeout`] if the backing cannot be
    ///   reached; minting never proceeds on a guess that no current key exists
    /// - [`KeyStoreError::Conflict`] if the insert observed a duplicate id; fatal to this attempt,
    ///   the caller decides whether to retry
    #[tracing::instrument(skip(self))]
    pub async fn current_signing_key(&self, now: DateTime<Utc>) -> KeyStoreResult<RootKey> {
        if let Some(current) = self.cache.current() {
            if current.usable_for_minting(now, self.policy.min_remaining_validity) {
                tracing::debug!(id = %current.id, "current signing key served from cache");
                return Ok(current);
            }
        }

        let handle = self.provider.collection()?;

        let found = handle
            .backing()
            .find_latest_key(
                now - self.policy.key_lifetime,
                now + self.policy.min_remaining_validity,
                now + self.policy.key_lifetime,
            )
            .await?;
        if let Some(key) = found {
            tracing::debug!(id = %key.id, expires = %key.expires, "selected existing signing key");
            self.cache.set_current(key.clone()).await;
            return Ok(key);
        }

        let fresh = generate_key(now, self.policy.key_lifetime)?;
        handle.backing().insert_key(&fresh).await?;
        tracing::info!(id = %fresh.id, expires = %fresh.expires, "minted new root key");
        self.cache.set_current(fresh.clone()).await;
        Ok(fresh)
    }

    /// Looks up a root key for verification.
    ///
    /// Consults the process-local cache, then the backing collection,
    /// then the legacy schema, in that order, and caches whatever is
    /// found. The legacy bridge is tried only when the primary schema
    /// reports absence; a genuine backing failure propagates as-is
    /// rather than being masked by a legacy lookup that would also
    /// fail.
    ///
    /// # Errors
    ///
    /// - [`KeyStoreError::NotFound`] if no schema holds the id
    /// - [`KeyStoreError::Corrupt`] if a legacy record exists but cannot be decoded
    /// - [`KeyStoreError::Unavailable`] / [`KeyStoreError::Timeout`] on backing failure
    #[tracing::instrument(skip(self))]
    pub async fn key_by_id(&self, id: &KeyId) -> KeyStoreResult<RootKey> {
        if let Some(key) = self.cache.get(id).await {
            tracing::debug!("key lookup served from cache");
            return Ok(key);
        }

        let handle = self.provider.collection()?;

        if let Some(key) = handle.backing().get_key(id).await? {
            self.cache.put(key.clone()).await;
            return Ok(key);
        }

        match handle.legacy().get_legacy_key(id).await? {
            Some(key) => {
                tracing::debug!("key resolved via legacy schema");
                self.cache.put(key.clone()).await;
                Ok(key)
            },
            None => Err(KeyStoreError::not_found(id)),
        }
    }

    /// Test support: flushes pending cache maintenance so entry counts
    /// are accurate.
    #[doc(hidden)]
    pub async fn sync_cache(&self) {
        self.cache.sync().await;
    }

    /// Test support: number of cache-resident records.
    #[doc(hidden)]
    #[must_use]
    pub fn cached_key_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for RootKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootKeyStore").field("policy", &self.policy).finish_non_exhaustive()
    }
}

/// Generates a fresh root key record: random UUID id bytes, 24
/// cryptographically random secret bytes, expiring one lifetime out.
fn generate_key(now: DateTime<Utc>, lifetime: Duration) -> KeyStoreResult<RootKey> {
    let mut secret = Zeroizing::new(vec![0u8; SECRET_LEN]);
    OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|err| KeyStoreError::unavailable_with_source("cannot generate root key", err))?;

    Ok(RootKey::builder()
        .id(uuid::Uuid::new_v4().into_bytes().to_vec())
        .secret(secret)
        .created(now)
        .expires(now + lifetime)
        .build())
}
