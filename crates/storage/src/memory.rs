//! In-memory backing implementation.
//!
//! This module provides [`MemoryBacking`], an in-memory implementation of
//! both [`Backing`] and [`LegacyBacking`] suitable for testing and
//! development. It models one shared collection the way the production
//! document store does: primary-schema records and legacy-schema
//! documents live side by side and are read through the same handle.
//!
//! # Thread Safety
//!
//! Uses [`parking_lot::RwLock`] for efficient concurrent access with
//! reader-writer semantics. `MemoryBacking` is cheaply cloneable via
//! [`Arc`]; all clones share the same underlying data, which is how
//! tests simulate several controller processes over one durable store.
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - No TTL reaper: expired documents stay until the process exits
//!
//! # Example
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
//!         .id(vec![1, 2, 3])
//!         .secret(vec![0x5e; 24])
//!         .created(now)
//!         .expires(now + Duration::days(30))
//!         .build();
//!
//!     backing.insert_key(&key).await?;
//!     assert!(backing.get_key(&key.id).await?.is_some());
//!     Ok(())
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{
    backing::Backing,
    error::{KeyStoreError, KeyStoreResult},
    legacy::{LegacyBacking, LegacyDoc, decode_legacy_doc},
    record::RootKey,
    types::KeyId,
};

#[derive(Debug, Default)]
struct Inner {
    /// Primary-schema records by id.
    keys: HashMap<KeyId, RootKey>,
    /// Legacy-schema documents by string location.
    legacy: HashMap<String, LegacyDoc>,
}

/// In-memory implementation of [`Backing`] and [`LegacyBacking`].
#[derive(Debug, Default, Clone)]
pub struct MemoryBacking {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBacking {
    /// Creates a new empty in-memory backing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of primary-schema records.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.inner.read().keys.len()
    }

    /// Seeds a legacy document.
    pub fn insert_legacy_doc(&self, doc: LegacyDoc) {
        self.inner.write().legacy.insert(doc.location.clone(), doc);
    }

    /// Seeds a well-formed legacy record holding `secret`, encoding the
    /// payload the way the old writer did.
    pub fn insert_legacy_secret(&self, location: &str, secret: &[u8], expire_at: DateTime<Utc>) {
        let item = format!(r#"{{"RootKey":"{}"}}"#, STANDARD.encode(secret));
        self.insert_legacy_doc(LegacyDoc { location: location.to_string(), item, expire_at });
    }

    /// Seeds a legacy document with an arbitrary (possibly malformed)
    /// payload, for corruption tests.
    pub fn insert_raw_legacy_item(&self, location: &str, item: &str, expire_at: DateTime<Utc>) {
        self.insert_legacy_doc(LegacyDoc {
            location: location.to_string(),
            item: item.to_string(),
            expire_at,
        });
    }
}

#[async_trait]
impl Backing for MemoryBacking {
    #[tracing::instrument(skip(self))]
    async fn get_key(&self, id: &KeyId) -> KeyStoreResult<Option<RootKey>> {
        Ok(self.inner.read().keys.get(id).cloned())
    }

    #[tracing::instrument(skip(self))]
    async fn find_latest_key(
        &self,
        created_after: DateTime<Utc>,
        expires_after: DateTime<Utc>,
        expires_before: DateTime<Utc>,
    ) -> KeyStoreResult<Option<RootKey>> {
        let inner = self.inner.read();
        let latest = inner
            .keys
            .values()
            .filter_map(|key| key.created.map(|created| (created, key)))
            .filter(|(created, key)| {
                *created >= created_after
                    && key.expires >= expires_after
                    && key.expires <= expires_before
            })
            .max_by_key(|(created, _)| *created)
            .map(|(_, key)| key.clone());
        Ok(latest)
    }

    #[tracing::instrument(skip(self, key), fields(id = %key.id))]
    async fn insert_key(&self, key: &RootKey) -> KeyStoreResult<()> {
        let mut inner = self.inner.write();

        if inner.keys.contains_key(&key.id) {
            return Err(KeyStoreError::conflict(&key.id));
        }

        inner.keys.insert(key.id.clone(), key.clone());
        Ok(())
    }
}

#[async_trait]
impl LegacyBacking for MemoryBacking {
    #[tracing::instrument(skip(self))]
    async fn get_legacy_key(&self, id: &KeyId) -> KeyStoreResult<Option<RootKey>> {
        let Some(location) = id.as_location() else {
            return Ok(None);
        };

        let doc = match self.inner.read().legacy.get(location) {
            Some(doc) => doc.clone(),
            None => return Ok(None),
        };

        decode_legacy_doc(id, &doc).map(Some)
    }
}
