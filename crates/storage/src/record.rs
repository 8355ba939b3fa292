//! The root key record stored in the backing collection.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::types::KeyId;

/// A macaroon root key record.
///
/// Root keys are symmetric secrets used to sign and later verify bearer
/// tokens. Every field is immutable once the record has been inserted:
/// the store is append-only, which is what lets a fleet of uncoordinated
/// controller processes share one collection without distributed locks.
///
/// # Lifecycle
///
/// A record is created exactly once by the minting path and persisted
/// once. It becomes unusable for minting when its remaining validity
/// drops below the policy's minimum, but remains valid for verification
/// until the backing store's external TTL reaper deletes it. Nothing in
/// this subsystem ever mutates or deletes a record.
///
/// # Secret handling
///
/// `secret` is wrapped in [`Zeroizing`] so the key material is scrubbed
/// from memory on drop, and the `Debug` impl redacts it. It must never
/// be logged or re-exposed outside this subsystem.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use rootkeeper_storage::RootKey;
///
/// let now = Utc::now();
/// let key = RootKey::builder()
///     .id(vec![1, 2, 3, 4])
///     .secret(vec![0x5e; 24])
///     .created(now)
///     .expires(now + Duration::days(30))
///     .build();
///
/// assert!(key.usable_for_minting(now, Duration::days(1)));
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct RootKey {
    /// Opaque id, assigned at creation.
    #[builder(into)]
    pub id: KeyId,

    /// The signing/verification key material.
    #[builder(into)]
    pub secret: Zeroizing<Vec<u8>>,

    /// When the key was generated.
    ///
    /// `None` means the creation time is unknown. Records materialized
    /// through the legacy bridge carry `None`, which guarantees they are
    /// never selected by the minting path's windowed query.
    pub created: Option<DateTime<Utc>>,

    /// After this instant the record must not be used to mint new
    /// tokens. It remains valid for verification until the backing
    /// store's TTL reaper removes it.
    pub expires: DateTime<Utc>,
}

impl RootKey {
    /// Returns true if this record may sign a token at `now` that must
    /// remain verifiable for at least `min_remaining`.
    ///
    /// Requires a known creation time that is not in the future; legacy
    /// records (unknown creation time) are verification-only.
    #[must_use]
    pub fn usable_for_minting(&self, now: DateTime<Utc>, min_remaining: Duration) -> bool {
        self.created.is_some_and(|created| created <= now) && self.expires - now >= min_remaining
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootKey")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .field("created", &self.created)
            .field("expires", &self.expires)
            .finish()
    }
}
