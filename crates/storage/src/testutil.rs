//! Shared test utilities for root key storage testing.
//!
//! This module provides common helpers for creating test records,
//! seeding backings, and asserting on [`KeyStoreResult`](crate::KeyStoreResult)
//! values. It is feature-gated behind `testutil` to prevent leaking into
//! production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! rootkeeper-storage = { path = "../storage", features = ["testutil"] }
//! ```

use chrono::{DateTime, Duration, Utc};

use crate::{Backing, MemoryBacking, RootKey};

/// Creates a test root key with a deterministic id and secret derived
/// from `tag`, created at `now` and expiring 30 days later.
#[must_use]
pub fn make_root_key(tag: u8, now: DateTime<Utc>) -> RootKey {
    RootKey::builder()
        .id(vec![tag; 4])
        .secret(vec![tag; 24])
        .created(now)
        .expires(now + Duration::days(30))
        .build()
}

/// Creates a [`MemoryBacking`] pre-populated with `count` keys created
/// at one-minute intervals ending at `now`.
///
/// Key `i` has id and secret bytes `[i; ..]`, so tests can identify
/// which record a lookup returned.
///
/// # Panics
///
/// Panics if any insert fails (should not happen with `MemoryBacking`).
pub async fn seeded_backing(count: u8, now: DateTime<Utc>) -> MemoryBacking {
    let backing = MemoryBacking::new();
    for i in 0..count {
        let created = now - Duration::minutes(i64::from(count - i));
        let key = RootKey::builder()
            .id(vec![i; 4])
            .secret(vec![i; 24])
            .created(created)
            .expires(created + Duration::days(30))
            .build();
        backing.insert_key(&key).await.expect("seed insert failed");
    }
    backing
}

/// Asserts that a result is an `Err` of the given [`KeyStoreError`]
/// variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use rootkeeper_storage::{KeyId, KeyStoreError, KeyStoreResult, assert_keystore_error};
///
/// let result: KeyStoreResult<()> = Err(KeyStoreError::timeout());
/// assert_keystore_error!(result, Timeout);
/// ```
///
/// [`KeyStoreError`]: crate::KeyStoreError
#[macro_export]
macro_rules! assert_keystore_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::KeyStoreError::$variant { .. })),
            concat!("expected KeyStoreError::", stringify!($variant), ", got: {:?}"),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::KeyStoreError::$variant { .. })),
            concat!("{}: expected KeyStoreError::", stringify!($variant), ", got: {:?}"),
            $msg,
            $result,
        );
    };
}
