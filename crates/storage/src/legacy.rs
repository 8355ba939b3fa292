//! Read-only bridge to the pre-migration root key schema.
//!
//! Deployments that upgraded from the old key format must keep verifying
//! tokens signed under it. The old schema indexed records by a printable
//! string location rather than raw id bytes, stored the secret inside a
//! JSON-encoded payload field, and carried no creation timestamp.
//!
//! The bridge is a pure adapter: the verification path consults it only
//! after the primary schema reports absence, and the records it produces
//! carry an unknown creation time so the minting path can never select
//! them. No new records are ever written in the legacy format.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::{KeyStoreError, KeyStoreResult},
    record::RootKey,
    types::KeyId,
};

/// Read-only lookup against the legacy document schema.
#[async_trait]
pub trait LegacyBacking: Send + Sync {
    /// Retrieves a root key recorded under the old schema.
    ///
    /// The id bytes are interpreted as the legacy string location;
    /// non-UTF-8 ids are simply a miss.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(key))` with `created` unset and `expires` copied from the legacy expiry field
    /// - `Ok(None)` if no legacy document has this location
    /// - `Err(KeyStoreError::Corrupt)` if a document exists but its payload cannot be decoded
    async fn get_legacy_key(&self, id: &KeyId) -> KeyStoreResult<Option<RootKey>>;
}

/// A document in the legacy on-disk shape.
///
/// Field names match the stored documents: the location doubles as the
/// primary key, `item` holds a JSON-encoded [`LegacyPayload`], and
/// `expire-at` is the explicit expiry consumed by the TTL reaper.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDoc {
    /// Printable string location (the old primary key).
    #[serde(rename = "_id")]
    pub location: String,

    /// JSON text containing the root key payload.
    pub item: String,

    /// When the record expires.
    ///
    /// Old writers omitted the field for records carrying the zero
    /// time, so it defaults to the Unix epoch on deserialize; such a
    /// record decodes to an already-expired, verification-only key.
    #[serde(rename = "expire-at", default = "zero_time")]
    pub expire_at: DateTime<Utc>,
}

fn zero_time() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

// `item` holds the base64-encoded secret; keep it out of debug output.
impl std::fmt::Debug for LegacyDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyDoc")
            .field("location", &self.location)
            .field("item", &"<redacted>")
            .field("expire_at", &self.expire_at)
            .finish()
    }
}

/// The payload encoded inside [`LegacyDoc::item`].
///
/// The secret bytes are standard-base64 in the JSON text, the encoding
/// the old writer used.
#[derive(Debug, Serialize, Deserialize)]
pub struct LegacyPayload {
    /// The root key secret.
    #[serde(rename = "RootKey", deserialize_with = "base64_bytes", serialize_with = "bytes_base64")]
    pub root_key: Vec<u8>,
}

fn base64_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

fn bytes_base64<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

/// Decodes a legacy document into a [`RootKey`].
///
/// The creation time is deliberately left unknown: legacy keys must
/// keep verifying old tokens but must never be picked up by the minting
/// path's windowed query.
///
/// # Errors
///
/// Returns [`KeyStoreError::Corrupt`] if the payload is not valid JSON
/// or the secret field is missing. This is distinct from absence, so
/// callers can tell "no such key" from "stored key is unreadable".
pub fn decode_legacy_doc(id: &KeyId, doc: &LegacyDoc) -> KeyStoreResult<RootKey> {
    let payload: LegacyPayload = serde_json::from_str(&doc.item).map_err(|err| {
        KeyStoreError::corrupt_with_source(
            format!("cannot decode legacy payload for location {:?}", doc.location),
            err,
        )
    })?;

    Ok(RootKey::builder()
        .id(id.clone())
        .secret(payload.root_key)
        .expires(doc.expire_at)
        .build())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use super::*;

    fn make_doc(item: &str) -> LegacyDoc {
        LegacyDoc {
            location: "old-key-1".to_string(),
            item: item.to_string(),
            expire_at: Utc::now() + Duration::days(7),
        }
    }

    #[test]
    fn test_decode_valid_payload() {
        let secret = vec![0x11u8; 24];
        let item = format!(r#"{{"RootKey":"{}"}}"#, STANDARD.encode(&secret));
        let doc = make_doc(&item);
        let id = KeyId::from("old-key-1");

        let key = decode_legacy_doc(&id, &doc).expect("decode");

        assert_eq!(key.id, id);
        assert_eq!(*key.secret, secret);
        assert!(key.created.is_none());
        assert_eq!(key.expires, doc.expire_at);
    }

    #[rstest]
    #[case::invalid_json("not json at all")]
    #[case::missing_secret(r#"{"Other":"value"}"#)]
    #[case::bad_base64(r#"{"RootKey":"!!not-base64!!"}"#)]
    fn test_decode_corrupt_payload(#[case] item: &str) {
        let doc = make_doc(item);
        let result = decode_legacy_doc(&KeyId::from("old-key-1"), &doc);

        assert!(matches!(result, Err(KeyStoreError::Corrupt { .. })));
    }

    #[test]
    fn test_decoded_key_is_never_mintable() {
        let secret = vec![0x22u8; 24];
        let item = format!(r#"{{"RootKey":"{}"}}"#, STANDARD.encode(&secret));
        let doc = make_doc(&item);

        let key = decode_legacy_doc(&KeyId::from("old-key-1"), &doc).expect("decode");

        // Far from expiry, yet unusable for minting: creation time unknown.
        assert!(!key.usable_for_minting(Utc::now(), Duration::days(1)));
    }

    #[test]
    fn test_doc_without_expiry_decodes_to_expired_key() {
        // Old writers dropped "expire-at" for zero-time records.
        let secret = vec![0x33u8; 24];
        let item = format!(r#"{{"RootKey":"{}"}}"#, STANDARD.encode(&secret));
        let json = serde_json::json!({"_id": "old-key-1", "item": item}).to_string();

        let doc: LegacyDoc = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(doc.expire_at, DateTime::UNIX_EPOCH);

        let key = decode_legacy_doc(&KeyId::from("old-key-1"), &doc).expect("decode");
        assert_eq!(*key.secret, secret);
        assert_eq!(key.expires, DateTime::UNIX_EPOCH);
        assert!(!key.usable_for_minting(Utc::now(), Duration::days(1)));
    }

    #[test]
    fn test_debug_redacts_item() {
        let secret = vec![0x44u8; 24];
        let encoded = STANDARD.encode(&secret);
        let doc = make_doc(&format!(r#"{{"RootKey":"{encoded}"}}"#));

        let debug = format!("{doc:?}");

        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&encoded));
    }

    #[test]
    fn test_payload_roundtrip() {
        let payload = LegacyPayload { root_key: vec![1, 2, 3, 4] };
        let json = serde_json::to_string(&payload).expect("serialize");
        assert!(json.contains("RootKey"));

        let back: LegacyPayload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.root_key, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_doc_field_names() {
        let doc = make_doc("{}");
        let json = serde_json::to_string(&doc).expect("serialize");

        assert!(json.contains("\"_id\":"));
        assert!(json.contains("\"item\":"));
        assert!(json.contains("\"expire-at\":"));
    }
}
