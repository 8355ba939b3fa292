//! Common types used across root key storage.

use bytes::Bytes;

/// Opaque identifier of a root key.
///
/// Ids are assigned once at key generation (random UUID bytes) and are
/// globally unique across the lifetime of the backing store. Records
/// bridged from the legacy schema carry the UTF-8 bytes of their old
/// string location as the id.
///
/// This type wraps raw bytes to prevent accidental misuse: passing an
/// arbitrary byte buffer where a key id is expected is a compile-time
/// error. `Display` renders lowercase hex, which is what appears in
/// error messages and logs (the id is not secret material).
///
/// # Examples
///
/// ```
/// use rootkeeper_storage::KeyId;
///
/// let id = KeyId::from(vec![0xde, 0xad, 0xbe, 0xef]);
/// assert_eq!(id.to_string(), "deadbeef");
/// assert_eq!(id.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct KeyId(Bytes);

impl KeyId {
    /// Creates a key id from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the raw id bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the id bytes interpreted as a UTF-8 string, if they are
    /// valid UTF-8.
    ///
    /// Legacy documents are keyed by a printable string location; a
    /// legacy lookup for a non-UTF-8 id is simply a miss.
    #[must_use]
    pub fn as_location(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl From<Vec<u8>> for KeyId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<&[u8]> for KeyId {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl From<&str> for KeyId {
    fn from(location: &str) -> Self {
        Self(Bytes::copy_from_slice(location.as_bytes()))
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
