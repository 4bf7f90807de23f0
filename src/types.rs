//! Core types shared by the tracker and the subscription registry.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Immutable byte sequence usable as a map key.
///
/// Equality and ordering are by content. The hash is computed once at
/// construction and replayed on every lookup, so hashing a long channel name
/// costs the same as hashing a short one.
#[derive(Clone)]
pub struct ByteKey {
    bytes: Arc<[u8]>,
    hash: u64,
}

impl ByteKey {
    /// Create a key, copying the given bytes.
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        Self::from_arc(Arc::from(bytes.as_ref()))
    }

    /// Create a key that aliases an existing shared buffer.
    pub fn from_arc(bytes: Arc<[u8]>) -> Self {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            bytes,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }

    /// The hash cached at construction.
    pub fn cached_hash(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for ByteKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.bytes[..] == other.bytes[..]
    }
}

impl Eq for ByteKey {}

impl Hash for ByteKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for ByteKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ByteKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes[..].cmp(&other.bytes[..])
    }
}

impl AsRef<[u8]> for ByteKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ByteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteKey({:?})", String::from_utf8_lossy(&self.bytes))
    }
}

impl fmt::Display for ByteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}

impl Serialize for ByteKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl From<&str> for ByteKey {
    fn from(s: &str) -> Self {
        ByteKey::new(s.as_bytes())
    }
}

impl From<String> for ByteKey {
    fn from(s: String) -> Self {
        ByteKey::from(s.into_bytes())
    }
}

impl From<&[u8]> for ByteKey {
    fn from(bytes: &[u8]) -> Self {
        ByteKey::new(bytes)
    }
}

impl<const N: usize> From<&[u8; N]> for ByteKey {
    fn from(bytes: &[u8; N]) -> Self {
        ByteKey::new(bytes)
    }
}

impl From<Vec<u8>> for ByteKey {
    fn from(bytes: Vec<u8>) -> Self {
        ByteKey::from_arc(Arc::from(bytes))
    }
}

impl From<&ByteKey> for ByteKey {
    fn from(key: &ByteKey) -> Self {
        key.clone()
    }
}

/// Collect anything convertible into keys.
pub fn keys<I>(targets: I) -> Vec<ByteKey>
where
    I: IntoIterator,
    I::Item: Into<ByteKey>,
{
    targets.into_iter().map(Into::into).collect()
}

/// Whether an unsubscribe drains everything a subscriber owns or releases an
/// explicit subset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnsubscribeScope {
    All,
    Explicit,
}

impl UnsubscribeScope {
    pub fn is_all(self) -> bool {
        matches!(self, UnsubscribeScope::All)
    }
}

/// Channel or pattern. The two categories never share state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Channel,
    Pattern,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Channel => write!(f, "channel"),
            TargetKind::Pattern => write!(f, "pattern"),
        }
    }
}

/// Identifier assigned to a logical subscription.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
