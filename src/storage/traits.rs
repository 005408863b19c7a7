//! Storage trait definitions

use crate::crypto::Ciphertext;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No persistent store in the current execution context
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The per-user namespace payloads are stored under.
///
/// Kept verbatim; storage keys use the lowercased [`Identity::namespace`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-folded namespace used in storage keys
    pub fn namespace(&self) -> String {
        self.0.to_lowercase()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// `relationships_{namespace}_reflection_`: every key of one identity starts with this
fn namespace_prefix(identity: &Identity) -> String {
    format!("relationships_{}_reflection_", identity.namespace())
}

/// Storage key of the payload holding `entry_id`'s graph
pub fn payload_key(identity: &Identity, entry_id: &str) -> String {
    format!("{}{}", namespace_prefix(identity), entry_id)
}

/// One stored payload as returned by [`PayloadStore::load_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPayload {
    pub entry_id: String,
    pub ciphertext: Ciphertext,
}

/// Acknowledgement of a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    /// The entry id the payload was stored under
    pub id: String,
}

impl SaveReceipt {
    /// Id reported when a save degraded to memory only
    pub const UNPERSISTED: &'static str = "unpersisted";

    pub fn unpersisted() -> Self {
        Self {
            id: Self::UNPERSISTED.to_string(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != Self::UNPERSISTED
    }
}

/// Key-value persistence of encrypted graph payloads.
///
/// Values are opaque ciphertext; implementations never look inside them.
/// Every write replaces the whole payload for its key.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Store `ciphertext` under `entry_id`, or under a fresh id if none is given
    async fn save(
        &self,
        identity: &Identity,
        ciphertext: &Ciphertext,
        entry_id: Option<&str>,
    ) -> StorageResult<SaveReceipt>;

    /// Load the payload for `entry_id`
    async fn load(&self, identity: &Identity, entry_id: &str) -> StorageResult<Option<Ciphertext>>;

    /// Entry ids with a stored payload, sorted
    async fn list_ids(&self, identity: &Identity) -> StorageResult<Vec<String>>;

    /// Every payload of `identity`, sorted by entry id
    async fn load_all(&self, identity: &Identity) -> StorageResult<Vec<StoredPayload>>;

    /// Delete the payload for `entry_id`. Returns whether one existed.
    async fn delete(&self, identity: &Identity, entry_id: &str) -> StorageResult<bool>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: PayloadStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
