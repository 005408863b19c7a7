//! Shared fixtures for link tests

use crate::crypto::{AesGcmCipher, Ciphertext, GraphCipher, SessionKey};
use crate::links::{BacklinkConfig, BacklinkResolver, EntryScope, LinkManager};
use crate::storage::{
    Identity, MemoryStore, PayloadStore, SaveReceipt, StorageError, StorageResult, StoredPayload,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const HEALTHY: u8 = 0;
const UNAVAILABLE: u8 = 1;
const BROKEN: u8 = 2;

/// A MemoryStore that can be told to fail
#[derive(Default)]
pub(crate) struct FlakyStore {
    inner: MemoryStore,
    mode: AtomicU8,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heal(&self) {
        self.mode.store(HEALTHY, Ordering::SeqCst);
    }

    /// Saves fail with `StorageError::Unavailable`
    pub fn make_unavailable(&self) {
        self.mode.store(UNAVAILABLE, Ordering::SeqCst);
    }

    /// Every operation fails with an IO error
    pub fn break_down(&self) {
        self.mode.store(BROKEN, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        match self.mode.load(Ordering::SeqCst) {
            UNAVAILABLE => Err(StorageError::Unavailable("no persistent store".into())),
            BROKEN => Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk on fire",
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl PayloadStore for FlakyStore {
    async fn save(
        &self,
        identity: &Identity,
        ciphertext: &Ciphertext,
        entry_id: Option<&str>,
    ) -> StorageResult<SaveReceipt> {
        self.check()?;
        self.inner.save(identity, ciphertext, entry_id).await
    }

    async fn load(&self, identity: &Identity, entry_id: &str) -> StorageResult<Option<Ciphertext>> {
        if self.mode.load(Ordering::SeqCst) == BROKEN {
            self.check()?;
        }
        self.inner.load(identity, entry_id).await
    }

    async fn list_ids(&self, identity: &Identity) -> StorageResult<Vec<String>> {
        self.inner.list_ids(identity).await
    }

    async fn load_all(&self, identity: &Identity) -> StorageResult<Vec<StoredPayload>> {
        if self.mode.load(Ordering::SeqCst) == BROKEN {
            self.check()?;
        }
        self.inner.load_all(identity).await
    }

    async fn delete(&self, identity: &Identity, entry_id: &str) -> StorageResult<bool> {
        self.inner.delete(identity, entry_id).await
    }
}

/// Store, cipher, manager and resolver wired together for one identity
pub(crate) struct Harness {
    pub store: Arc<FlakyStore>,
    pub cipher: Arc<AesGcmCipher>,
    pub manager: Arc<LinkManager>,
    pub resolver: Arc<BacklinkResolver>,
    pub identity: Identity,
    pub key: SessionKey,
}

impl Harness {
    pub fn new(backlinks_enabled: bool) -> Self {
        let store = Arc::new(FlakyStore::new());
        let cipher = Arc::new(AesGcmCipher::new());
        let manager = Arc::new(LinkManager::new(store.clone(), cipher.clone()));
        let resolver = Arc::new(BacklinkResolver::new(
            store.clone(),
            cipher.clone(),
            BacklinkConfig {
                enabled: backlinks_enabled,
            },
        ));
        Self {
            store,
            cipher,
            manager,
            resolver,
            identity: Identity::new("0xAlice"),
            key: SessionKey::from_bytes([42u8; 32]),
        }
    }

    pub fn scope(&self, entry_id: &str) -> EntryScope {
        EntryScope::new(self.identity.clone(), entry_id)
    }

    /// Decrypt whatever is stored for `entry_id`
    pub async fn stored_graph(&self, entry_id: &str) -> Option<crate::graph::Graph> {
        let ciphertext = self.store.load(&self.identity, entry_id).await.ok()??;
        self.cipher.decrypt(&self.key, &ciphertext).await.ok()
    }
}
