//! LinkManager: load, link and unlink one entry's graph with write-through persistence

use super::error::{LinkError, LinkResult};
use crate::crypto::{GraphCipher, SessionKey};
use crate::graph::{EdgeId, Graph, LinkType};
use crate::storage::{Identity, PayloadStore, SaveReceipt, StorageError};
use std::sync::Arc;
use tracing::{debug, warn};

/// The (identity, entry) pair a graph is stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryScope {
    pub identity: Identity,
    pub entry_id: String,
}

impl EntryScope {
    pub fn new(identity: Identity, entry_id: impl Into<String>) -> Self {
        Self {
            identity,
            entry_id: entry_id.into(),
        }
    }
}

/// A persisted mutation: the new graph and where it was written
#[derive(Debug, Clone, PartialEq)]
pub struct LinkUpdate {
    pub graph: Graph,
    pub receipt: SaveReceipt,
}

impl LinkUpdate {
    /// False when the store was unavailable and the change lives in memory only
    pub fn is_persisted(&self) -> bool {
        self.receipt.is_persisted()
    }
}

/// Orchestrates graph mutations and persists every one of them.
///
/// Each successful mutation encrypts the whole graph once and writes it
/// once, replacing the stored payload. The caller's graph is never
/// modified; mutations return a new graph with its save receipt.
pub struct LinkManager {
    store: Arc<dyn PayloadStore>,
    cipher: Arc<dyn GraphCipher>,
}

impl LinkManager {
    pub fn new(store: Arc<dyn PayloadStore>, cipher: Arc<dyn GraphCipher>) -> Self {
        Self { store, cipher }
    }

    /// Load an entry's graph.
    ///
    /// Never fails: a missing payload, an unreadable payload or a storage
    /// failure all yield a fresh graph holding only the owner node.
    pub async fn load(&self, scope: &EntryScope, key: &SessionKey) -> Graph {
        let entry_id = scope.entry_id.as_str();
        match self.store.load(&scope.identity, entry_id).await {
            Ok(Some(ciphertext)) => match self.cipher.decrypt(key, &ciphertext).await {
                Ok(graph) => graph,
                Err(e) => {
                    warn!(entry_id, error = %e, "could not decrypt relationship graph, starting fresh");
                    Graph::for_entry(entry_id)
                }
            },
            Ok(None) => {
                debug!(entry_id, "no stored relationship graph");
                Graph::for_entry(entry_id)
            }
            Err(e) => {
                warn!(entry_id, error = %e, "could not read relationship graph, starting fresh");
                Graph::for_entry(entry_id)
            }
        }
    }

    /// Link the entry to `(link_type, reference)` and persist.
    ///
    /// Rejects empty references, a reflection link to the entry itself and
    /// links that already exist. Rejections leave storage untouched.
    pub async fn add_link(
        &self,
        scope: &EntryScope,
        key: &SessionKey,
        graph: &Graph,
        link_type: LinkType,
        reference: &str,
    ) -> LinkResult<LinkUpdate> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LinkError::EmptyReference);
        }
        if link_type == LinkType::Reflection && reference == scope.entry_id {
            return Err(LinkError::SelfLink);
        }

        let mut next = graph.clone();
        let owner = next.ensure_owner_node(&scope.entry_id);
        let target = next.find_or_create_target(link_type, reference);
        next.add_edge(&owner, &target)?;

        let receipt = self.persist(scope, key, &next).await?;
        debug!(entry_id = %scope.entry_id, %link_type, receipt = %receipt.id, "link added");
        Ok(LinkUpdate { graph: next, receipt })
    }

    /// Tombstone an edge and persist.
    ///
    /// On error the caller should drop its optimistic copy and reload.
    pub async fn remove_link(
        &self,
        scope: &EntryScope,
        key: &SessionKey,
        graph: &Graph,
        edge_id: &EdgeId,
    ) -> LinkResult<LinkUpdate> {
        let mut next = graph.clone();
        if !next.tombstone_edge(edge_id) {
            debug!(entry_id = %scope.entry_id, %edge_id, "edge absent or already removed");
        }

        let receipt = self.persist(scope, key, &next).await?;
        debug!(entry_id = %scope.entry_id, %edge_id, receipt = %receipt.id, "link removed");
        Ok(LinkUpdate { graph: next, receipt })
    }

    /// Encrypt the whole graph and write it under the entry id.
    ///
    /// A store reporting `Unavailable` degrades to memory-only: the
    /// mutation stands and the receipt carries the placeholder id.
    async fn persist(
        &self,
        scope: &EntryScope,
        key: &SessionKey,
        graph: &Graph,
    ) -> LinkResult<SaveReceipt> {
        let ciphertext = self.cipher.encrypt(key, graph).await?;
        match self
            .store
            .save(&scope.identity, &ciphertext, Some(&scope.entry_id))
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(StorageError::Unavailable(reason)) => {
                warn!(entry_id = %scope.entry_id, %reason, "storage unavailable, keeping links in memory only");
                Ok(SaveReceipt::unpersisted())
            }
            Err(e) => Err(e.into()),
        }
    }
}
