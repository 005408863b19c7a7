//! In-memory payload store

use super::traits::{
    payload_key, Identity, PayloadStore, SaveReceipt, StorageResult, StoredPayload,
};
use crate::crypto::Ciphertext;
use crate::graph::fresh_id;
use async_trait::async_trait;
use dashmap::DashMap;

struct Slot {
    namespace: String,
    payload: StoredPayload,
}

/// Payloads held in a concurrent map keyed by storage key.
///
/// Nothing survives the process. Used in tests and as the fallback when
/// no persistent store can be opened.
#[derive(Default)]
pub struct MemoryStore {
    slots: DashMap<String, Slot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads across all identities
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn payloads(&self, identity: &Identity) -> Vec<StoredPayload> {
        let namespace = identity.namespace();
        let mut payloads: Vec<StoredPayload> = self
            .slots
            .iter()
            .filter(|slot| slot.namespace == namespace)
            .map(|slot| slot.payload.clone())
            .collect();
        payloads.sort_by(|a, b| a.entry_id.cmp(&b.entry_id));
        payloads
    }
}

#[async_trait]
impl PayloadStore for MemoryStore {
    async fn save(
        &self,
        identity: &Identity,
        ciphertext: &Ciphertext,
        entry_id: Option<&str>,
    ) -> StorageResult<SaveReceipt> {
        let entry_id = entry_id.map(str::to_string).unwrap_or_else(|| fresh_id("entry"));
        self.slots.insert(
            payload_key(identity, &entry_id),
            Slot {
                namespace: identity.namespace(),
                payload: StoredPayload {
                    entry_id: entry_id.clone(),
                    ciphertext: ciphertext.clone(),
                },
            },
        );
        Ok(SaveReceipt { id: entry_id })
    }

    async fn load(&self, identity: &Identity, entry_id: &str) -> StorageResult<Option<Ciphertext>> {
        Ok(self
            .slots
            .get(&payload_key(identity, entry_id))
            .map(|slot| slot.payload.ciphertext.clone()))
    }

    async fn list_ids(&self, identity: &Identity) -> StorageResult<Vec<String>> {
        Ok(self.payloads(identity).into_iter().map(|p| p.entry_id).collect())
    }

    async fn load_all(&self, identity: &Identity) -> StorageResult<Vec<StoredPayload>> {
        Ok(self.payloads(identity))
    }

    async fn delete(&self, identity: &Identity, entry_id: &str) -> StorageResult<bool> {
        Ok(self.slots.remove(&payload_key(identity, entry_id)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let store = MemoryStore::new();
        let alice = Identity::new("alice");
        let receipt = store.save(&alice, &Ciphertext::from("c1"), Some("e1")).await.unwrap();
        assert_eq!(receipt.id, "e1");
        assert_eq!(store.load(&alice, "e1").await.unwrap(), Some(Ciphertext::from("c1")));
        assert_eq!(store.load(&alice, "e2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_replaces_whole_payload() {
        let store = MemoryStore::new();
        let alice = Identity::new("alice");
        store.save(&alice, &Ciphertext::from("old"), Some("e1")).await.unwrap();
        store.save(&alice, &Ciphertext::from("new"), Some("e1")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&alice, "e1").await.unwrap(), Some(Ciphertext::from("new")));
    }

    #[tokio::test]
    async fn save_without_entry_id_generates_one() {
        let store = MemoryStore::new();
        let alice = Identity::new("alice");
        let receipt = store.save(&alice, &Ciphertext::from("c"), None).await.unwrap();
        assert!(receipt.id.starts_with("entry-"));
        assert!(store.load(&alice, &receipt.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn identities_are_isolated_and_case_folded() {
        let store = MemoryStore::new();
        store.save(&Identity::new("Alice"), &Ciphertext::from("a"), Some("e1")).await.unwrap();
        store.save(&Identity::new("bob"), &Ciphertext::from("b"), Some("e2")).await.unwrap();

        let alice_lower = Identity::new("alice");
        assert_eq!(store.list_ids(&alice_lower).await.unwrap(), vec!["e1"]);
        assert_eq!(store.list_ids(&Identity::new("bob")).await.unwrap(), vec!["e2"]);
        assert!(store.load(&alice_lower, "e2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_all_is_sorted_by_entry_id() {
        let store = MemoryStore::new();
        let alice = Identity::new("alice");
        for id in ["c", "a", "b"] {
            store.save(&alice, &Ciphertext::from(id), Some(id)).await.unwrap();
        }
        let all = store.load_all(&alice).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(all[0].ciphertext, Ciphertext::from("a"));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryStore::new();
        let alice = Identity::new("alice");
        store.save(&alice, &Ciphertext::from("c"), Some("e1")).await.unwrap();
        assert!(store.delete(&alice, "e1").await.unwrap());
        assert!(!store.delete(&alice, "e1").await.unwrap());
        assert!(store.is_empty());
    }
}
