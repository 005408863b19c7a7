//! Backlink discovery by scanning every stored graph of an identity
//!
//! There is no inverted index. Each call loads every payload of the
//! identity, decrypts it and looks for active edges pointing at the
//! queried entry. Payloads that cannot be decrypted are skipped.

use super::error::{LinkError, LinkResult};
use crate::crypto::{GraphCipher, SessionKey};
use crate::graph::{Graph, NodeId};
use crate::storage::{Identity, PayloadStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Feature switch for backlink scanning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BacklinkConfig {
    pub enabled: bool,
}

/// An entry that links to the queried entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backlink {
    /// The linking entry
    pub source_entry_id: String,
    /// That entry's node within its own graph
    pub source_node_id: NodeId,
}

/// Result of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacklinkReport {
    /// Distinct linking entries, first occurrence wins
    pub backlinks: Vec<Backlink>,
    /// Payloads examined (the queried entry's own payload excluded)
    pub scanned: usize,
    /// Payloads that could not be decrypted
    pub skipped: usize,
}

impl BacklinkReport {
    pub fn source_entry_ids(&self) -> Vec<&str> {
        self.backlinks.iter().map(|b| b.source_entry_id.as_str()).collect()
    }
}

pub struct BacklinkResolver {
    store: Arc<dyn PayloadStore>,
    cipher: Arc<dyn GraphCipher>,
    config: BacklinkConfig,
}

impl BacklinkResolver {
    pub fn new(store: Arc<dyn PayloadStore>, cipher: Arc<dyn GraphCipher>, config: BacklinkConfig) -> Self {
        Self {
            store,
            cipher,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Find every other entry of `identity` holding an active link to `entry_id`.
    ///
    /// Fails only if scanning is disabled or the payload listing itself
    /// cannot be read. Nothing is cached; every call rescans.
    pub async fn find_backlinks(
        &self,
        identity: &Identity,
        entry_id: &str,
        key: &SessionKey,
    ) -> LinkResult<BacklinkReport> {
        if !self.config.enabled {
            return Err(LinkError::BacklinksDisabled);
        }

        let payloads = self.store.load_all(identity).await?;
        let mut report = BacklinkReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for payload in payloads.iter().filter(|p| p.entry_id != entry_id) {
            report.scanned += 1;
            let graph = match self.cipher.decrypt(key, &payload.ciphertext).await {
                Ok(graph) => graph,
                Err(e) => {
                    report.skipped += 1;
                    debug!(payload = %payload.entry_id, error = %e, "skipping unreadable payload");
                    continue;
                }
            };

            for backlink in inbound_links(&graph, entry_id) {
                if seen.insert(backlink.source_entry_id.clone()) {
                    report.backlinks.push(backlink);
                }
            }
        }

        if report.skipped > 0 {
            warn!(
                entry_id,
                scanned = report.scanned,
                skipped = report.skipped,
                "some payloads could not be decrypted during backlink scan"
            );
        }
        debug!(entry_id, found = report.backlinks.len(), "backlink scan finished");
        Ok(report)
    }
}

/// Reflection-to-reflection edges in `graph` that point at `entry_id`.
///
/// Edges with an unresolvable endpoint count as no match, and the queried
/// entry is never reported as its own backlink.
fn inbound_links(graph: &Graph, entry_id: &str) -> Vec<Backlink> {
    graph
        .active_edges()
        .filter_map(|edge| {
            let target = graph.node(&edge.to)?;
            if target.kind.reflection_id() != Some(entry_id) {
                return None;
            }
            let source = graph.node(&edge.from)?;
            let source_entry = source.kind.reflection_id()?;
            if source_entry == entry_id {
                return None;
            }
            Some(Backlink {
                source_entry_id: source_entry.to_string(),
                source_node_id: source.id.clone(),
            })
        })
        .collect()
}
