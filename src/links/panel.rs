//! LinkPanel: the consumer-facing surface for one entry's links
//!
//! A panel tracks two independent state machines:
//!
//! ```text
//! graph:      Idle -> Loading -> Ready
//! backlinks:  Idle -> Scanning -> Ready      (or Idle -> Disabled)
//! ```
//!
//! Failures never leave a panel stuck. They settle in `Ready` with an empty or
//! partial result and a notice for the user.

use super::backlinks::{Backlink, BacklinkResolver};
use super::error::{LinkError, LinkResult};
use super::liveness::LivenessToken;
use super::manager::{EntryScope, LinkManager, LinkUpdate};
use crate::crypto::SessionKey;
use crate::graph::{EdgeId, Graph, LinkType, Node};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

const UNSAVED_NOTICE: &str = "Storage is unavailable. Your links are kept for this session only.";

/// Progress of the entry's own graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Idle,
    Loading,
    Ready,
}

/// Progress of backlink discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklinkState {
    Idle,
    /// Scanning is switched off; show "not yet available"
    Disabled,
    Scanning,
    Ready,
}

/// What happened to an operation's result
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The panel took the result
    Applied(T),
    /// The panel was detached before the operation finished
    Discarded,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Discarded => None,
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Outcome::Discarded)
    }
}

/// One active link as shown in the panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkView {
    pub edge_id: EdgeId,
    pub target: Node,
}

struct PanelState {
    graph: Graph,
    graph_state: GraphState,
    backlinks: Vec<Backlink>,
    backlink_state: BacklinkState,
    notice: Option<String>,
}

pub struct LinkPanel {
    manager: Arc<LinkManager>,
    resolver: Arc<BacklinkResolver>,
    scope: EntryScope,
    key: SessionKey,
    liveness: LivenessToken,
    state: Mutex<PanelState>,
}

impl LinkPanel {
    pub fn new(
        manager: Arc<LinkManager>,
        resolver: Arc<BacklinkResolver>,
        scope: EntryScope,
        key: SessionKey,
    ) -> Self {
        let graph = Graph::for_entry(&scope.entry_id);
        Self {
            manager,
            resolver,
            scope,
            key,
            liveness: LivenessToken::new(),
            state: Mutex::new(PanelState {
                graph,
                graph_state: GraphState::Idle,
                backlinks: Vec::new(),
                backlink_state: BacklinkState::Idle,
                notice: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn scope(&self) -> &EntryScope {
        &self.scope
    }

    /// A handle on this panel's liveness
    pub fn liveness(&self) -> LivenessToken {
        self.liveness.clone()
    }

    /// Stop applying results. In-flight operations finish and are discarded.
    pub fn detach(&self) {
        self.liveness.detach();
    }

    pub fn graph(&self) -> Graph {
        self.state().graph.clone()
    }

    pub fn graph_state(&self) -> GraphState {
        self.state().graph_state
    }

    pub fn backlinks(&self) -> Vec<Backlink> {
        self.state().backlinks.clone()
    }

    pub fn backlink_state(&self) -> BacklinkState {
        self.state().backlink_state
    }

    /// Take the pending user notice, if any
    pub fn take_notice(&self) -> Option<String> {
        self.state().notice.take()
    }

    /// Active links of the entry grouped by target variant
    pub fn links_by_type(&self) -> BTreeMap<LinkType, Vec<LinkView>> {
        let state = self.state();
        let Some(owner) = state.graph.owner_node(&self.scope.entry_id) else {
            return BTreeMap::new();
        };
        let grouped = state
            .graph
            .outgoing_edges_by_type(&owner.id)
            .into_iter()
            .map(|(link_type, links)| {
                let views = links
                    .into_iter()
                    .map(|(edge, target)| LinkView {
                        edge_id: edge.id.clone(),
                        target: target.clone(),
                    })
                    .collect();
                (link_type, views)
            })
            .collect();
        grouped
    }

    pub async fn load_links(&self) -> Outcome<Graph> {
        self.state().graph_state = GraphState::Loading;
        let graph = self.manager.load(&self.scope, &self.key).await;
        if !self.liveness.is_alive() {
            debug!(entry_id = %self.scope.entry_id, "panel detached, dropping loaded graph");
            return Outcome::Discarded;
        }

        let mut state = self.state();
        state.graph = graph.clone();
        state.graph_state = GraphState::Ready;
        Outcome::Applied(graph)
    }

    /// The graph to mutate: the panel's copy once loaded, otherwise the stored one.
    ///
    /// Every save replaces the whole payload, so mutating the placeholder
    /// owner-only graph would erase the stored links.
    async fn current_graph(&self) -> Graph {
        {
            let state = self.state();
            if state.graph_state == GraphState::Ready {
                return state.graph.clone();
            }
        }
        let graph = self.manager.load(&self.scope, &self.key).await;
        if self.liveness.is_alive() {
            let mut state = self.state();
            if state.graph_state != GraphState::Ready {
                state.graph = graph.clone();
                state.graph_state = GraphState::Ready;
            }
        }
        graph
    }

    pub async fn add_link(&self, link_type: LinkType, reference: &str) -> LinkResult<Outcome<Graph>> {
        let current = self.current_graph().await;
        let result = self
            .manager
            .add_link(&self.scope, &self.key, &current, link_type, reference)
            .await;
        self.settle(result).await
    }

    pub async fn remove_link(&self, edge_id: &EdgeId) -> LinkResult<Outcome<Graph>> {
        let current = self.current_graph().await;
        let result = self
            .manager
            .remove_link(&self.scope, &self.key, &current, edge_id)
            .await;
        self.settle(result).await
    }

    /// Apply a mutation result.
    ///
    /// Rejections only raise a notice. Persistence failures also throw away
    /// the optimistic graph by reloading from storage. A change kept in
    /// memory only is applied with a notice.
    async fn settle(&self, result: LinkResult<LinkUpdate>) -> LinkResult<Outcome<Graph>> {
        match result {
            Ok(update) => {
                if !self.liveness.is_alive() {
                    return Ok(Outcome::Discarded);
                }
                let mut state = self.state();
                if !update.is_persisted() {
                    state.notice = Some(UNSAVED_NOTICE.to_string());
                }
                state.graph = update.graph.clone();
                state.graph_state = GraphState::Ready;
                Ok(Outcome::Applied(update.graph))
            }
            Err(err) if err.is_rejection() => {
                if self.liveness.is_alive() {
                    self.state().notice = Some(err.user_message().to_string());
                }
                Err(err)
            }
            Err(err) => {
                warn!(entry_id = %self.scope.entry_id, error = %err, "link change not persisted, reloading");
                let reloaded = self.manager.load(&self.scope, &self.key).await;
                if self.liveness.is_alive() {
                    let mut state = self.state();
                    state.graph = reloaded;
                    state.graph_state = GraphState::Ready;
                    state.notice = Some(err.user_message().to_string());
                }
                Err(err)
            }
        }
    }

    pub async fn load_backlinks(&self) -> Outcome<Vec<Backlink>> {
        if !self.resolver.is_enabled() {
            let mut state = self.state();
            state.backlinks.clear();
            state.backlink_state = BacklinkState::Disabled;
            return Outcome::Applied(Vec::new());
        }

        self.state().backlink_state = BacklinkState::Scanning;
        let result = self
            .resolver
            .find_backlinks(&self.scope.identity, &self.scope.entry_id, &self.key)
            .await;
        if !self.liveness.is_alive() {
            debug!(entry_id = %self.scope.entry_id, "panel detached, dropping backlinks");
            return Outcome::Discarded;
        }

        let mut state = self.state();
        state.backlink_state = BacklinkState::Ready;
        match result {
            Ok(report) => {
                state.backlinks = report.backlinks.clone();
                Outcome::Applied(report.backlinks)
            }
            Err(err) => {
                warn!(entry_id = %self.scope.entry_id, error = %err, "backlink scan failed");
                state.backlinks.clear();
                state.notice = Some(err.user_message().to_string());
                Outcome::Applied(Vec::new())
            }
        }
    }

    /// Scan again from scratch, dropping the previous results first
    pub async fn rescan_backlinks(&self) -> Outcome<Vec<Backlink>> {
        self.state().backlinks.clear();
        self.load_backlinks().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::test_support::Harness;

    fn panel(h: &Harness, entry_id: &str) -> LinkPanel {
        LinkPanel::new(h.manager.clone(), h.resolver.clone(), h.scope(entry_id), h.key.clone())
    }

    #[tokio::test]
    async fn starts_idle_with_owner_graph() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        assert_eq!(p.graph_state(), GraphState::Idle);
        assert_eq!(p.backlink_state(), BacklinkState::Idle);
        assert_eq!(p.graph().node_count(), 1);
    }

    #[tokio::test]
    async fn load_links_reaches_ready() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        let graph = p.load_links().await.applied().unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(p.graph_state(), GraphState::Ready);
    }

    #[tokio::test]
    async fn add_and_remove_through_panel() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        p.load_links().await;

        p.add_link(LinkType::Tag, "focus").await.unwrap();
        p.add_link(LinkType::Reflection, "B").await.unwrap();
        let links = p.links_by_type();
        assert_eq!(links[&LinkType::Tag][0].target.kind.reference(), "focus");
        assert_eq!(links[&LinkType::Reflection].len(), 1);

        let edge_id = links[&LinkType::Tag][0].edge_id.clone();
        p.remove_link(&edge_id).await.unwrap();
        assert!(!p.links_by_type().contains_key(&LinkType::Tag));

        // a second panel on the same entry sees the persisted state
        let other = panel(&h, "A");
        other.load_links().await;
        assert_eq!(other.graph(), p.graph());
    }

    #[tokio::test]
    async fn mutation_before_load_keeps_stored_links() {
        let h = Harness::new(true);
        let first = panel(&h, "A");
        first.load_links().await;
        first.add_link(LinkType::Tag, "x").await.unwrap();
        first.add_link(LinkType::Reflection, "B").await.unwrap();

        let second = panel(&h, "A");
        assert_eq!(second.graph_state(), GraphState::Idle);
        let graph = second.add_link(LinkType::Tag, "y").await.unwrap().applied().unwrap();

        assert_eq!(graph.active_edges().count(), 3);
        assert_eq!(second.graph_state(), GraphState::Ready);
        let stored = h.stored_graph("A").await.unwrap();
        assert_eq!(stored, graph);
    }

    #[tokio::test]
    async fn remove_before_load_keeps_other_links() {
        let h = Harness::new(true);
        let first = panel(&h, "A");
        first.load_links().await;
        first.add_link(LinkType::Tag, "x").await.unwrap();
        first.add_link(LinkType::Source, "isbn:1").await.unwrap();
        let edge_id = first.links_by_type()[&LinkType::Tag][0].edge_id.clone();

        let second = panel(&h, "A");
        second.remove_link(&edge_id).await.unwrap();

        let stored = h.stored_graph("A").await.unwrap();
        assert_eq!(stored.edge_count(), 2);
        assert_eq!(stored.active_edges().count(), 1);
        assert!(!stored.edge(&edge_id).unwrap().is_active());
    }

    #[tokio::test]
    async fn unpersisted_change_applies_with_notice() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        p.load_links().await;

        h.store.make_unavailable();
        let graph = p.add_link(LinkType::Tag, "t").await.unwrap().applied().unwrap();
        assert_eq!(graph.active_edges().count(), 1);
        assert_eq!(p.graph(), graph);
        assert_eq!(p.take_notice().as_deref(), Some(UNSAVED_NOTICE));

        h.store.heal();
        assert!(h.stored_graph("A").await.is_none());
    }

    #[tokio::test]
    async fn saved_change_raises_no_notice() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        p.load_links().await;
        p.add_link(LinkType::Tag, "t").await.unwrap();
        assert_eq!(p.take_notice(), None);
    }

    #[tokio::test]
    async fn rejection_sets_notice_and_keeps_graph() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        p.load_links().await;
        let before = p.graph();

        let err = p.add_link(LinkType::Reflection, "A").await.unwrap_err();
        assert!(matches!(err, LinkError::SelfLink));
        assert_eq!(p.graph(), before);
        assert_eq!(p.take_notice().as_deref(), Some("An entry can't link to itself."));
        assert_eq!(p.take_notice(), None);
    }

    #[tokio::test]
    async fn failed_remove_rolls_back_to_stored_graph() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        p.load_links().await;
        p.add_link(LinkType::Tag, "t").await.unwrap();
        let stored = p.graph();
        let edge_id = stored.edges[0].id.clone();

        h.store.break_down();
        let err = p.remove_link(&edge_id).await.unwrap_err();
        assert!(matches!(err, LinkError::Storage(_)));
        // storage is down, so the reload falls back to a fresh graph
        assert_eq!(p.graph().edge_count(), 0);
        assert_eq!(p.graph_state(), GraphState::Ready);
        assert!(p.take_notice().is_some());

        h.store.heal();
        p.load_links().await;
        assert_eq!(p.graph(), stored);
    }

    #[tokio::test]
    async fn disabled_backlinks_show_static_state() {
        let h = Harness::new(false);
        let writer = panel(&h, "B");
        writer.add_link(LinkType::Reflection, "A").await.unwrap();

        let p = panel(&h, "A");
        let backlinks = p.load_backlinks().await.applied().unwrap();
        assert!(backlinks.is_empty());
        assert_eq!(p.backlink_state(), BacklinkState::Disabled);
        assert_eq!(p.take_notice(), None);
    }

    #[tokio::test]
    async fn backlink_scenario_add_then_remove() {
        let h = Harness::new(true);
        let b = panel(&h, "B");
        b.load_links().await;
        b.add_link(LinkType::Reflection, "A").await.unwrap();

        let a = panel(&h, "A");
        let found = a.load_backlinks().await.applied().unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_entry_id, "B");
        assert_eq!(a.backlink_state(), BacklinkState::Ready);

        let edge_id = b.links_by_type()[&LinkType::Reflection][0].edge_id.clone();
        b.remove_link(&edge_id).await.unwrap();

        let found = a.rescan_backlinks().await.applied().unwrap();
        assert!(found.is_empty());
        assert!(a.backlinks().is_empty());
    }

    #[tokio::test]
    async fn backlink_failure_settles_ready_with_notice() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        h.store.break_down();

        let found = p.load_backlinks().await.applied().unwrap();
        assert!(found.is_empty());
        assert_eq!(p.backlink_state(), BacklinkState::Ready);
        assert!(p.take_notice().is_some());
    }

    #[tokio::test]
    async fn tracks_run_concurrently() {
        let h = Harness::new(true);
        let b = panel(&h, "B");
        b.add_link(LinkType::Reflection, "A").await.unwrap();

        let a = panel(&h, "A");
        let (graph, backlinks) = tokio::join!(a.load_links(), a.load_backlinks());
        assert!(graph.applied().is_some());
        assert_eq!(backlinks.applied().unwrap().len(), 1);
        assert_eq!(a.graph_state(), GraphState::Ready);
        assert_eq!(a.backlink_state(), BacklinkState::Ready);
    }

    #[tokio::test]
    async fn detached_panel_discards_results() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        p.detach();

        assert!(p.load_links().await.is_discarded());
        assert!(p.load_backlinks().await.is_discarded());
        // graph track never reached Ready
        assert_eq!(p.graph_state(), GraphState::Loading);
    }

    #[tokio::test]
    async fn detached_panel_still_persists_mutation() {
        let h = Harness::new(true);
        let p = panel(&h, "A");
        let token = p.liveness();
        token.detach();

        let outcome = p.add_link(LinkType::Tag, "late").await.unwrap();
        assert!(outcome.is_discarded());
        assert_eq!(p.graph().edge_count(), 0);

        let stored = h.stored_graph("A").await.unwrap();
        assert_eq!(stored.active_edges().count(), 1);
    }
}
