//! Graph: the relationship graph of a single journal entry

use super::edge::{Edge, EdgeId};
use super::node::{LinkType, Node, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised by graph mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("an active edge {from} -> {to} already exists")]
    DuplicateEdge { from: NodeId, to: NodeId },
}

/// Result type for graph mutations
pub type GraphResult<T> = Result<T, GraphError>;

/// One entry's graph: its owner node plus every node and edge attached to it.
///
/// Nodes are unique by id, edges are unique by id, and insertion order is
/// preserved so views over the graph are stable. An edge may name a node
/// that is not in the graph; readers treat such an edge as pointing nowhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    /// An empty graph with no owner node
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh graph for `entry_id` holding only its owner node
    pub fn for_entry(entry_id: &str) -> Self {
        let mut graph = Self::new();
        graph.ensure_owner_node(entry_id);
        graph
    }

    /// Make sure the reflection node for `entry_id` exists. Idempotent.
    ///
    /// Returns the id of the owner node, which is the deterministic
    /// [`NodeId::owner`] id when the node is created here.
    pub fn ensure_owner_node(&mut self, entry_id: &str) -> NodeId {
        if let Some(existing) = self.owner_node(entry_id) {
            return existing.id.clone();
        }
        let owner = Node::owner(entry_id);
        let id = owner.id.clone();
        self.nodes.push(owner);
        id
    }

    /// The reflection node standing for `entry_id`, if present
    pub fn owner_node(&self, entry_id: &str) -> Option<&Node> {
        self.find_node(LinkType::Reflection, entry_id)
    }

    /// Look up the node denoting `(link_type, reference)`
    pub fn find_node(&self, link_type: LinkType, reference: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind.matches(link_type, reference))
    }

    /// Resolve the node denoting `(link_type, reference)`, creating it if absent.
    ///
    /// Calling this twice with the same arguments yields the same id and never
    /// adds a second node.
    pub fn find_or_create_target(&mut self, link_type: LinkType, reference: &str) -> NodeId {
        if let Some(existing) = self.find_node(link_type, reference) {
            return existing.id.clone();
        }
        let node = Node::new(NodeKind::new(link_type, reference));
        let id = node.id.clone();
        self.nodes.push(node);
        id
    }

    /// Insert a node unless one with the same id is already present
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id.clone();
        if self.node(&id).is_none() {
            self.nodes.push(node);
        }
        id
    }

    /// Append an active edge `from -> to`.
    ///
    /// Fails if an active edge between the same pair already exists. A
    /// tombstoned edge does not block re-linking.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> GraphResult<EdgeId> {
        if self.active_edges().any(|e| e.connects(from, to)) {
            return Err(GraphError::DuplicateEdge {
                from: from.clone(),
                to: to.clone(),
            });
        }
        let edge = Edge::new(from.clone(), to.clone());
        let id = edge.id.clone();
        self.edges.push(edge);
        Ok(id)
    }

    /// Tombstone an edge. No-op if it is absent or already tombstoned.
    ///
    /// Returns true if the edge changed state.
    pub fn tombstone_edge(&mut self, edge_id: &EdgeId) -> bool {
        self.edges
            .iter_mut()
            .find(|e| &e.id == edge_id)
            .map(Edge::tombstone)
            .unwrap_or(false)
    }

    /// Active outgoing edges of `node_id` with their resolved targets,
    /// grouped by the target's variant.
    ///
    /// Edges whose target is not in the graph are dropped. Within a group,
    /// edges keep their insertion order.
    pub fn outgoing_edges_by_type(&self, node_id: &NodeId) -> BTreeMap<LinkType, Vec<(&Edge, &Node)>> {
        let mut grouped: BTreeMap<LinkType, Vec<(&Edge, &Node)>> = BTreeMap::new();
        for edge in self.active_edges().filter(|e| &e.from == node_id) {
            if let Some(target) = self.node(&edge.to) {
                grouped.entry(target.link_type()).or_default().push((edge, target));
            }
        }
        grouped
    }

    /// Get a node by id
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Get an edge by id, tombstoned or not
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// Edges that have not been tombstoned
    pub fn active_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.is_active())
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges, tombstones included
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
