//! Directed edges with soft-delete

use super::ids::fresh_id;
use super::node::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for an edge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Create a fresh, time-ordered EdgeId
    pub fn new() -> Self {
        Self(fresh_id("edge"))
    }

    /// Create an EdgeId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EdgeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A directed link `from -> to`.
///
/// Edges are never removed from a graph. Setting `deleted_at` tombstones
/// the edge: it drops out of every active view but stays in the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier
    pub id: EdgeId,
    /// Source node
    #[serde(rename = "fromNodeId")]
    pub from: NodeId,
    /// Target node
    #[serde(rename = "toNodeId")]
    pub to: NodeId,
    /// When the edge was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// When the edge was tombstoned, if it was
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Edge {
    /// Create a new active edge
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self {
            id: EdgeId::new(),
            from,
            to,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// True unless the edge has been tombstoned
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Tombstone the edge. Returns false if it already was.
    pub fn tombstone(&mut self) -> bool {
        if self.deleted_at.is_some() {
            return false;
        }
        self.deleted_at = Some(Utc::now());
        true
    }

    /// Whether this edge runs `from -> to`
    pub fn connects(&self, from: &NodeId, to: &NodeId) -> bool {
        &self.from == from && &self.to == to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_edge_is_active() {
        let edge = Edge::new(NodeId::from("a"), NodeId::from("b"));
        assert!(edge.is_active());
        assert!(edge.connects(&NodeId::from("a"), &NodeId::from("b")));
        assert!(!edge.connects(&NodeId::from("b"), &NodeId::from("a")));
    }

    #[test]
    fn tombstone_keeps_first_timestamp() {
        let mut edge = Edge::new(NodeId::from("a"), NodeId::from("b"));
        assert!(edge.tombstone());
        let first = edge.deleted_at;

        assert!(!edge.tombstone());
        assert_eq!(edge.deleted_at, first);
        assert!(!edge.is_active());
    }
}
