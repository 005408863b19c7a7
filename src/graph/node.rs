//! Node representation in an entry's relationship graph

use super::ids::fresh_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a node within one graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a fresh, time-ordered NodeId
    pub fn new() -> Self {
        Self(fresh_id("node"))
    }

    /// Create a NodeId from an existing string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The deterministic id of the node standing for `entry_id` itself
    pub fn owner(entry_id: &str) -> Self {
        Self(format!("reflection-{}", entry_id))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The kind of thing a link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Another journal entry
    Reflection,
    /// A free-form tag
    Tag,
    /// An external source (book, article, url)
    Source,
}

impl LinkType {
    pub const ALL: [LinkType; 3] = [LinkType::Reflection, LinkType::Tag, LinkType::Source];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Reflection => "reflection",
            LinkType::Tag => "tag",
            LinkType::Source => "source",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reflection" => Ok(LinkType::Reflection),
            "tag" => Ok(LinkType::Tag),
            "source" => Ok(LinkType::Source),
            other => Err(format!("unknown link type '{}' (expected reflection, tag or source)", other)),
        }
    }
}

/// What a node denotes, keyed by its variant-specific reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Reflection {
        #[serde(rename = "reflectionId")]
        reflection_id: String,
    },
    Tag {
        #[serde(rename = "tagName")]
        tag_name: String,
    },
    Source {
        #[serde(rename = "sourceId")]
        source_id: String,
    },
}

impl NodeKind {
    pub fn new(link_type: LinkType, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        match link_type {
            LinkType::Reflection => NodeKind::Reflection { reflection_id: reference },
            LinkType::Tag => NodeKind::Tag { tag_name: reference },
            LinkType::Source => NodeKind::Source { source_id: reference },
        }
    }

    pub fn link_type(&self) -> LinkType {
        match self {
            NodeKind::Reflection { .. } => LinkType::Reflection,
            NodeKind::Tag { .. } => LinkType::Tag,
            NodeKind::Source { .. } => LinkType::Source,
        }
    }

    /// The semantic key: reflection id, tag name or source id
    pub fn reference(&self) -> &str {
        match self {
            NodeKind::Reflection { reflection_id } => reflection_id,
            NodeKind::Tag { tag_name } => tag_name,
            NodeKind::Source { source_id } => source_id,
        }
    }

    /// The entry id, if this node stands for a journal entry
    pub fn reflection_id(&self) -> Option<&str> {
        match self {
            NodeKind::Reflection { reflection_id } => Some(reflection_id),
            NodeKind::Tag { .. } | NodeKind::Source { .. } => None,
        }
    }

    /// Whether this node denotes `(link_type, reference)`.
    ///
    /// Tag names compare case-insensitively; reflection and source ids
    /// compare exactly.
    pub fn matches(&self, link_type: LinkType, reference: &str) -> bool {
        match (self, link_type) {
            (NodeKind::Reflection { reflection_id }, LinkType::Reflection) => reflection_id == reference,
            (NodeKind::Tag { tag_name }, LinkType::Tag) => tag_name.to_lowercase() == reference.to_lowercase(),
            (NodeKind::Source { source_id }, LinkType::Source) => source_id == reference,
            _ => false,
        }
    }
}

/// A node in an entry's relationship graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the graph
    pub id: NodeId,
    /// When the node was created
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Variant and semantic key
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Create a node with a fresh id
    pub fn new(kind: NodeKind) -> Self {
        Self::with_id(NodeId::new(), kind)
    }

    /// Create a node with a specific id
    pub fn with_id(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            kind,
        }
    }

    /// The owner node for `entry_id`
    pub fn owner(entry_id: &str) -> Self {
        Self::with_id(
            NodeId::owner(entry_id),
            NodeKind::Reflection {
                reflection_id: entry_id.to_string(),
            },
        )
    }

    pub fn link_type(&self) -> LinkType {
        self.kind.link_type()
    }
}
