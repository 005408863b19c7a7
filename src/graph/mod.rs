//! Core graph data structures

mod edge;
mod ids;
mod node;
mod relationship_graph;


pub(crate) use ids::fresh_id;

pub use edge::{Edge, EdgeId};
pub use node::{LinkType, Node, NodeId, NodeKind};
pub use relationship_graph::{Graph, GraphError, GraphResult};
