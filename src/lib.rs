//! Entrylinks: encrypted relationship graphs for journal entries
//!
//! Each journal entry owns a small graph of links to tags, sources and other
//! entries. Graphs are stored only as ciphertext, one payload per entry,
//! under the user's identity. Backlinks ("which entries point here?") are
//! found by decrypting and scanning every payload of the identity; there is
//! no index to keep in sync.
//!
//! # Core Concepts
//!
//! - **Graph**: one entry's nodes and edges; edges are soft-deleted, never removed
//! - **PayloadStore**: key-value storage of opaque ciphertext
//! - **GraphCipher**: the encrypt/decrypt boundary in front of storage
//! - **LinkManager**: validated, write-through link mutations
//! - **BacklinkResolver**: brute-force scan for inbound links
//!
//! # Example
//!
//! ```
//! use entrylinks::{Graph, LinkType, NodeId};
//!
//! let mut graph = Graph::for_entry("entry-1");
//! let tag = graph.find_or_create_target(LinkType::Tag, "gratitude");
//! graph.add_edge(&NodeId::owner("entry-1"), &tag).unwrap();
//! assert_eq!(graph.active_edges().count(), 1);
//! ```

pub mod config;
pub mod crypto;
mod graph;
pub mod links;
pub mod storage;

pub use config::{Config, ConfigError};
pub use crypto::{AesGcmCipher, Ciphertext, CryptoError, GraphCipher, SessionKey};
pub use graph::{Edge, EdgeId, Graph, GraphError, GraphResult, LinkType, Node, NodeId, NodeKind};
pub use links::{
    Backlink, BacklinkConfig, BacklinkReport, BacklinkResolver, BacklinkState, EntryScope,
    GraphState, LinkError, LinkManager, LinkPanel, LinkResult, LinkUpdate, LinkView, LivenessToken,
    Outcome,
};
pub use storage::{
    Identity, MemoryStore, OpenStore, PayloadStore, SaveReceipt, SqliteStore, StorageError,
    StorageResult, StoredPayload,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
