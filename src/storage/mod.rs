//! Storage backends for encrypted relationship payloads
//!
//! Every backend implements the `PayloadStore` trait. `SqliteStore` is the
//! persistent implementation; `MemoryStore` keeps payloads in process.

mod memory;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    payload_key, Identity, OpenStore, PayloadStore, SaveReceipt, StorageError, StorageResult,
    StoredPayload,
};
