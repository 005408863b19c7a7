//! Link operation errors

use crate::crypto::CryptoError;
use crate::graph::GraphError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors returned by link and backlink operations
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("reference must not be empty")]
    EmptyReference,

    #[error("an entry cannot link to itself")]
    SelfLink,

    #[error("link already exists")]
    DuplicateEdge,

    #[error("backlink scanning is disabled")]
    BacklinksDisabled,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl From<GraphError> for LinkError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::DuplicateEdge { .. } => LinkError::DuplicateEdge,
        }
    }
}

impl LinkError {
    /// Input-validation failures. These never touch state.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            LinkError::EmptyReference | LinkError::SelfLink | LinkError::DuplicateEdge
        )
    }

    /// Short message suitable for a transient notification
    pub fn user_message(&self) -> &'static str {
        match self {
            LinkError::EmptyReference => "Enter something to link to.",
            LinkError::SelfLink => "An entry can't link to itself.",
            LinkError::DuplicateEdge => "That link already exists.",
            LinkError::BacklinksDisabled => "Backlinks are not yet available.",
            LinkError::Storage(_) => "Couldn't reach storage. Your last change was not saved.",
            LinkError::Crypto(_) => "Couldn't encrypt your links. Your last change was not saved.",
        }
    }
}

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;
