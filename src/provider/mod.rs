//! Remote object storage
//!
//! The gateway never exposes the backing store to clients; handlers go
//! through [`RemoteObjectProvider`] for listings, metadata and content.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

pub mod drive;

/// Inclusive byte range of object content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered by this range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// One object in a listing
#[derive(Debug, Clone)]
pub struct ObjectEntry {
    pub id: String,
    pub name: String,
}

/// Metadata for a single object
#[derive(Debug, Clone, Default)]
pub struct ObjectMetadata {
    pub mime_type: Option<String>,
    /// Size in bytes, when the backend reports one.
    pub size: Option<u64>,
}

/// Listing scope
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Backend container (folder) to restrict the listing to.
    pub container: Option<String>,
}

/// A lazily produced stream of object bytes
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// Errors from the storage backend
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend responded with status {0}")]
    Status(u16),
}

/// Read-only access to the remote object store
#[async_trait]
pub trait RemoteObjectProvider: Send + Sync {
    /// List audio objects, ordered by name.
    async fn list(&self, query: &ListQuery) -> Result<Vec<ObjectEntry>, ProviderError>;

    /// Fetch metadata for one object.
    async fn metadata(&self, id: &str) -> Result<ObjectMetadata, ProviderError>;

    /// Open object content, optionally restricted to a byte range.
    async fn content(
        &self,
        id: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectStream, ProviderError>;
}

/// Object ids safe to embed in backend requests: at least ten
/// characters, alphanumeric plus `-` and `_`.
pub fn is_valid_object_id(id: &str) -> bool {
    id.len() >= 10
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
