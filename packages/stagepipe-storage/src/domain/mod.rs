//! Domain layer: storage ports consumed by the pipeline engine
//!
//! # Domain Models
//!
//! - `Blob`: named binary payload with content type and metadata
//! - `BlobHeader`: listing entry for a stored blob (no payload)
//!
//! # Port Traits
//!
//! - `KeyValueStorage`: record storage addressed by string keys
//! - `BlobStorage`: named blob storage
//!
//! # Examples
//!
//! ```rust,ignore
//! use stagepipe_storage::domain::{Blob, BlobStorage};
//!
//! async fn example(storage: impl BlobStorage) -> Result<()> {
//!     storage.upload(Blob::new("page-1", b"hello".to_vec())).await?;
//!     let blob = storage.download("page-1").await?;
//!     assert_eq!(blob.data, b"hello");
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, StorageError};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Named binary payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Blob name (unique within one storage)
    pub name: String,
    /// MIME type of `data`, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Free-form metadata stored next to the payload
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Payload bytes
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            metadata: serde_json::Value::Null,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Listing entry for this blob
    pub fn header(&self) -> BlobHeader {
        BlobHeader {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            metadata: self.metadata.clone(),
            size_bytes: self.data.len() as u64,
        }
    }

    /// True when the content type denotes text (`text/*`, JSON or XML)
    pub fn is_text(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ["text", "json", "xml"].iter().any(|t| ct.contains(t)))
            .unwrap_or(false)
    }
}

/// Blob listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobHeader {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub size_bytes: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: KeyValueStorage
// ═══════════════════════════════════════════════════════════════════════════

/// Record storage addressed by string keys
///
/// # Core Operations
///
/// - `get`: read a record (`NotFound` if absent)
/// - `put`: insert or replace a record
/// - `create`: insert a record under its storage key, failing with
///   `AlreadyExists` if it is taken
/// - `list_keys`: every stored key, in the adapter's listing order
#[async_trait]
pub trait KeyValueStorage<R>: Send + Sync
where
    R: Clone + Send + Sync + 'static,
{
    /// Get record by key
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if the key is not stored
    async fn get(&self, key: &str) -> Result<R>;

    /// Insert or replace a record
    async fn put(&self, key: &str, record: R) -> Result<()>;

    /// Insert a new record under `key_of(record)`
    ///
    /// # Errors
    ///
    /// Returns an `AlreadyExists` error if the key is already stored
    async fn create(&self, record: R) -> Result<R>;

    /// List all stored keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize> {
        Ok(self.list_keys().await?.len())
    }

    /// Storage key rule for a record
    fn key_of(&self, _record: &R) -> Result<String> {
        Err(StorageError::config(
            "storage has no key rule; provide a key accessor",
        ))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: BlobStorage
// ═══════════════════════════════════════════════════════════════════════════

/// Named blob storage
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store a blob (replaces a blob with the same name)
    async fn upload(&self, blob: Blob) -> Result<Blob>;

    /// Fetch a blob by name
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if no blob has this name
    async fn download(&self, name: &str) -> Result<Blob>;

    /// List headers of all stored blobs
    async fn list_blobs(&self) -> Result<Vec<BlobHeader>>;
}
