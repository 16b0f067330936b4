//! Storage ports for stagepipe checkpoints and storage stages
//!
//! The pipeline engine never talks to a concrete storage technology. It depends
//! only on the two ports defined here:
//!
//! 1. **Key-value storage** (`KeyValueStorage`): `get`, `put`, `create`,
//!    `list_keys`; `create` fails with `AlreadyExists` when the key is taken.
//! 2. **Blob storage** (`BlobStorage`): `upload`, `download`, `list_blobs`.
//!
//! `infrastructure` ships in-memory adapters for both ports. Durable backends
//! live outside this workspace and implement the same traits.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagepipe_storage::{InMemoryStorage, KeyValueStorage};
//!
//! let storage = InMemoryStorage::<String>::new();
//! storage.put("a", "first".to_string()).await?;
//! assert_eq!(storage.get("a").await?, "first");
//! assert_eq!(storage.list_keys().await?, vec!["a".to_string()]);
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

pub use domain::{Blob, BlobHeader, BlobStorage, KeyValueStorage};
pub use infrastructure::{InMemoryBlobStorage, InMemoryStorage};
