//! Infrastructure layer - Storage adapters
//!
//! Only in-memory adapters live here; they back checkpoint tests and local
//! runs where durability is not required.

pub mod memory;

pub use memory::{InMemoryBlobStorage, InMemoryStorage};
