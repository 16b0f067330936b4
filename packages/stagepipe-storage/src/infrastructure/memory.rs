//! In-memory adapters for both storage ports
//!
//! Records are kept in insertion order so that resuming a pipeline from a
//! checkpoint replays items in the order they were written.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{Blob, BlobHeader, BlobStorage, KeyValueStorage};
use crate::{Result, StorageError};

type KeyRule<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// Key-value storage held in process memory
pub struct InMemoryStorage<R> {
    records: Arc<Mutex<Vec<(String, R)>>>,
    key_rule: Option<KeyRule<R>>,
}

impl<R> InMemoryStorage<R> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            key_rule: None,
        }
    }

    /// Storage whose `key_of` derives keys with `rule`
    pub fn with_key_rule<F>(rule: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            key_rule: Some(Arc::new(rule)),
        }
    }
}

impl<R> Default for InMemoryStorage<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for InMemoryStorage<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            key_rule: self.key_rule.clone(),
        }
    }
}

#[async_trait]
impl<R> KeyValueStorage<R> for InMemoryStorage<R>
where
    R: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Result<R> {
        let records = self.records.lock();
        records
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn put(&self, key: &str, record: R) -> Result<()> {
        let mut records = self.records.lock();
        match records.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = record,
            None => records.push((key.to_string(), record)),
        }
        Ok(())
    }

    async fn create(&self, record: R) -> Result<R> {
        let key = self.key_of(&record)?;
        let mut records = self.records.lock();
        if records.iter().any(|(k, _)| *k == key) {
            return Err(StorageError::already_exists(key));
        }
        records.push((key, record.clone()));
        Ok(record)
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let records = self.records.lock();
        Ok(records.iter().map(|(k, _)| k.clone()).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.lock().len())
    }

    fn key_of(&self, record: &R) -> Result<String> {
        match &self.key_rule {
            Some(rule) => Ok(rule(record)),
            None => Err(StorageError::config(
                "in-memory storage created without a key rule",
            )),
        }
    }
}

/// Blob storage held in process memory
#[derive(Clone, Default)]
pub struct InMemoryBlobStorage {
    blobs: Arc<Mutex<Vec<Blob>>>,
}

impl InMemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn upload(&self, blob: Blob) -> Result<Blob> {
        let mut blobs = self.blobs.lock();

        // Replace existing blob with the same name
        blobs.retain(|b| b.name != blob.name);

        blobs.push(blob.clone());
        Ok(blob)
    }

    async fn download(&self, name: &str) -> Result<Blob> {
        let blobs = self.blobs.lock();
        blobs
            .iter()
            .find(|b| b.name == name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(name))
    }

    async fn list_blobs(&self) -> Result<Vec<BlobHeader>> {
        let blobs = self.blobs.lock();
        Ok(blobs.iter().map(Blob::header).collect())
    }
}
