//! Stages over key-value storage
//!
//! `StorageWriter` is a checkpoint: everything up to it forms one segment and
//! the next segment re-reads the persisted records through `StorageReader`
//! (by key) or `StorageIterator` (full scan).

use std::sync::Arc;

use async_trait::async_trait;
use stagepipe_storage::KeyValueStorage;
use tracing::debug;

use crate::accessor::{inject, InputAccessor, StageBuilder, StageOptions};
use crate::checkpoint::CheckpointProcessor;
use crate::error::Result;
use crate::item::Item;
use crate::processor::Processor;
use crate::progress::ProgressTracker;
use crate::source::{boxed, pull, ItemStream};

pub type SharedStorage<T> = Arc<dyn KeyValueStorage<T>>;

/// Persists every item with `put` and passes it on
pub struct StorageWriter<T: Item> {
    options: StageOptions<T>,
    storage: SharedStorage<T>,
    key: Option<InputAccessor<T>>,
    progress: Option<Arc<ProgressTracker>>,
    resume_by_scan: bool,
}

impl<T: Item> StorageWriter<T> {
    pub fn new(storage: SharedStorage<T>) -> Self {
        Self {
            options: StageOptions::named("StorageWriter"),
            storage,
            key: None,
            progress: None,
            resume_by_scan: false,
        }
    }

    /// Derive keys with `key` instead of the storage key rule
    pub fn key(mut self, key: impl Into<InputAccessor<T>>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Increment `tracker` once per stored item
    pub fn progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }

    /// Resume with a full scan of the storage instead of a per-key read
    pub fn resume_by_scan(mut self) -> Self {
        self.resume_by_scan = true;
        self
    }

    fn key_of(&self, item: &T) -> Result<String> {
        match &self.key {
            Some(accessor) => accessor.read(item)?.to_key(),
            None => Ok(self.storage.key_of(item)?),
        }
    }
}

impl<T: Item> StageBuilder<T> for StorageWriter<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for StorageWriter<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        let key = self.key_of(&item)?;
        self.storage.put(&key, item.clone()).await?;
        debug!("{}: stored {}", self.name(), key);
        if let Some(tracker) = &self.progress {
            tracker.increment()?;
        }
        Ok(item)
    }

    fn as_checkpoint(&self) -> Option<&dyn CheckpointProcessor<T>> {
        Some(self)
    }
}

impl<T: Item> CheckpointProcessor<T> for StorageWriter<T> {
    fn create_generator(&self) -> Option<Arc<dyn Processor<T>>> {
        let storage = Arc::clone(&self.storage);
        if self.resume_by_scan {
            Some(Arc::new(StorageIterator::new(storage)))
        } else {
            Some(Arc::new(StorageReader::new(storage)))
        }
    }
}

/// Maps a key item to the stored record
pub struct StorageReader<T: Item> {
    options: StageOptions<T>,
    storage: SharedStorage<T>,
}

impl<T: Item> StorageReader<T> {
    pub fn new(storage: SharedStorage<T>) -> Self {
        Self {
            options: StageOptions::named("StorageReader"),
            storage,
        }
    }
}

impl<T: Item> StageBuilder<T> for StorageReader<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for StorageReader<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, key: T) -> Result<T> {
        Ok(self.storage.get(&key.to_key()?).await?)
    }
}

/// Emits every stored record for each upstream item
///
/// Upstream items only trigger a scan; their value is not read.
///
/// The attached tracker gets the record count as its total and one increment
/// per emitted record.
pub struct StorageIterator<T: Item> {
    options: StageOptions<T>,
    storage: SharedStorage<T>,
    progress: Option<Arc<ProgressTracker>>,
}

impl<T: Item> StorageIterator<T> {
    pub fn new(storage: SharedStorage<T>) -> Self {
        Self {
            options: StageOptions::named("StorageIterator"),
            storage,
            progress: None,
        }
    }

    pub fn progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }
}

impl<T: Item> StageBuilder<T> for StorageIterator<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

impl<T: Item> Processor<T> for StorageIterator<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            while let Some(item) = pull(&mut upstream, self.name()).await? {
                let keys = self.storage.list_keys().await?;
                if let Some(tracker) = &self.progress {
                    if !keys.is_empty() {
                        tracker.set_total_steps(keys.len())?;
                    }
                }
                for key in keys {
                    let record = self.storage.get(&key).await?;
                    if let Some(tracker) = &self.progress {
                        tracker.increment()?;
                    }
                    yield inject(self.options.output.as_ref(), item.clone(), record)?;
                }
            }
        })
    }
}
