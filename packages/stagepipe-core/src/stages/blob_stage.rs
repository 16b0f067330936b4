use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use stagepipe_storage::{Blob, BlobStorage};
use tracing::debug;

use crate::accessor::{inject, InputAccessor, StageBuilder, StageOptions};
use crate::checkpoint::CheckpointProcessor;
use crate::error::Result;
use crate::item::Item;
use crate::processor::Processor;
use crate::progress::ProgressTracker;
use crate::source::{boxed, pull, ItemStream};

pub type SharedBlobStorage = Arc<dyn BlobStorage>;

/// Conversion between items and stored blobs
pub trait BlobCodec<T>: Send + Sync {
    fn encode(&self, name: &str, item: &T) -> Result<Blob>;

    fn decode(&self, blob: Blob) -> Result<T>;
}

/// Stores serde items as `application/json` blobs
pub struct JsonBlobCodec<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonBlobCodec<T> {
    pub const CONTENT_TYPE: &'static str = "application/json";

    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for JsonBlobCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlobCodec<T> for JsonBlobCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, name: &str, item: &T) -> Result<Blob> {
        Ok(Blob::new(name, serde_json::to_vec(item)?).with_content_type(Self::CONTENT_TYPE))
    }

    fn decode(&self, blob: Blob) -> Result<T> {
        Ok(serde_json::from_slice(&blob.data)?)
    }
}

/// Uploads every item as a blob named by `name` and passes it on
pub struct BlobStorageWriter<T: Item> {
    options: StageOptions<T>,
    storage: SharedBlobStorage,
    codec: Arc<dyn BlobCodec<T>>,
    blob_name: InputAccessor<T>,
    progress: Option<Arc<ProgressTracker>>,
    resume_by_scan: bool,
}

impl<T: Item> BlobStorageWriter<T> {
    pub fn new(
        storage: SharedBlobStorage,
        codec: Arc<dyn BlobCodec<T>>,
        blob_name: impl Into<InputAccessor<T>>,
    ) -> Self {
        Self {
            options: StageOptions::named("BlobStorageWriter"),
            storage,
            codec,
            blob_name: blob_name.into(),
            progress: None,
            resume_by_scan: false,
        }
    }

    pub fn progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }

    /// Resume with every stored blob instead of reading blobs by name
    pub fn resume_by_scan(mut self) -> Self {
        self.resume_by_scan = true;
        self
    }
}

impl<T: Item> StageBuilder<T> for BlobStorageWriter<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for BlobStorageWriter<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        let name = self.blob_name.read(&item)?.to_key()?;
        let blob = self.codec.encode(&name, &item)?;
        let stored = self.storage.upload(blob).await?;
        debug!(
            "{}: uploaded {} ({} bytes)",
            self.name(),
            stored.name,
            stored.data.len()
        );
        if let Some(tracker) = &self.progress {
            tracker.increment()?;
        }
        Ok(item)
    }

    fn as_checkpoint(&self) -> Option<&dyn CheckpointProcessor<T>> {
        Some(self)
    }
}

impl<T: Item> CheckpointProcessor<T> for BlobStorageWriter<T> {
    fn create_generator(&self) -> Option<Arc<dyn Processor<T>>> {
        let storage = Arc::clone(&self.storage);
        let codec = Arc::clone(&self.codec);
        if self.resume_by_scan {
            Some(Arc::new(BlobStorageIterator::new(storage, codec)))
        } else {
            Some(Arc::new(BlobStorageReader::new(storage, codec)))
        }
    }
}

/// Maps a blob name item to the decoded blob
pub struct BlobStorageReader<T: Item> {
    options: StageOptions<T>,
    storage: SharedBlobStorage,
    codec: Arc<dyn BlobCodec<T>>,
}

impl<T: Item> BlobStorageReader<T> {
    pub fn new(storage: SharedBlobStorage, codec: Arc<dyn BlobCodec<T>>) -> Self {
        Self {
            options: StageOptions::named("BlobStorageReader"),
            storage,
            codec,
        }
    }
}

impl<T: Item> StageBuilder<T> for BlobStorageReader<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for BlobStorageReader<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, name: T) -> Result<T> {
        let blob = self.storage.download(&name.to_key()?).await?;
        self.codec.decode(blob)
    }
}

/// Downloads and decodes every stored blob for each upstream item
pub struct BlobStorageIterator<T: Item> {
    options: StageOptions<T>,
    storage: SharedBlobStorage,
    codec: Arc<dyn BlobCodec<T>>,
    progress: Option<Arc<ProgressTracker>>,
}

impl<T: Item> BlobStorageIterator<T> {
    pub fn new(storage: SharedBlobStorage, codec: Arc<dyn BlobCodec<T>>) -> Self {
        Self {
            options: StageOptions::named("BlobStorageIterator"),
            storage,
            codec,
            progress: None,
        }
    }

    pub fn progress(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.progress = Some(tracker);
        self
    }
}

impl<T: Item> StageBuilder<T> for BlobStorageIterator<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

impl<T: Item> Processor<T> for BlobStorageIterator<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            while let Some(item) = pull(&mut upstream, self.name()).await? {
                let headers = self.storage.list_blobs().await?;
                if let Some(tracker) = &self.progress {
                    if !headers.is_empty() {
                        tracker.set_total_steps(headers.len())?;
                    }
                }
                for header in headers {
                    let blob = self.storage.download(&header.name).await?;
                    let decoded = self.codec.decode(blob)?;
                    if let Some(tracker) = &self.progress {
                        tracker.increment()?;
                    }
                    yield inject(self.options.output.as_ref(), item.clone(), decoded)?;
                }
            }
        })
    }
}
