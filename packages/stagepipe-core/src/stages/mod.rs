// Stage implementations
pub mod blob_stage;
pub mod concurrent_stage;
pub mod filter_stage;
pub mod flat_map_stage;
pub mod group_stage;
pub mod lambda_stage;
pub mod limit_stage;
pub mod log_stage;
pub mod nested_stage;
pub mod storage_stage;
pub mod writer_stage;

// Re-exports
pub use blob_stage::{
    BlobCodec, BlobStorageIterator, BlobStorageReader, BlobStorageWriter, JsonBlobCodec,
    SharedBlobStorage,
};
pub use concurrent_stage::ConcurrentProcessor;
pub use filter_stage::FilterProcessor;
pub use flat_map_stage::FlatMapProcessor;
pub use group_stage::GroupProcessor;
pub use lambda_stage::{AsyncLambdaProcessor, LambdaProcessor};
pub use limit_stage::Limit;
pub use log_stage::LogProcessor;
pub use nested_stage::PipelineProcessor;
pub use storage_stage::{SharedStorage, StorageIterator, StorageReader, StorageWriter};
pub use writer_stage::{JsonWriter, JsonlWriter};
