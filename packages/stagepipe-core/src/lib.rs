/*
 * Stagepipe Core - Asynchronous Stage Pipeline Engine
 *
 * Composable processors chained into lazily evaluated pipelines.
 *
 * Architecture:
 * - Processor trait (extract -> process_item -> inject per item)
 * - Pipeline (per-run chain construction, result shaping, segmentation)
 * - Checkpoint stages backed by key-value and blob storage ports
 * - Bounded-concurrency scheduling stage
 * - Hierarchical progress tracking
 */

// Public modules
pub mod accessor;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod item;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod source;
pub mod stages;
pub mod telemetry;

// Re-exports
pub use accessor::{extract, inject, InputAccessor, OutputAccessor, StageBuilder, StageOptions};
pub use checkpoint::{CheckpointProcessor, PassthroughCheckpoint};
pub use config::EngineConfig;
pub use error::{ErrorCategory, PipelineError, Result};
pub use item::Item;
pub use pipeline::{Pipeline, RunOutput};
pub use processor::{link, Processor, Upstream};
pub use progress::ProgressTracker;
pub use source::{boxed, pull, ItemStream, Source};
pub use stages::{
    AsyncLambdaProcessor, BlobCodec, BlobStorageIterator, BlobStorageReader, BlobStorageWriter,
    ConcurrentProcessor, FilterProcessor, FlatMapProcessor, GroupProcessor, JsonBlobCodec,
    JsonWriter, JsonlWriter, LambdaProcessor, Limit, LogProcessor, PipelineProcessor,
    StorageIterator, StorageReader, StorageWriter,
};
pub use telemetry::init_tracing;
