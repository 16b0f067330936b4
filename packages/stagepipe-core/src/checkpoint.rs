use std::sync::Arc;

use async_trait::async_trait;

use crate::accessor::{StageBuilder, StageOptions};
use crate::error::Result;
use crate::item::Item;
use crate::processor::Processor;

/// A stage that splits a pipeline into independently resumable segments
///
/// Everything up to and including the checkpoint forms one segment. The next
/// segment starts with the reader returned by `create_generator`, which
/// re-reads what this checkpoint persisted instead of replaying the previous
/// segment's stream.
pub trait CheckpointProcessor<T: Item>: Processor<T> {
    /// Reader stage that opens the following segment, if any
    fn create_generator(&self) -> Option<Arc<dyn Processor<T>>>;
}

/// Boundary marker without persistence
///
/// The following segment starts directly with the next stage and receives the
/// segment's own input.
pub struct PassthroughCheckpoint<T> {
    options: StageOptions<T>,
}

impl<T> PassthroughCheckpoint<T> {
    pub fn new() -> Self {
        Self {
            options: StageOptions::named("PassthroughCheckpoint"),
        }
    }
}

impl<T> Default for PassthroughCheckpoint<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StageBuilder<T> for PassthroughCheckpoint<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for PassthroughCheckpoint<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        Ok(item)
    }

    fn as_checkpoint(&self) -> Option<&dyn CheckpointProcessor<T>> {
        Some(self)
    }
}

impl<T: Item> CheckpointProcessor<T> for PassthroughCheckpoint<T> {
    fn create_generator(&self) -> Option<Arc<dyn Processor<T>>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_passthrough_checkpoint() {
        let cp = PassthroughCheckpoint::<Value>::new();
        assert_eq!(cp.wrap_process_item(json!(3)).await.unwrap(), json!(3));
        assert!(cp.as_checkpoint().is_some());
        assert!(cp.create_generator().is_none());
    }
}
