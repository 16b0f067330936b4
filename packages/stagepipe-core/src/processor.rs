//! The stage abstraction
//!
//! A processor turns an upstream item stream into an output stream. The default
//! `process` runs every item through one extract → `process_item` → inject cycle
//! (`wrap_process_item`) and preserves upstream order. Stages that expand,
//! filter, aggregate or reorder items override `process`.

use async_trait::async_trait;

use crate::accessor::{extract, inject, StageOptions};
use crate::checkpoint::CheckpointProcessor;
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::source::{boxed, pull, ItemStream, Source};

/// A pipeline stage over items of one type `T`
///
/// Input and output share the item type so that any chain can be split at a
/// checkpoint and resumed from storage. Stages over distinct serde types
/// convert at the boundary, see [`LambdaProcessor::typed`](crate::stages::LambdaProcessor::typed).
#[async_trait]
pub trait Processor<T: Item>: Send + Sync {
    /// Name and accessors of this stage
    fn options(&self) -> &StageOptions<T>;

    fn name(&self) -> &str {
        &self.options().name
    }

    /// Transform one extracted value
    ///
    /// The base implementation is a contract violation: every concrete stage
    /// that relies on the default `process` must override it.
    async fn process_item(&self, _item: T) -> Result<T> {
        Err(PipelineError::NotImplemented {
            stage: self.name().to_string(),
        })
    }

    /// Extract via the input accessor, transform, inject via the output accessor
    ///
    /// Failures propagate to the caller.
    async fn wrap_process_item(&self, item: T) -> Result<T> {
        let options = self.options();
        match &options.output {
            None => {
                let input = match &options.input {
                    Some(accessor) => accessor.read(&item)?,
                    None => item,
                };
                self.process_item(input).await
            }
            Some(output) => {
                let input = extract(options.input.as_ref(), &item)?;
                let result = self.process_item(input).await?;
                inject(Some(output), item, result)
            }
        }
    }

    /// Normalize the pipeline input when this stage is first in a chain
    fn generate(&self, source: Source<T>) -> ItemStream<'static, T> {
        source.into_stream()
    }

    /// Lazily transform the upstream stream
    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        let this = self;
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            while let Some(item) = pull(&mut upstream, this.name()).await? {
                yield this.wrap_process_item(item).await?;
            }
        })
    }

    /// Checkpoint view of this stage, if it marks a segment boundary
    fn as_checkpoint(&self) -> Option<&dyn CheckpointProcessor<T>> {
        None
    }
}

/// Where a stage reads its input from within one run
pub enum Upstream<'a, T> {
    /// Bootstrap from pipeline input (first stage)
    Input(Source<T>),
    /// Consume another stage's output
    Stream(ItemStream<'a, T>),
}

/// Bind `stage` to `upstream` and return its output stream
///
/// Chains are built per run; no processor instance is mutated.
pub fn link<'a, T: Item>(stage: &'a dyn Processor<T>, upstream: Upstream<'a, T>) -> ItemStream<'a, T> {
    match upstream {
        Upstream::Input(source) => stage.process(stage.generate(source)),
        Upstream::Stream(stream) => stage.process(stream),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{OutputAccessor, StageBuilder};
    use futures::{StreamExt, TryStreamExt};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Bare {
        options: StageOptions<Value>,
    }

    impl Processor<Value> for Bare {
        fn options(&self) -> &StageOptions<Value> {
            &self.options
        }
    }

    struct Upper {
        options: StageOptions<Value>,
    }

    impl StageBuilder<Value> for Upper {
        fn options_mut(&mut self) -> &mut StageOptions<Value> {
            &mut self.options
        }
    }

    #[async_trait]
    impl Processor<Value> for Upper {
        fn options(&self) -> &StageOptions<Value> {
            &self.options
        }

        async fn process_item(&self, item: Value) -> Result<Value> {
            let text = item
                .as_str()
                .ok_or_else(|| PipelineError::stage_failed(self.name(), "expected text"))?;
            Ok(Value::String(text.to_uppercase()))
        }
    }

    fn upper() -> Upper {
        Upper {
            options: StageOptions::named("Upper"),
        }
    }

    #[tokio::test]
    async fn test_unimplemented_process_item() {
        let bare = Bare {
            options: StageOptions::named("Bare"),
        };
        let err = bare.wrap_process_item(json!(1)).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotImplemented { ref stage } if stage == "Bare"));
    }

    #[tokio::test]
    async fn test_identity_accessors() {
        let out = upper().wrap_process_item(json!("abc")).await.unwrap();
        assert_eq!(out, json!("ABC"));
    }

    #[tokio::test]
    async fn test_input_and_output_fields() {
        let stage = upper().input("text").output("upper");
        let out = stage
            .wrap_process_item(json!({"text": "abc"}))
            .await
            .unwrap();
        assert_eq!(out, json!({"text": "abc", "upper": "ABC"}));
    }

    #[tokio::test]
    async fn test_output_function_enriches_original() {
        let stage = upper().input("text").output(OutputAccessor::in_place(|orig: &mut Value, r| {
            orig["text"] = r;
        }));
        let out = stage
            .wrap_process_item(json!({"id": 1, "text": "abc"}))
            .await
            .unwrap();
        assert_eq!(out, json!({"id": 1, "text": "ABC"}));
    }

    #[tokio::test]
    async fn test_transform_failure_propagates() {
        let stage = upper();
        let err = stage.wrap_process_item(json!(1)).await.unwrap_err();
        assert!(matches!(err, PipelineError::StageExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_process_preserves_order() {
        let stage = upper();
        let out: Vec<Value> = link(&stage, Upstream::Input(json!(["a", "b", "c"]).into()))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(out, vec![json!("A"), json!("B"), json!("C")]);
    }

    struct Counting {
        options: StageOptions<Value>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Processor<Value> for Counting {
        fn options(&self) -> &StageOptions<Value> {
            &self.options
        }

        async fn process_item(&self, item: Value) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(item)
        }
    }

    #[tokio::test]
    async fn test_pipeline_run_is_cold() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut pipeline = crate::pipeline::Pipeline::new();
        pipeline.add_processor(Counting {
            options: StageOptions::named("Counting"),
            calls: Arc::clone(&calls),
        });

        let mut stream = pipeline.run(json!([1, 2, 3]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(stream.next().await.unwrap().unwrap(), json!(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
