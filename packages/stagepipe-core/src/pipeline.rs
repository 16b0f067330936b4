//! Ordered chains of processors
//!
//! A pipeline links its stages per run: the first stage bootstraps from the
//! run input, every later stage consumes the previous stage's output. Runs are
//! cold and share nothing, so one pipeline can be executed any number of times.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::processor::{link, Processor, Upstream};
use crate::source::{pull, ItemStream, Source};

/// Result of [`Pipeline::run_and_return`]
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput<T> {
    /// Single input produced exactly one output
    Single(T),
    /// Collection input, or a single input that produced several outputs
    List(Vec<T>),
    /// Single input produced nothing
    Empty,
}

impl<T> RunOutput<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            RunOutput::Single(item) => vec![item],
            RunOutput::List(items) => items,
            RunOutput::Empty => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RunOutput::Single(_) => false,
            RunOutput::List(items) => items.is_empty(),
            RunOutput::Empty => true,
        }
    }
}

pub struct Pipeline<T: Item> {
    processors: Vec<Arc<dyn Processor<T>>>,
}

impl<T: Item> Pipeline<T> {
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    pub fn from_processors(processors: Vec<Arc<dyn Processor<T>>>) -> Self {
        Self { processors }
    }

    pub fn add_processor<P: Processor<T> + 'static>(&mut self, processor: P) -> &mut Self {
        self.processors.push(Arc::new(processor));
        self
    }

    /// Append a stage that is shared with other pipelines
    pub fn add_shared(&mut self, processor: Arc<dyn Processor<T>>) -> &mut Self {
        self.processors.push(processor);
        self
    }

    pub fn then<P: Processor<T> + 'static>(mut self, processor: P) -> Self {
        self.add_processor(processor);
        self
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Lazy output stream of one run over `data`
    ///
    /// Nothing executes until the stream is polled. An empty pipeline passes
    /// the source through unchanged.
    pub fn run(&self, data: impl Into<Source<T>>) -> ItemStream<'_, T> {
        self.chain(data.into())
    }

    /// Run to completion and shape the result after the input
    ///
    /// A single input yields `Single` for exactly one output and `Empty` for
    /// none. Everything else is returned as `List`.
    pub async fn run_and_return(&self, data: impl Into<Source<T>>) -> Result<RunOutput<T>> {
        let source = data.into();
        let single = source.is_single();
        let mut items = self.drain(source).await?;

        Ok(match (single, items.len()) {
            (true, 0) => RunOutput::Empty,
            (true, 1) => match items.pop() {
                Some(item) => RunOutput::Single(item),
                None => RunOutput::Empty,
            },
            _ => RunOutput::List(items),
        })
    }

    /// Run to completion and always return a list
    pub async fn run_and_collect(&self, data: impl Into<Source<T>>) -> Result<Vec<T>> {
        self.drain(data.into()).await
    }

    /// Segment `n` of this pipeline
    ///
    /// Segments end at each checkpoint stage. A segment after a checkpoint
    /// starts with the checkpoint's resume reader when it provides one.
    pub fn get_step(&self, n: usize) -> Result<Pipeline<T>> {
        let mut steps = self.steps();
        let available = steps.len();
        if n >= available {
            return Err(PipelineError::StepNotFound { step: n, available });
        }
        Ok(steps.swap_remove(n))
    }

    /// All segments in order
    pub fn steps(&self) -> Vec<Pipeline<T>> {
        let mut steps = Vec::new();
        let mut current: Vec<Arc<dyn Processor<T>>> = Vec::new();

        for processor in &self.processors {
            current.push(Arc::clone(processor));
            if let Some(checkpoint) = processor.as_checkpoint() {
                let step = std::mem::take(&mut current);
                debug!(
                    "Segment {} closed at checkpoint {} ({} stages)",
                    steps.len(),
                    processor.name(),
                    step.len()
                );
                steps.push(Pipeline::from_processors(step));
                if let Some(reader) = checkpoint.create_generator() {
                    current.push(reader);
                }
            }
        }
        if !current.is_empty() {
            steps.push(Pipeline::from_processors(current));
        }
        steps
    }

    fn chain(&self, source: Source<T>) -> ItemStream<'_, T> {
        let Some((first, rest)) = self.processors.split_first() else {
            return source.into_stream();
        };
        let head = link(first.as_ref(), Upstream::Input(source));
        rest.iter()
            .fold(head, |stream, p| link(p.as_ref(), Upstream::Stream(stream)))
    }

    async fn drain(&self, source: Source<T>) -> Result<Vec<T>> {
        let span = info_span!(
            "pipeline_run",
            run_id = %Uuid::new_v4(),
            stages = self.processors.len()
        );
        async move {
            let mut stream = self.chain(source);
            let mut items = Vec::new();
            while let Some(item) = pull(&mut stream, "pipeline").await? {
                items.push(item);
            }
            debug!("Pipeline run produced {} items", items.len());
            Ok(items)
        }
        .instrument(span)
        .await
    }
}

impl<T: Item> Default for Pipeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Item> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            processors: self.processors.clone(),
        }
    }
}

impl<T: Item> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::StageBuilder;
    use crate::checkpoint::PassthroughCheckpoint;
    use crate::stages::LambdaProcessor;
    use futures::TryStreamExt;
    use serde_json::{json, Value};

    fn add(n: i64) -> LambdaProcessor<Value> {
        LambdaProcessor::new(move |v: Value| json!(v.as_i64().unwrap_or(0) + n))
    }

    fn mul(n: i64) -> LambdaProcessor<Value> {
        LambdaProcessor::new(move |v: Value| json!(v.as_i64().unwrap_or(0) * n))
    }

    #[tokio::test]
    async fn test_chained_lambdas() {
        let pipeline = Pipeline::new().then(add(1)).then(mul(2));
        assert_eq!(
            pipeline.run_and_return(json!(5)).await.unwrap(),
            RunOutput::Single(json!(12))
        );
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes_through() {
        let pipeline = Pipeline::<Value>::new();
        let out: Vec<Value> = pipeline.run(json!([1, 2])).try_collect().await.unwrap();
        assert_eq!(out, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_collection_input_returns_list() {
        let pipeline = Pipeline::new().then(add(1));
        assert_eq!(
            pipeline.run_and_return(json!([1])).await.unwrap(),
            RunOutput::List(vec![json!(2)])
        );
    }

    #[tokio::test]
    async fn test_run_and_collect_always_lists() {
        let pipeline = Pipeline::new().then(add(1));
        assert_eq!(
            pipeline.run_and_collect(json!(1)).await.unwrap(),
            vec![json!(2)]
        );
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let pipeline = Pipeline::new().then(add(10));
        let a = pipeline.run_and_collect(json!([1, 2])).await.unwrap();
        let b = pipeline.run_and_collect(json!([3])).await.unwrap();
        assert_eq!(a, vec![json!(11), json!(12)]);
        assert_eq!(b, vec![json!(13)]);
    }

    #[tokio::test]
    async fn test_get_step_without_generator() {
        let pipeline = Pipeline::new()
            .then(add(1))
            .then(PassthroughCheckpoint::new())
            .then(add(2));

        assert_eq!(pipeline.steps().len(), 2);
        let step0 = pipeline.get_step(0).unwrap();
        let step1 = pipeline.get_step(1).unwrap();
        assert_eq!(
            step0.run_and_return(json!(1)).await.unwrap(),
            RunOutput::Single(json!(2))
        );
        assert_eq!(
            step1.run_and_return(json!(1)).await.unwrap(),
            RunOutput::Single(json!(3))
        );
    }

    #[test]
    fn test_get_step_out_of_range() {
        let pipeline = Pipeline::new().then(add(1));
        let err = pipeline.get_step(1).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StepNotFound {
                step: 1,
                available: 1
            }
        ));
    }

    #[test]
    fn test_trailing_checkpoint_leaves_no_empty_segment() {
        let pipeline = Pipeline::new()
            .then(add(1))
            .then(PassthroughCheckpoint::new());
        assert_eq!(pipeline.steps().len(), 1);
    }

    #[test]
    fn test_debug_lists_stage_names() {
        let pipeline = Pipeline::new().then(add(1).named("inc"));
        assert_eq!(format!("{:?}", pipeline), "Pipeline { stages: [\"inc\"] }");
    }
}
