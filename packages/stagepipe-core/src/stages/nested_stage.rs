use std::sync::Arc;

use tracing::debug;

use crate::accessor::{extract, inject, StageBuilder, StageOptions};
use crate::error::Result;
use crate::item::Item;
use crate::pipeline::{Pipeline, RunOutput};
use crate::processor::Processor;
use crate::source::{boxed, pull, ItemStream};

type PipelineFactory<T> = Arc<dyn Fn(&T) -> Pipeline<T> + Send + Sync>;

enum Nested<T: Item> {
    Fixed(Pipeline<T>),
    PerItem(PipelineFactory<T>),
}

/// Stage that runs a whole pipeline on each extracted input
///
/// A collection input runs as a batch and its outputs are packed back into
/// one item with [`Item::from_elements`]. A single input that produces
/// nothing drops the upstream item.
pub struct PipelineProcessor<T: Item> {
    options: StageOptions<T>,
    pipeline: Nested<T>,
}

impl<T: Item> PipelineProcessor<T> {
    pub fn new(pipeline: Pipeline<T>) -> Self {
        Self {
            options: StageOptions::named("PipelineProcessor"),
            pipeline: Nested::Fixed(pipeline),
        }
    }

    pub fn from_processors(processors: Vec<Arc<dyn Processor<T>>>) -> Self {
        Self::new(Pipeline::from_processors(processors))
    }

    /// Build the inner pipeline from each extracted input
    pub fn from_factory<F>(factory: F) -> Self
    where
        F: Fn(&T) -> Pipeline<T> + Send + Sync + 'static,
    {
        Self {
            options: StageOptions::named("PipelineProcessor"),
            pipeline: Nested::PerItem(Arc::new(factory)),
        }
    }

    async fn run_nested(&self, input: T) -> Result<RunOutput<T>> {
        match &self.pipeline {
            Nested::Fixed(pipeline) => pipeline.run_and_return(input).await,
            Nested::PerItem(factory) => {
                let pipeline = factory(&input);
                pipeline.run_and_return(input).await
            }
        }
    }
}

impl<T: Item> StageBuilder<T> for PipelineProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

impl<T: Item> Processor<T> for PipelineProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            while let Some(item) = pull(&mut upstream, self.name()).await? {
                let input = extract(self.options.input.as_ref(), &item)?;
                let result = match self.run_nested(input).await? {
                    RunOutput::Single(result) => result,
                    RunOutput::List(results) => T::from_elements(results),
                    RunOutput::Empty => {
                        debug!(
                            "{}: nested pipeline produced no result, dropping item",
                            self.name()
                        );
                        continue;
                    }
                };
                yield inject(self.options.output.as_ref(), item, result)?;
            }
        })
    }
}
