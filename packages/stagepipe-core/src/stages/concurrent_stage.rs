//! Bounded-concurrency scheduling
//!
//! Up to `max_concurrent` units of work are in flight at once and results are
//! yielded in completion order. Upstream is pulled while work is pending, so
//! in-flight units keep progressing while the next item is awaited.
//!
//! Units are not spawned onto the runtime. They advance only while the output
//! stream is polled, so a slow downstream consumer also pauses in-flight work.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, Either, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, error};

use crate::accessor::{StageBuilder, StageOptions};
use crate::config::EngineConfig;
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::processor::Processor;
use crate::source::{boxed, pull, ItemStream};

/// Outcome of racing upstream against pending work
enum Step<T> {
    Pulled(Result<Option<T>>),
    Finished(Option<Result<T>>),
}

pub struct ConcurrentProcessor<T: Item> {
    options: StageOptions<T>,
    inner: Arc<dyn Processor<T>>,
    max_concurrent: usize,
}

impl<T: Item> ConcurrentProcessor<T> {
    /// Run `inner` on up to `max_concurrent` items at a time
    ///
    /// # Errors
    ///
    /// `InvalidConcurrency` if `max_concurrent` is zero.
    pub fn new<P: Processor<T> + 'static>(inner: P, max_concurrent: usize) -> Result<Self> {
        Self::from_shared(Arc::new(inner), max_concurrent)
    }

    pub fn from_shared(inner: Arc<dyn Processor<T>>, max_concurrent: usize) -> Result<Self> {
        if max_concurrent == 0 {
            return Err(PipelineError::InvalidConcurrency(max_concurrent));
        }
        let name = format!("Concurrent({})", inner.name());
        Ok(Self {
            options: StageOptions::named(name),
            inner,
            max_concurrent,
        })
    }

    /// Bound taken from `config.max_concurrent`
    pub fn from_config<P: Processor<T> + 'static>(inner: P, config: &EngineConfig) -> Result<Self> {
        Self::new(inner, config.max_concurrent)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

impl<T: Item> StageBuilder<T> for ConcurrentProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for ConcurrentProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        self.inner.wrap_process_item(item).await
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            let mut pending: FuturesUnordered<BoxFuture<'a, Result<T>>> = FuturesUnordered::new();
            let mut exhausted = false;

            loop {
                let step = if !exhausted && pending.len() < self.max_concurrent {
                    if pending.is_empty() {
                        Step::Pulled(pull(&mut upstream, self.name()).await)
                    } else {
                        let pulled = pull(&mut upstream, self.name()).boxed();
                        match future::select(pulled, pending.next()).await {
                            Either::Left((pulled, _)) => Step::Pulled(pulled),
                            Either::Right((finished, _)) => Step::Finished(finished),
                        }
                    }
                } else {
                    Step::Finished(pending.next().await)
                };

                match step {
                    Step::Pulled(pulled) => match pulled? {
                        Some(item) => pending.push(self.wrap_process_item(item)),
                        None => {
                            debug!(
                                "{}: upstream exhausted, draining {} pending",
                                self.name(),
                                pending.len()
                            );
                            exhausted = true;
                        }
                    },
                    Step::Finished(Some(result)) => {
                        let item = result.map_err(|e| {
                            error!("{}: unit of work failed: {}", self.name(), e);
                            e
                        })?;
                        yield item;
                    }
                    Step::Finished(None) => break,
                }
            }
        })
    }
}
