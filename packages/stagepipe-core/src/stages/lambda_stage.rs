use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::accessor::{StageBuilder, StageOptions};
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::processor::Processor;

type MapFn<T> = Arc<dyn Fn(T) -> Result<T> + Send + Sync>;
type AsyncMapFn<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Stage that transforms each item with a closure
pub struct LambdaProcessor<T> {
    options: StageOptions<T>,
    expression: MapFn<T>,
}

impl<T: Item> LambdaProcessor<T> {
    pub fn new<F>(expression: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::try_new(move |item| Ok(expression(item)))
    }

    /// Closure that can fail; the error aborts the run
    pub fn try_new<F>(expression: F) -> Self
    where
        F: Fn(T) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            options: StageOptions::named("LambdaProcessor"),
            expression: Arc::new(expression),
        }
    }
}

impl LambdaProcessor<Value> {
    /// Closure over serde types, converted to and from JSON values
    ///
    /// A value that does not deserialize into `A` fails with `Conversion`.
    pub fn typed<A, B, F>(expression: F) -> Self
    where
        A: DeserializeOwned + 'static,
        B: Serialize + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Self::try_new(move |value| {
            let input: A = serde_json::from_value(value).map_err(PipelineError::conversion)?;
            serde_json::to_value(expression(input)).map_err(PipelineError::conversion)
        })
    }
}

impl<T> StageBuilder<T> for LambdaProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for LambdaProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        (self.expression)(item)
    }
}

/// Stage whose transformation suspends, such as an I/O call
pub struct AsyncLambdaProcessor<T> {
    options: StageOptions<T>,
    expression: AsyncMapFn<T>,
}

impl<T: Item> AsyncLambdaProcessor<T> {
    pub fn new<F, Fut>(expression: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            options: StageOptions::named("AsyncLambdaProcessor"),
            expression: Arc::new(move |item| expression(item).boxed()),
        }
    }
}

impl<T> StageBuilder<T> for AsyncLambdaProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for AsyncLambdaProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        (self.expression)(item).await
    }
}
