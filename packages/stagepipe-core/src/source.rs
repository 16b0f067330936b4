//! Pipeline inputs and the lazy item stream passed between stages

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::item::Item;

/// Lazy, cold sequence of items produced by a stage
pub type ItemStream<'a, T> = BoxStream<'a, Result<T>>;

/// Box any item stream
pub fn boxed<'a, T, S>(stream: S) -> ItemStream<'a, T>
where
    S: Stream<Item = Result<T>> + Send + 'a,
{
    Box::pin(stream)
}

/// Input accepted by the first stage of a pipeline
pub enum Source<T> {
    /// A single item
    Item(T),
    /// A finite in-memory collection
    Items(Vec<T>),
    /// A synchronous lazy sequence
    Iter(Box<dyn Iterator<Item = T> + Send>),
    /// An asynchronous lazy sequence
    Stream(ItemStream<'static, T>),
}

impl<T: Item> Source<T> {
    pub fn item(item: T) -> Self {
        Source::Item(item)
    }

    pub fn items(items: Vec<T>) -> Self {
        Source::Items(items)
    }

    pub fn iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Source::Iter(Box::new(iter.into_iter()))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Source::Stream(Box::pin(stream))
    }

    /// Collection items become `Items`, anything else a single `Item`
    pub fn infer(item: T) -> Self {
        match item.into_elements() {
            Ok(items) => Source::Items(items),
            Err(item) => Source::Item(item),
        }
    }

    /// True for a single non-collection item
    pub fn is_single(&self) -> bool {
        matches!(self, Source::Item(_))
    }

    /// Normalize into a one-shot item stream
    ///
    /// Errors yielded by a raw async source are re-tagged as upstream faults.
    pub fn into_stream(self) -> ItemStream<'static, T> {
        match self {
            Source::Item(item) => boxed(stream::once(async move { Ok(item) })),
            Source::Items(items) => boxed(stream::iter(items.into_iter().map(Ok))),
            Source::Iter(iter) => boxed(stream::iter(iter.map(Ok))),
            Source::Stream(s) => boxed(s.map(|r| {
                r.map_err(|e| match e {
                    e @ PipelineError::Upstream(_) => e,
                    other => PipelineError::upstream(other),
                })
            })),
        }
    }
}

impl<T: Item> From<T> for Source<T> {
    fn from(item: T) -> Self {
        Source::infer(item)
    }
}

impl<T: Item> From<Vec<T>> for Source<T> {
    fn from(items: Vec<T>) -> Self {
        Source::Items(items)
    }
}

/// Pull the next upstream item on behalf of `stage`
///
/// An upstream fault is logged and reported as end-of-stream; any other error
/// is returned to the caller.
pub async fn pull<T>(upstream: &mut ItemStream<'_, T>, stage: &str) -> Result<Option<T>> {
    match upstream.next().await {
        None => Ok(None),
        Some(Ok(item)) => Ok(Some(item)),
        Some(Err(e)) if e.is_upstream_fault() => {
            warn!("{}: upstream fault, treating as end of stream: {}", stage, e);
            Ok(None)
        }
        Some(Err(e)) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_single_item() {
        let src = Source::item(json!(5));
        assert!(src.is_single());
        let items: Vec<Value> = src.into_stream().try_collect().await.unwrap();
        assert_eq!(items, vec![json!(5)]);
    }

    #[tokio::test]
    async fn test_infer_collection() {
        let src: Source<Value> = json!([1, 2, 3]).into();
        assert!(!src.is_single());
        let items: Vec<Value> = src.into_stream().try_collect().await.unwrap();
        assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn test_sync_iterator() {
        let src = Source::iter((0..3).map(Value::from));
        let items: Vec<Value> = src.into_stream().try_collect().await.unwrap();
        assert_eq!(items, vec![json!(0), json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_async_stream_errors_become_upstream_faults() {
        let src = Source::<Value>::stream(stream::iter(vec![
            Ok(json!(1)),
            Err(PipelineError::Config("broken".to_string())),
        ]));
        let mut s = src.into_stream();
        assert_eq!(s.next().await.unwrap().unwrap(), json!(1));
        assert!(s.next().await.unwrap().unwrap_err().is_upstream_fault());
    }

    #[tokio::test]
    async fn test_pull_ends_on_upstream_fault() {
        let mut s: ItemStream<'_, Value> = boxed(stream::iter(vec![
            Ok(json!(1)),
            Err(PipelineError::upstream("gone")),
            Ok(json!(2)),
        ]));
        assert_eq!(pull(&mut s, "test").await.unwrap(), Some(json!(1)));
        assert_eq!(pull(&mut s, "test").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pull_propagates_other_errors() {
        let mut s: ItemStream<'_, Value> =
            boxed(stream::iter(vec![Err(PipelineError::stage_failed("x", "boom"))]));
        assert!(pull(&mut s, "test").await.is_err());
    }
}
