use std::sync::Arc;

use crate::accessor::{extract, StageBuilder, StageOptions};
use crate::item::Item;
use crate::processor::Processor;
use crate::source::{boxed, pull, ItemStream};

type PredicateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Stage that drops items whose extracted input fails a predicate
///
/// Passing items are emitted unchanged; the output accessor is not applied.
pub struct FilterProcessor<T> {
    options: StageOptions<T>,
    predicate: PredicateFn<T>,
}

impl<T: Item> FilterProcessor<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            options: StageOptions::named("FilterProcessor"),
            predicate: Arc::new(predicate),
        }
    }
}

impl<T> StageBuilder<T> for FilterProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

impl<T: Item> Processor<T> for FilterProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            while let Some(item) = pull(&mut upstream, self.name()).await? {
                let input = extract(self.options.input.as_ref(), &item)?;
                if (self.predicate)(&input) {
                    yield item;
                }
            }
        })
    }
}
