use crate::accessor::{StageBuilder, StageOptions};
use crate::item::Item;
use crate::processor::Processor;
use crate::source::{boxed, pull, ItemStream};

/// Stage that passes a window of items by position
///
/// Upstream is not pulled past the end of the window.
pub struct Limit<T> {
    options: StageOptions<T>,
    start: usize,
    end: usize,
}

impl<T> Limit<T> {
    /// Pass the first `n` items
    pub fn first(n: usize) -> Self {
        Self {
            options: StageOptions::named("Limit"),
            start: 0,
            end: n,
        }
    }

    /// Pass items with index in `min..=max`
    pub fn range(min: usize, max: usize) -> Self {
        Self {
            options: StageOptions::named("Limit"),
            start: min,
            end: max.saturating_add(1),
        }
    }
}

impl<T> StageBuilder<T> for Limit<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

impl<T: Item> Processor<T> for Limit<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            let mut index = 0;
            while index < self.end {
                let Some(item) = pull(&mut upstream, self.name()).await? else {
                    break;
                };
                if index >= self.start {
                    yield item;
                }
                index += 1;
            }
        })
    }
}
