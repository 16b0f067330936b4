//! Streaming break-on-key-change aggregation
//!
//! Items sharing a key must arrive contiguously. A key change flushes the
//! current accumulator, so only one group is held in memory at a time. A key
//! that reappears later starts a new group.

use std::sync::Arc;

use crate::accessor::{InputAccessor, StageBuilder, StageOptions};
use crate::item::Item;
use crate::processor::Processor;
use crate::source::{boxed, pull, ItemStream};

type InitFn<T> = Arc<dyn Fn(&T, &T) -> T + Send + Sync>;
type AggregateFn<T> = Arc<dyn Fn(&mut T, &T, &T) -> Option<T> + Send + Sync>;

pub struct GroupProcessor<T> {
    options: StageOptions<T>,
    group_by: InputAccessor<T>,
    init_group: InitFn<T>,
    aggregate: AggregateFn<T>,
}

impl<T: Item> GroupProcessor<T> {
    /// Group consecutive items by `group_by`
    ///
    /// `init_group(key, first_item)` opens a group. `aggregate(acc, key, item)`
    /// then folds every item of the group, the first one included. It may
    /// mutate `acc` and return `None`, or return a replacement accumulator.
    pub fn new<I, A>(group_by: impl Into<InputAccessor<T>>, init_group: I, aggregate: A) -> Self
    where
        I: Fn(&T, &T) -> T + Send + Sync + 'static,
        A: Fn(&mut T, &T, &T) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            options: StageOptions::named("GroupProcessor"),
            group_by: group_by.into(),
            init_group: Arc::new(init_group),
            aggregate: Arc::new(aggregate),
        }
    }
}

impl<T> StageBuilder<T> for GroupProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

impl<T: Item> Processor<T> for GroupProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            // (key, accumulator) of the live group
            let mut group: Option<(T, T)> = None;

            while let Some(item) = pull(&mut upstream, self.name()).await? {
                let key = self.group_by.read(&item)?;

                let key_changed = matches!(&group, Some((prev, _)) if *prev != key);
                if key_changed {
                    if let Some((_, finished)) = group.take() {
                        yield finished;
                    }
                }

                let (group_key, acc) = group.get_or_insert_with(|| {
                    let acc = (self.init_group)(&key, &item);
                    (key.clone(), acc)
                });
                if let Some(replaced) = (self.aggregate)(acc, group_key, &item) {
                    *acc = replaced;
                }
            }

            if let Some((_, finished)) = group {
                yield finished;
            }
        })
    }
}
