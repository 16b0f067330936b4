//! One-to-many expansion
//!
//! Each upstream item is expanded into zero or more elements. Every element is
//! injected through the output accessor against the item it came from, so an
//! output function still sees which upstream item produced it.

use std::sync::Arc;

use crate::accessor::{extract, inject, StageBuilder, StageOptions};
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::processor::Processor;
use crate::source::{boxed, pull, ItemStream};

type ExpandFn<T> = Arc<dyn Fn(T) -> Result<Vec<T>> + Send + Sync>;

pub struct FlatMapProcessor<T> {
    options: StageOptions<T>,
    expand: Option<ExpandFn<T>>,
}

impl<T: Item> FlatMapProcessor<T> {
    /// Expand the extracted input with `expand`
    pub fn new<F>(expand: F) -> Self
    where
        F: Fn(T) -> Vec<T> + Send + Sync + 'static,
    {
        Self::try_new(move |item| Ok(expand(item)))
    }

    pub fn try_new<F>(expand: F) -> Self
    where
        F: Fn(T) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        Self {
            options: StageOptions::named("FlatMapProcessor"),
            expand: Some(Arc::new(expand)),
        }
    }

    /// Treat the extracted input itself as the collection to expand
    pub fn identity() -> Self {
        Self {
            options: StageOptions::named("FlatMapProcessor"),
            expand: None,
        }
    }

    fn elements(&self, input: T) -> Result<Vec<T>> {
        match &self.expand {
            Some(expand) => expand(input),
            None => input.into_elements().map_err(|item| {
                PipelineError::AccessorType(format!(
                    "{} cannot expand non-collection item {:?}",
                    self.name(),
                    item
                ))
            }),
        }
    }
}

impl<T> StageBuilder<T> for FlatMapProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

impl<T: Item> Processor<T> for FlatMapProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    fn process<'a>(&'a self, upstream: ItemStream<'a, T>) -> ItemStream<'a, T> {
        boxed(async_stream::try_stream! {
            let mut upstream = upstream;
            while let Some(item) = pull(&mut upstream, self.name()).await? {
                let input = extract(self.options.input.as_ref(), &item)?;
                for element in self.elements(input)? {
                    yield inject(self.options.output.as_ref(), item.clone(), element)?;
                }
            }
        })
    }
}
