use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn, Level};

use crate::accessor::{StageBuilder, StageOptions};
use crate::error::Result;
use crate::item::Item;
use crate::processor::Processor;

/// Pass-through stage that logs every item
///
/// The message is a template rendered with [`Item::render`]: record fields
/// are available as `{field}`, anything else as `{item}`.
pub struct LogProcessor<T> {
    options: StageOptions<T>,
    level: Level,
    message: String,
}

impl<T> LogProcessor<T> {
    pub fn new() -> Self {
        Self {
            options: StageOptions::named("LogProcessor"),
            level: Level::INFO,
            message: "{item}".to_string(),
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<T> Default for LogProcessor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StageBuilder<T> for LogProcessor<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item> Processor<T> for LogProcessor<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        let text = item.render(&self.message);
        let stage = self.name();
        match self.level {
            Level::ERROR => error!(stage = %stage, "{}", text),
            Level::WARN => warn!(stage = %stage, "{}", text),
            Level::INFO => info!(stage = %stage, "{}", text),
            Level::DEBUG => debug!(stage = %stage, "{}", text),
            _ => trace!(stage = %stage, "{}", text),
        }
        Ok(item)
    }
}
