//! Terminal sinks that persist items as JSON files
//!
//! Both writers pass the item through unchanged, so they can sit in the
//! middle of a pipeline as well as at its end.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::accessor::{InputAccessor, StageBuilder, StageOptions};
use crate::error::Result;
use crate::item::Item;
use crate::processor::Processor;

/// Writes each item to `<dir>/<name>.json` as pretty-printed JSON
pub struct JsonWriter<T> {
    options: StageOptions<T>,
    dir_path: PathBuf,
    file_name: InputAccessor<T>,
}

impl<T> JsonWriter<T> {
    /// `file_name` yields a scalar key for each item
    pub fn new(dir_path: impl Into<PathBuf>, file_name: impl Into<InputAccessor<T>>) -> Self {
        Self {
            options: StageOptions::named("JsonWriter"),
            dir_path: dir_path.into(),
            file_name: file_name.into(),
        }
    }
}

impl<T> StageBuilder<T> for JsonWriter<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item + Serialize> Processor<T> for JsonWriter<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        let name = self.file_name.read(&item)?.to_key()?;
        let path = self.dir_path.join(format!("{}.json", name));
        let json = serde_json::to_string_pretty(&item)?;

        fs::create_dir_all(&self.dir_path).await?;
        fs::write(&path, json.as_bytes()).await?;
        debug!("{}: wrote {}", self.name(), path.display());
        Ok(item)
    }
}

/// Appends each item as one compact JSON line
///
/// Without a key accessor every item goes to one file at `path` (a `.jsonl`
/// extension is added if missing). With one, `path` is a directory and each
/// item goes to `<path>/<key>.jsonl`.
pub struct JsonlWriter<T> {
    options: StageOptions<T>,
    path: PathBuf,
    key_file_name: Option<InputAccessor<T>>,
}

impl<T> JsonlWriter<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            options: StageOptions::named("JsonlWriter"),
            path: path.into(),
            key_file_name: None,
        }
    }

    pub fn keyed(path: impl Into<PathBuf>, key_file_name: impl Into<InputAccessor<T>>) -> Self {
        Self {
            key_file_name: Some(key_file_name.into()),
            ..Self::new(path)
        }
    }
}

impl<T: Item> JsonlWriter<T> {
    fn target(&self, item: &T) -> Result<PathBuf> {
        match &self.key_file_name {
            Some(accessor) => {
                let name = accessor.read(item)?.to_key()?;
                Ok(self.path.join(format!("{}.jsonl", name)))
            }
            None if has_jsonl_extension(&self.path) => Ok(self.path.clone()),
            None => {
                let mut path = self.path.clone().into_os_string();
                path.push(".jsonl");
                Ok(PathBuf::from(path))
            }
        }
    }
}

fn has_jsonl_extension(path: &Path) -> bool {
    path.extension().map(|ext| ext == "jsonl").unwrap_or(false)
}

impl<T> StageBuilder<T> for JsonlWriter<T> {
    fn options_mut(&mut self) -> &mut StageOptions<T> {
        &mut self.options
    }
}

#[async_trait]
impl<T: Item + Serialize> Processor<T> for JsonlWriter<T> {
    fn options(&self) -> &StageOptions<T> {
        &self.options
    }

    async fn process_item(&self, item: T) -> Result<T> {
        let path = self.target(&item)?;
        let mut line = serde_json::to_string(&item)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(item)
    }
}
