//! Engine configuration
//!
//! Loaded from YAML with serde defaults for missing keys, then optionally
//! overridden from the environment:
//!
//! ```yaml
//! max_concurrent: 8
//! log_filter: "stagepipe_core=debug,info"
//! progress_logging: false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const ENV_MAX_CONCURRENT: &str = "STAGEPIPE_MAX_CONCURRENT";
pub const ENV_LOG: &str = "STAGEPIPE_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default bound for `ConcurrentProcessor::from_config`
    pub max_concurrent: usize,
    /// `EnvFilter` directives used by `init_tracing`
    pub log_filter: String,
    /// Emit per-step progress lines
    pub progress_logging: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            log_filter: "info".to_string(),
            progress_logging: true,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(PipelineError::config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(PipelineError::config)
    }

    /// Apply `STAGEPIPE_MAX_CONCURRENT` and `STAGEPIPE_LOG` if set
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_CONCURRENT) {
            self.max_concurrent = raw.trim().parse().map_err(|e| {
                PipelineError::config(format!("{}={:?}: {}", ENV_MAX_CONCURRENT, raw, e))
            })?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(PipelineError::InvalidConcurrency(self.max_concurrent));
        }
        if self.log_filter.trim().is_empty() {
            return Err(PipelineError::config("log_filter must not be empty"));
        }
        Ok(())
    }
}
