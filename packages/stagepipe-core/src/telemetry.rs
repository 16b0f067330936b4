use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::error::{PipelineError, Result};

/// Install a global `fmt` subscriber
///
/// `RUST_LOG` takes precedence over `config.log_filter`. Fails if a global
/// subscriber is already set; callers that may initialize twice can ignore
/// the error.
pub fn init_tracing(config: &EngineConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter).map_err(PipelineError::config)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| PipelineError::config(format!("tracing already initialized: {}", e)))
}
