use std::str::FromStr;

use stagepipe_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Processor '{stage}' does not implement process_item")]
    NotImplemented { stage: String },

    #[error("Accessor type error: {0}")]
    AccessorType(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Invalid concurrency: max_concurrent must be greater than 0, got {0}")]
    InvalidConcurrency(usize),

    #[error("Progress tracker {tracker}: {message}")]
    ProgressContract { tracker: String, message: String },

    #[error("Progress tracker {tracker}: completed steps ({completed}) cannot exceed total steps ({total})")]
    ProgressOverflow {
        tracker: String,
        completed: usize,
        total: usize,
    },

    #[error("Upstream fault: {0}")]
    Upstream(String),

    #[error("Stage '{stage}' failed: {message}")]
    StageExecutionFailed { stage: String, message: String },

    #[error("Step {step} not found (pipeline has {available} steps)")]
    StepNotFound { step: usize, available: usize },

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn upstream<E: std::fmt::Display>(e: E) -> Self {
        Self::Upstream(e.to_string())
    }

    pub fn stage_failed<E: std::fmt::Display>(stage: impl Into<String>, e: E) -> Self {
        Self::StageExecutionFailed {
            stage: stage.into(),
            message: e.to_string(),
        }
    }

    pub fn conversion<E: std::fmt::Display>(e: E) -> Self {
        Self::Conversion(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    /// Fault class of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::NotImplemented { .. }
            | PipelineError::AccessorType(_)
            | PipelineError::InvalidConcurrency(_)
            | PipelineError::ProgressContract { .. }
            | PipelineError::StepNotFound { .. }
            | PipelineError::Config(_) => ErrorCategory::ContractViolation,
            PipelineError::Upstream(_) => ErrorCategory::UpstreamFault,
            PipelineError::ProgressOverflow { .. } => ErrorCategory::ConsistencyFault,
            PipelineError::Storage(e) if e.is_already_exists() => ErrorCategory::ConsistencyFault,
            _ => ErrorCategory::TransformationFault,
        }
    }

    /// Upstream faults end the consuming stage's input instead of aborting the run
    pub fn is_upstream_fault(&self) -> bool {
        self.category() == ErrorCategory::UpstreamFault
    }
}

/// Fault class, used to decide how a stage reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Wrong accessor, unimplemented transform, invalid parameter. Fatal, never retried
    ContractViolation,
    /// Failure while pulling the next item. Treated as end-of-stream
    UpstreamFault,
    /// Failure inside a stage's own logic. Aborts the run
    TransformationFault,
    /// Progress overflow, duplicate checkpoint create. Fatal
    ConsistencyFault,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ContractViolation => "contract_violation",
            ErrorCategory::UpstreamFault => "upstream_fault",
            ErrorCategory::TransformationFault => "transformation_fault",
            ErrorCategory::ConsistencyFault => "consistency_fault",
        }
    }
}

impl FromStr for ErrorCategory {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "contract_violation" => Ok(ErrorCategory::ContractViolation),
            "upstream_fault" => Ok(ErrorCategory::UpstreamFault),
            "transformation_fault" => Ok(ErrorCategory::TransformationFault),
            "consistency_fault" => Ok(ErrorCategory::ConsistencyFault),
            _ => Err(PipelineError::conversion(format!(
                "Invalid error category: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
