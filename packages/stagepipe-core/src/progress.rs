//! Hierarchical progress counters
//!
//! A tracker counts completed steps against a total that is set once, before
//! any step completes. When a tracker reaches its total it increments its
//! parent by one, so a parent can count finished child stages.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{PipelineError, Result};

#[derive(Debug, Default)]
struct Counts {
    total: usize,
    completed: usize,
}

pub struct ProgressTracker {
    name: String,
    counts: Mutex<Counts>,
    parent: Option<Arc<ProgressTracker>>,
    log_progress: bool,
}

impl ProgressTracker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            counts: Mutex::new(Counts::default()),
            parent: None,
            log_progress: true,
        }
    }

    /// Tracker that increments `parent` once it completes
    pub fn with_parent(name: impl Into<String>, parent: Arc<ProgressTracker>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(name)
        }
    }

    /// Disable per-step `info!` lines
    pub fn quiet(mut self) -> Self {
        self.log_progress = false;
        self
    }

    /// Follow `config.progress_logging`
    pub fn configured(mut self, config: &EngineConfig) -> Self {
        self.log_progress = config.progress_logging;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the number of steps required for completion
    ///
    /// # Errors
    ///
    /// Fails if `total_steps` is zero or if any step was already completed.
    pub fn set_total_steps(&self, total_steps: usize) -> Result<()> {
        if total_steps == 0 {
            return Err(self.contract("total steps must be greater than zero"));
        }
        let mut counts = self.counts.lock();
        if counts.completed > 0 {
            return Err(self.contract("cannot set total steps after steps have been completed"));
        }
        counts.total = total_steps;
        Ok(())
    }

    /// Complete one step
    ///
    /// Reaching the total increments the parent tracker after the lock is released.
    pub fn increment(&self) -> Result<()> {
        let (completed, total) = {
            let mut counts = self.counts.lock();
            if counts.total == 0 {
                return Err(self.contract("total steps must be set before incrementing"));
            }
            if counts.completed + 1 > counts.total {
                return Err(PipelineError::ProgressOverflow {
                    tracker: self.name.clone(),
                    completed: counts.completed + 1,
                    total: counts.total,
                });
            }
            counts.completed += 1;
            (counts.completed, counts.total)
        };

        self.notify(completed, total);

        if completed == total {
            if let Some(parent) = &self.parent {
                debug!("Tracker {} complete, incrementing parent {}", self.name, parent.name);
                parent.increment()?;
            }
        }
        Ok(())
    }

    /// Reset completed steps, optionally replacing the total
    pub fn reset(&self, total_steps: Option<usize>) {
        let total = {
            let mut counts = self.counts.lock();
            counts.completed = 0;
            if let Some(total) = total_steps {
                counts.total = total;
            }
            counts.total
        };
        info!("Progress {}: reset", self.name);
        self.notify(0, total);
    }

    /// Progress in `0.0..=1.0`; `0.0` while the total is unset
    pub fn progress(&self) -> f64 {
        let counts = self.counts.lock();
        if counts.total == 0 {
            return 0.0;
        }
        counts.completed.min(counts.total) as f64 / counts.total as f64
    }

    pub fn is_complete(&self) -> bool {
        let counts = self.counts.lock();
        counts.total > 0 && counts.completed == counts.total
    }

    pub fn completed_steps(&self) -> usize {
        self.counts.lock().completed
    }

    pub fn total_steps(&self) -> usize {
        self.counts.lock().total
    }

    fn notify(&self, completed: usize, total: usize) {
        if !self.log_progress {
            return;
        }
        if total > 0 {
            info!(
                "Progress {}: {}/{} ({:.1}%)",
                self.name,
                completed,
                total,
                completed as f64 * 100.0 / total as f64
            );
        } else {
            info!("Progress {}: {}/???", self.name, completed);
        }
    }

    fn contract(&self, message: &str) -> PipelineError {
        PipelineError::ProgressContract {
            tracker: self.name.clone(),
            message: message.to_string(),
        }
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts.lock();
        write!(
            f,
            "ProgressTracker({}: {}/{})",
            self.name, counts.completed, counts.total
        )
    }
}
