//! Audit trail queue configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// What `AuditTrail::record` does when the bounded queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOverflowPolicy {
    /// Drop the incoming entry immediately and count it.
    #[default]
    DropNewest,
    /// Wait up to `block_timeout_ms` for a free slot, then drop and count.
    BlockWithTimeout,
}

impl std::fmt::Display for AuditOverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DropNewest => write!(f, "drop_newest"),
            Self::BlockWithTimeout => write!(f, "block_with_timeout"),
        }
    }
}

/// Bounded audit queue and background writer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Maximum number of entries buffered between callers and the writer.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Behaviour when the queue is full.
    #[serde(default)]
    pub overflow_policy: AuditOverflowPolicy,
    /// Upper bound on how long `record` may wait under `block_with_timeout`.
    #[serde(default = "default_block_timeout")]
    pub block_timeout_ms: u64,
    /// Write attempts per entry before it is logged and dropped.
    #[serde(default = "default_max_attempts")]
    pub max_write_attempts: u32,
    /// Backoff between write attempts, multiplied by the attempt number.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
    /// How long shutdown waits for the queue to drain.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl AuditConfig {
    /// Rejects settings the writer cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.queue_capacity == 0 {
            return Err(AppError::configuration("audit.queue_capacity must be positive"));
        }
        if self.max_write_attempts == 0 {
            return Err(AppError::configuration(
                "audit.max_write_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            overflow_policy: AuditOverflowPolicy::default(),
            block_timeout_ms: default_block_timeout(),
            max_write_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_block_timeout() -> u64 {
    50
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    100
}

fn default_shutdown_timeout() -> u64 {
    10
}
