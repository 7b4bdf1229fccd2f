//! State backend trait and error types

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lock::LockInfo;
use crate::state::StateFile;

/// Errors that can occur when interacting with a state backend
#[derive(Debug, Error)]
pub enum BackendError {
    /// The state is locked by another process
    #[error("State is locked by {who} (lock ID: {lock_id}, operation: {operation})")]
    Locked {
        lock_id: String,
        who: String,
        operation: String,
    },

    #[error("Lock not found: {0}")]
    LockNotFound(String),

    #[error("Lock ID mismatch: expected {expected}, got {actual}")]
    LockMismatch { expected: String, actual: String },

    #[error("Unsupported backend type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend configuration error: {0}")]
    Configuration(String),

    /// State file is corrupted or written by a newer format
    #[error("Invalid state file: {0}")]
    InvalidState(String),

    /// The stored state belongs to a different lineage than the one being written
    #[error("State lineage mismatch: expected {expected}, got {actual}")]
    LineageMismatch { expected: String, actual: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl BackendError {
    /// Create a Locked error from a LockInfo
    pub fn locked(lock: &LockInfo) -> Self {
        Self::Locked {
            lock_id: lock.id.clone(),
            who: lock.who.clone(),
            operation: lock.operation.clone(),
        }
    }

    pub fn unsupported_backend(backend_type: impl Into<String>) -> Self {
        Self::UnsupportedBackend(backend_type.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Storage for the state file
///
/// Writers must hold the lock returned by `acquire_lock` for the duration of
/// a plan/apply cycle and release it afterwards.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current state
    ///
    /// Returns `None` if no state has been written yet.
    async fn read_state(&self) -> BackendResult<Option<StateFile>>;

    /// Write the state
    ///
    /// Fails with `LineageMismatch` if the stored state has a different lineage.
    async fn write_state(&self, state: &StateFile) -> BackendResult<()>;

    /// Acquire a lock for the given operation
    ///
    /// Fails if an unexpired lock is already held.
    async fn acquire_lock(&self, operation: &str) -> BackendResult<LockInfo>;

    /// Release a lock previously returned by `acquire_lock`
    async fn release_lock(&self, lock: &LockInfo) -> BackendResult<()>;

    /// Remove a lock by ID regardless of who holds it
    async fn force_unlock(&self, lock_id: &str) -> BackendResult<()>;

    /// Prepare the storage location
    async fn init(&self) -> BackendResult<()>;
}

/// `backend` block of the configuration file
///
/// ```json
/// { "type": "local", "path": "awsmt.state.json" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(rename = "type", default = "default_backend_type")]
    pub backend_type: String,
    /// Location of the state file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_backend_type() -> String {
    "local".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            backend_type: default_backend_type(),
            path: None,
        }
    }
}

impl BackendConfig {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            backend_type: default_backend_type(),
            path: Some(path.into()),
        }
    }
}
