//! Queue Error Types

use crate::core::error_handling::ContextualError;
use crate::core::status::{HasStatus, Status};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue '{queue}' has been destroyed")]
    Destroyed { queue: String },

    #[error("Queue '{queue}' is already being dispatched by another thread")]
    AlreadyDispatching { queue: String },

    #[error("Queue group needs at least one queue (got {count})")]
    InvalidCount { count: usize },

    #[error("Queue group '{group}' has been destroyed")]
    GroupDestroyed { group: String },

    #[error("Invalid watermark: {message}")]
    InvalidWatermark { message: String },

    #[error("Invalid interval for {what}: must be greater than zero")]
    InvalidInterval { what: String },

    #[error("Queue '{queue}' still has {count} open objects")]
    OpenObjects { queue: String, count: usize },

    #[error("{operation} on queue '{queue}' timed out after {timeout_ms} ms")]
    Timeout {
        operation: String,
        queue: String,
        timeout_ms: u128,
    },

    #[error("Dispatcher for queue '{queue}' cannot be joined from its own thread")]
    SelfJoin { queue: String },

    #[error("Dispatcher thread for queue '{queue}' panicked")]
    DispatcherPanicked { queue: String },

    #[error("Failed to spawn thread for '{name}': {message}")]
    ThreadSpawn { name: String, message: String },

    #[error("Lock poisoned: {message}")]
    LockPoisoned { message: String },
}

impl QueueError {
    /// Constructor usable with the `core::sync` poison helpers
    pub fn lock_poisoned(message: String) -> Self {
        QueueError::LockPoisoned { message }
    }
}

impl HasStatus for QueueError {
    fn status(&self) -> Status {
        match self {
            QueueError::Destroyed { .. }
            | QueueError::AlreadyDispatching { .. }
            | QueueError::GroupDestroyed { .. }
            | QueueError::SelfJoin { .. } => Status::InvalidState,
            QueueError::InvalidCount { .. }
            | QueueError::InvalidWatermark { .. }
            | QueueError::InvalidInterval { .. } => Status::InvalidArgument,
            QueueError::OpenObjects { .. } => Status::QueueOpenObjects,
            QueueError::Timeout { .. } => Status::Timeout,
            QueueError::DispatcherPanicked { .. }
            | QueueError::ThreadSpawn { .. }
            | QueueError::LockPoisoned { .. } => Status::SystemError,
        }
    }
}

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        self.status() == Status::InvalidArgument
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::InvalidCount { .. } => Some("Queue group needs at least one queue"),
            QueueError::InvalidWatermark { message } => Some(message),
            QueueError::InvalidInterval { .. } => Some("Intervals must be greater than zero"),
            _ => None,
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
