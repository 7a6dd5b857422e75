//! FT Error Types

use crate::core::error_handling::ContextualError;
use crate::core::status::{HasStatus, Status};
use crate::ft::state::FtMechanism;
use crate::queue::QueueError;

#[derive(Debug, thiserror::Error)]
pub enum FtError {
    #[error("FT group name must not be empty")]
    EmptyGroupName,

    #[error("FT weight {weight} exceeds the maximum of {max}")]
    WeightOutOfRange { weight: u32, max: u32 },

    #[error("FT {what} interval must be greater than zero")]
    InvalidInterval { what: &'static str },

    #[error("FT member has not been set up")]
    NotSetUp,

    #[error("Cannot {operation} while the FT member is active")]
    MemberActive { operation: &'static str },

    #[error("FT member has been destroyed")]
    Destroyed,

    #[error("Transport '{transport}' does not support {mechanism} FT")]
    Unsupported {
        mechanism: FtMechanism,
        transport: String,
    },

    #[error("Malformed heartbeat: {message}")]
    MalformedHeartbeat { message: String },

    #[error("Heartbeat protocol version {received} is not supported (expected {expected})")]
    ProtocolMismatch { received: u32, expected: u32 },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Lock poisoned: {message}")]
    LockPoisoned { message: String },
}

impl FtError {
    /// Constructor usable with the `core::sync` poison helpers
    pub fn lock_poisoned(message: String) -> Self {
        FtError::LockPoisoned { message }
    }
}

impl From<serde_json::Error> for FtError {
    fn from(e: serde_json::Error) -> Self {
        FtError::MalformedHeartbeat {
            message: e.to_string(),
        }
    }
}

impl HasStatus for FtError {
    fn status(&self) -> Status {
        match self {
            FtError::EmptyGroupName
            | FtError::WeightOutOfRange { .. }
            | FtError::InvalidInterval { .. }
            | FtError::MalformedHeartbeat { .. } => Status::InvalidArgument,
            FtError::NotSetUp | FtError::MemberActive { .. } | FtError::Destroyed => {
                Status::InvalidState
            }
            FtError::Unsupported { .. } | FtError::ProtocolMismatch { .. } => Status::Unsupported,
            FtError::Queue(inner) => inner.status(),
            FtError::Transport { .. } | FtError::LockPoisoned { .. } => Status::SystemError,
        }
    }
}

impl ContextualError for FtError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            FtError::EmptyGroupName
                | FtError::WeightOutOfRange { .. }
                | FtError::InvalidInterval { .. }
                | FtError::Unsupported { .. }
        ) || matches!(self, FtError::Queue(inner) if inner.is_user_actionable())
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            FtError::EmptyGroupName => Some("FT group name must not be empty"),
            FtError::WeightOutOfRange { .. } => Some("FT weight is out of range"),
            FtError::InvalidInterval { .. } => {
                Some("FT heartbeat and timeout intervals must be greater than zero")
            }
            FtError::Unsupported { .. } => {
                Some("The selected FT mechanism is not supported by this transport")
            }
            FtError::Queue(inner) => inner.user_message(),
            _ => None,
        }
    }
}

/// Result type for FT operations
pub type FtResult<T> = Result<T, FtError>;
