//! Error reporting at the application boundary
//!
//! Library operations return typed errors; the binary reports them once,
//! choosing between a user-facing message (bad configuration, bad arguments)
//! and a generic context line with the details at debug level.

use crate::core::status::HasStatus;

/// Errors that know whether the user can act on them
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error + HasStatus {
    /// True when the message should be shown to the user verbatim
    fn is_user_actionable(&self) -> bool;

    /// The user-facing message for actionable errors
    fn user_message(&self) -> Option<&str>;
}

/// Log an error once, with detail appropriate to its kind
///
/// User-actionable errors log their own message; system errors log the
/// operation context. The status and the full error always go to debug.
///
/// ```rust,no_run
/// # use ftqueue::core::error_handling::log_error_with_context;
/// # use ftqueue::queue::QueueError;
/// let err = QueueError::InvalidCount { count: 0 };
/// log_error_with_context(&err, "Creating queue group");
/// // Logs: "FATAL: Queue group needs at least one queue (got 0)"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("STATUS: {}", error.status());
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::status::Status;
    use std::fmt;

    #[derive(Debug)]
    struct BadWeight {
        message: String,
    }

    impl fmt::Display for BadWeight {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for BadWeight {}

    impl HasStatus for BadWeight {
        fn status(&self) -> Status {
            Status::InvalidArgument
        }
    }

    impl ContextualError for BadWeight {
        fn is_user_actionable(&self) -> bool {
            true
        }

        fn user_message(&self) -> Option<&str> {
            Some(&self.message)
        }
    }

    #[derive(Debug)]
    struct JoinFailure;

    impl fmt::Display for JoinFailure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "dispatcher thread panicked")
        }
    }

    impl std::error::Error for JoinFailure {}

    impl HasStatus for JoinFailure {
        fn status(&self) -> Status {
            Status::SystemError
        }
    }

    impl ContextualError for JoinFailure {
        fn is_user_actionable(&self) -> bool {
            false
        }

        fn user_message(&self) -> Option<&str> {
            None
        }
    }

    #[test]
    fn test_actionable_error_exposes_message() {
        let error = BadWeight {
            message: "weight 4294967295 exceeds maximum".to_string(),
        };
        assert!(error.is_user_actionable());
        assert_eq!(error.user_message(), Some("weight 4294967295 exceeds maximum"));
        log_error_with_context(&error, "Setting up FT member");
    }

    #[test]
    fn test_system_error_hides_message() {
        let error = JoinFailure;
        assert!(!error.is_user_actionable());
        assert_eq!(error.user_message(), None);
        assert_eq!(error.status(), Status::SystemError);
        log_error_with_context(&error, "Stopping dispatcher");
    }
}
