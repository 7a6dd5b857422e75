//! Operation status codes
//!
//! Every fallible operation in the crate reports one of a closed set of
//! outcome kinds. Subsystem errors (`QueueError`, `FtError`, `ConfigError`)
//! each map onto exactly one [`Status`] so callers can branch on the kind of
//! failure without matching on every variant.

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Closed enumeration of operation outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Status {
    Ok,
    NotFound,
    Timeout,
    InvalidArgument,
    InvalidState,
    NotImplemented,
    EntitlementDenied,
    Unsupported,
    QueueOpenObjects,
    SystemError,
    NoMemory,
}

impl Status {
    /// True for the success status
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// True for outcomes caused by the caller's input rather than the system
    pub fn is_caller_error(self) -> bool {
        matches!(self, Status::InvalidArgument | Status::InvalidState)
    }
}

/// Implemented by every error type that carries a [`Status`]
pub trait HasStatus {
    fn status(&self) -> Status;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_status_string_forms() {
        assert_eq!(Status::Ok.to_string(), "ok");
        assert_eq!(Status::InvalidArgument.to_string(), "invalid-argument");
        assert_eq!(Status::QueueOpenObjects.as_ref(), "queue-open-objects");
        assert_eq!(Status::from_str("timeout").unwrap(), Status::Timeout);
        assert!(Status::from_str("bogus").is_err());
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in Status::iter() {
            let parsed = Status::from_str(status.as_ref()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_caller_error_classification() {
        assert!(Status::InvalidArgument.is_caller_error());
        assert!(Status::InvalidState.is_caller_error());
        assert!(!Status::SystemError.is_caller_error());
        assert!(Status::Ok.is_ok());
        assert!(!Status::Timeout.is_ok());
    }
}
