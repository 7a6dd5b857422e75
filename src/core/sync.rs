//! Lock poisoning helpers
//!
//! Queue, dispatcher and FT member state all live behind `std::sync` locks.
//! A panic inside a user callback can poison one of those locks; rather than
//! `unwrap()` at every call site, the helpers here turn a poisoned lock into
//! the caller's error type so it surfaces as a `SystemError` status.

use std::sync::{LockResult, RwLockReadGuard, RwLockWriteGuard};

fn poison_message(kind: &str, detail: impl std::fmt::Debug) -> String {
    format!(
        "Internal synchronisation error ({kind} poisoned). A callback panicked while the lock was held. PoisonError: {detail:?}"
    )
}

/// Convert a poisoned mutex (or condvar wait) result into an application error
///
/// Works for any `LockResult`, so it also covers `Condvar::wait` and
/// `Condvar::wait_timeout` which hand the guard back through the same type.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use ftqueue::core::sync::handle_mutex_poison;
/// use ftqueue::queue::QueueError;
///
/// let mutex = Mutex::new(42);
/// let guard = handle_mutex_poison(mutex.lock(), QueueError::lock_poisoned).unwrap();
/// assert_eq!(*guard, 42);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| error_constructor(poison_message("mutex", poison_err)))
}

/// Convert a poisoned RwLock read into an application error
pub fn handle_rwlock_read<T, E>(
    result: LockResult<RwLockReadGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<T>, E> {
    result.map_err(|poison_err| error_constructor(poison_message("RwLock read", poison_err)))
}

/// Convert a poisoned RwLock write into an application error
pub fn handle_rwlock_write<T, E>(
    result: LockResult<RwLockWriteGuard<T>>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<T>, E> {
    result.map_err(|poison_err| error_constructor(poison_message("RwLock write", poison_err)))
}
