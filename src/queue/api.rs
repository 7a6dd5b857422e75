//! Public API for the queue system
//!
//! External modules should import from here rather than directly from the
//! internal modules. See the module documentation for usage and architecture.

// Queues and dispatch
pub use crate::queue::dispatcher::DispatcherThread;
pub use crate::queue::event_queue::{
    DispatchOutcome, EnqueueCallback, EventQueue, QueueConfig, QueueMonitor, QueueObjectGuard,
    DEFAULT_POLL_INTERVAL,
};
pub use crate::queue::group::{GroupConfig, QueueGroup};

// Work items
pub use crate::queue::event::{EventHandler, EventKind, QueueEvent};

// Timers
pub use crate::queue::timer::Timer;

// Error handling
pub use crate::queue::error::{QueueError, QueueResult};
