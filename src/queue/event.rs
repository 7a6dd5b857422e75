//! Work items carried by an [`EventQueue`](super::EventQueue)

use std::fmt;

use strum_macros::{AsRefStr, Display};

/// Boxed handler executed on the dispatching thread
pub type EventHandler = Box<dyn FnOnce() + Send + 'static>;

/// Origin of a queued event, used for logging and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Message,
    Timer,
    Io,
    Ft,
    User,
}

/// A single unit of work: a kind tag plus the handler to run
pub struct QueueEvent {
    kind: EventKind,
    handler: EventHandler,
}

impl QueueEvent {
    pub fn new(kind: EventKind, handler: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind,
            handler: Box::new(handler),
        }
    }

    /// Application event, the kind used by [`EventQueue::enqueue`](super::EventQueue::enqueue)
    pub fn user(handler: impl FnOnce() + Send + 'static) -> Self {
        Self::new(EventKind::User, handler)
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub(crate) fn run(self) {
        (self.handler)()
    }
}

impl fmt::Debug for QueueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEvent")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
