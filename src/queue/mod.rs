//! Event Queue Component
//!
//! Ordered single-consumer event queues, the threads that dispatch them, and
//! a round-robin pool of dispatched queues.
//!
//! # Overview
//!
//! - **EventQueue**: FIFO of work items; any thread may enqueue, exactly one
//!   thread at a time dispatches
//! - **DispatcherThread**: one OS thread per queue whose sole job is dispatch
//! - **QueueGroup**: fixed set of (queue, dispatcher) pairs handed out by
//!   `next_queue()` in strict rotation
//! - **Timer**: repeating timer whose callbacks run on a queue's dispatch thread
//!
//! # Architecture
//!
//! ```text
//!   producers ──enqueue──┐
//!                        ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ QueueGroup  (cursor ─► 0 ─► 1 ─► 2 ─► 0 ...)         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐ │
//! │  │ EventQueue 0 │  │ EventQueue 1 │  │ EventQueue 2 │ │
//! │  │ [e][e][e]    │  │ [e]          │  │              │ │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘ │
//! │         │ dispatch        │ dispatch        │ dispatch│
//! │  ┌──────┴───────┐  ┌──────┴───────┐  ┌──────┴───────┐ │
//! │  │  thread 0    │  │  thread 1    │  │  thread 2    │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘ │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ftqueue::queue::{GroupConfig, QueueGroup};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let group = QueueGroup::new(3, GroupConfig::named("workers"))?;
//!
//! for i in 0..9 {
//!     if let Some(queue) = group.next_queue() {
//!         queue.enqueue(move || println!("item {i} on {:?}", std::thread::current().name()))?;
//!     }
//! }
//!
//! group.destroy_wait()?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod dispatcher;
pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod event_queue;
pub(crate) mod group;
pub(crate) mod timer;

pub mod api;

pub use api::*;

#[cfg(test)]
mod tests;
