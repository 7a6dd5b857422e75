//! Fault-Tolerance Component
//!
//! Weighted active/standby election between members of a named group.
//!
//! # Overview
//!
//! - **FtMember**: one participant; publishes heartbeats, tracks peers and
//!   reports `Unknown -> Standby -> Active` transitions through a callback
//! - **Credentials**: election order (weight, incarnation, address, pid)
//! - **FtTransport**: the heartbeat exchange; [`LoopbackTransport`] runs it
//!   in-process
//!
//! All member work runs on the member's bound [`EventQueue`](crate::queue::EventQueue),
//! so callbacks are delivered on that queue's dispatch thread.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ftqueue::ft::{FtMember, FtSetup, LoopbackTransport};
//! use ftqueue::queue::{DispatcherThread, EventQueue};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dispatcher = DispatcherThread::spawn(EventQueue::new("ft"))?;
//! let transport = LoopbackTransport::new("local");
//!
//! let member = FtMember::create();
//! member.setup(
//!     FtSetup::new(dispatcher.queue().clone(), transport, "prices")
//!         .with_weight(10)
//!         .with_intervals(Duration::from_millis(500), Duration::from_secs(2)),
//!     |change| println!("{} is now {}", change.group_name, change.state),
//! )?;
//! member.activate()?;
//!
//! // ... later
//! member.destroy()?;
//! dispatcher.destroy_wait()?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod error;
pub(crate) mod heartbeat;
pub(crate) mod instance;
pub(crate) mod member;
pub(crate) mod state;
pub(crate) mod transport;

pub mod api;

pub use api::*;

#[cfg(test)]
mod tests;
