//! Dispatched event queues with weighted active/standby fault tolerance
//!
//! - [`queue`]: event queues, dispatcher threads, round-robin queue groups
//!   and timers
//! - [`ft`]: FT group members electing one active instance by weight
//! - [`core`]: status codes, error reporting, logging and shutdown
//! - [`app`]: the `ftqueue` demo binary's CLI, configuration and runner

pub mod app;
pub mod core;
pub mod ft;
pub mod queue;
