//! Test modules for fault tolerance

mod common;
mod setup;
