//! Test modules for the queue system
//!
//! Organised by functional area; unit tests for individual types live next
//! to the types themselves.

mod lifecycle;
