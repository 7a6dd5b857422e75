//! Application module: CLI, configuration and the demo runner

pub mod cli;
pub mod runner;
pub mod startup;
