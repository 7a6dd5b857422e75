//! Tests for the CLI module
//!
//! Argument parsing and configuration loading and overrides.
