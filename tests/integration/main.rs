//! Integration tests for usbide
//!
//! These exercise the public library API: subprocess streaming against a real
//! shell, the assistant session flow against replayed CLI output, and layered
//! configuration.

// Test utilities and common setup
mod common;

mod assistant_tests;
mod config_tests;
mod streaming_tests;

// Re-export common utilities for use by test modules
pub use common::*;
