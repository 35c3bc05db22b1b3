//! Worktrace Common Utilities
//!
//! Shared infrastructure for all Worktrace crates:
//! - Error types and result aliases
//! - Analysis and logging configuration
//! - Frame sampling from source rate to analysis rate
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;
pub mod sampling;

pub use config::*;
pub use error::*;
pub use sampling::*;
