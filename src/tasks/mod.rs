//! Background tasks module
//!
//! This module contains background tasks that run alongside the HTTP server.

pub mod completion_log;

// Re-export main functions
pub use completion_log::completion_log_task;
