//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: evicts expired cache entries at the configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
