//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweeper: purges expired in-memory entries at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
