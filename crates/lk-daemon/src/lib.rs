//! Supervisor daemon for the lenskeeper camera-management application.
//!
//! The daemon provides the application's lifecycle core:
//! - Environment requirement verification before startup
//! - Signal-driven graceful shutdown
//! - A recurring monitor that keeps the external motion daemon running
//!   whenever enabled cameras exist
//! - Lifecycle management for the cleanup, thumbnail and share-mount workers
//! - The HTTP status listener bound for the supervisor's lifetime

pub mod cleanup;
pub mod monitor;
pub mod motion;
pub mod mounts;
pub mod requirements;
pub mod server;
pub mod shutdown;
pub mod signals;
pub mod supervisor;
pub mod thumbnailer;
pub mod worker;
