//! Core configuration and environment layer for the lenskeeper camera
//! supervisor.
//!
//! This crate resolves the layered runtime configuration (built-in defaults,
//! the on-disk settings store, command-line overrides), probes the host for
//! the external capabilities the daemon depends on, and exposes the camera
//! registry that tells the supervisor whether there is any enabled work.

pub mod cameras;
pub mod capabilities;
pub mod settings;
