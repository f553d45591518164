//! Logging initialisation for the lenskeeper daemon.

pub mod logging;
