//! Configuration management for Barnacle.
//!
//! Provides XDG-compliant settings storage.

mod settings;

pub use settings::{AppSettings, Paths, DEFAULT_PORTS};
