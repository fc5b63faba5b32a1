//! Workspace facade crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates. Host applications can depend on `jade-publisher` and
//! enable the documented features without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{
    bootstrap_desktop, init_logging, CoreConfig, CoreService, FileEvent, LoggingConfig, Publisher,
    RemoteSettings,
};
