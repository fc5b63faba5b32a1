//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the publisher core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus carrying user-visible publish notices
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions, the fail-fast capability checks
//! and the event broadcasting used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
