//! # queryloom-core
//!
//! Core types shared by every queryloom crate: the framework error type,
//! settings and their loaders, and tracing-based logging setup.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Compiler settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{LoomError, LoomResult};
pub use settings::{Settings, SETTINGS};
