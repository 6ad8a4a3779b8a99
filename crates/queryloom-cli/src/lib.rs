//! # queryloom-cli
//!
//! The `queryloom` command-line front-end.
//!
//! This crate provides:
//!
//! - **Commands** - A framework for defining and registering subcommands,
//!   plus the built-in `compile` and `check` commands
//! - **Query plans** - A JSON format pairing an entity tree with an
//!   instruction sequence
//!
//! ## Quick Start
//!
//! ```rust
//! use queryloom_cli::command::CommandRegistry;
//! use queryloom_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! let names = registry.list_commands();
//! assert!(names.contains(&"compile"));
//! assert!(names.contains(&"check"));
//! ```

// These clippy lints are intentionally allowed:
// - result_large_err: LoomError is the crate-wide error type
// - doc_markdown: backtick requirements for documentation items are too strict
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]

pub mod command;
pub mod commands;
pub mod plan;

pub use command::{CommandRegistry, ManagementCommand};
pub use plan::QueryPlan;
