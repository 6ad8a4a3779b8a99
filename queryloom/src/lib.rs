//! # queryloom
//!
//! An instruction-based SQL compiler that turns a flat list of instructions
//! over an entity tree into parameterized SQL, and synthesizes a paired page
//! query and count query for paginated requests.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `queryloom` to get everything, or depend on individual
//! crates for finer-grained control.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use queryloom::db::mapping::{EntityDef, EntityTree};
//! use queryloom::db::QueryBuilder;
//! use queryloom::db_backends::SqliteDialect;
//!
//! let tree = Arc::new(EntityTree::new(EntityDef::new("Order", "orders", "o")).unwrap());
//! let paged = QueryBuilder::paged(0, 20)
//!     .paged_main_order_by()
//!     .id()
//!     .asc()
//!     .compile_paged(tree, &SqliteDialect)
//!     .unwrap();
//! assert!(paged.count_sql().starts_with("SELECT COUNT(*)"));
//! ```

/// Core types, settings, logging, and the error type.
pub use queryloom_core as core;

/// Entity trees, instructions, the compiler, and the dialect contract.
#[cfg(feature = "db")]
pub use queryloom_db as db;

/// SQL dialects: `SQLite`, `PostgreSQL`, `MySQL`.
pub use queryloom_db_backends as db_backends;

/// Commands and JSON query plans (CLI).
#[cfg(feature = "cli")]
pub use queryloom_cli as cli;

// Third-party re-exports for user convenience.
pub use serde;
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;
