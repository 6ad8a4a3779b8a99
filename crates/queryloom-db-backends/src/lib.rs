//! # queryloom-db-backends
//!
//! [`SqlDialect`](queryloom_db::query::SqlDialect) implementations for the
//! supported database engines, and selection of a dialect from settings.
//!
//! Supported dialects:
//! - `SQLite`
//! - `PostgreSQL`
//! - `MySQL`
//!
//! With the `sqlite` feature (on by default), [`sqlite`] also binds compiled
//! parameters to `rusqlite` statements and runs them.

pub mod base;
pub mod mysql;
pub mod postgresql;
pub mod sqlite;

pub use base::{dialect_for, dialect_from_settings, DialectKind};
pub use mysql::MySqlDialect;
pub use postgresql::PostgresDialect;
pub use sqlite::SqliteDialect;
