//! Instruction compilation.
//!
//! The query pipeline, leaves first:
//!
//! - [`instruction`] - The [`Instruction`] enum and its kinds
//! - [`path`] - Path matchers and resolution against the entity tree
//! - [`dialect`] - The [`SqlDialect`] contract and default paged query shapes
//! - [`criteria`] - The pagination fragments handed to the dialect
//! - [`compiled`] - Compiled results and placeholder helpers
//! - [`compiler`] - [`InstructionSequence`] and the compile walk
//! - [`builder`] - The fluent [`QueryBuilder`] front-end

pub mod builder;
pub mod compiled;
pub mod compiler;
pub mod criteria;
pub mod dialect;
pub mod instruction;
pub mod path;

pub use builder::{ColumnTarget, QueryBuilder};
pub use compiled::{count_placeholders, Compiled, CompiledSql, PagedCompiledSql};
pub use compiler::{Accumulator, CompileOptions, InstructionSequence};
pub use criteria::QueryCriteria;
pub use dialect::{CountSkeleton, PagedSkeleton, RenderedSql, SqlDialect};
pub use instruction::{Instruction, InstructionKind};
pub use path::{resolve_path, PathMatcher};
