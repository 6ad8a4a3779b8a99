//! # queryloom-db
//!
//! The SQL instruction compiler. A front-end appends [`Instruction`](query::Instruction)s
//! to an [`InstructionSequence`](query::InstructionSequence); compiling it against an
//! [`EntityTree`](mapping::EntityTree) and a [`SqlDialect`](query::SqlDialect) yields
//! parameterized SQL whose `?` placeholders line up with its parameter list.
//!
//! ## Architecture
//!
//! A plain query is a single SQL text. A paginated query is collected into four
//! fragments (main filter, main ordering, having, secondary filter) that the dialect
//! fuses into a page query and a matching count query; see [`query::compiler`] for the
//! parameter order.
//!
//! ## Module Overview
//!
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`mapping`] - Entity-to-table trees with join rendering
//! - [`query`] - Instructions, the compiler, dialect contract, and builder

// These clippy lints are allowed for the compiler crate:
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: SQL keywords in docs do not need backticks
// - needless_pass_by_value: builder methods take owned vectors
// - return_self_not_must_use: builder pattern methods are self-documenting
// - module_name_repetitions: QueryCriteria in query::criteria reads fine
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]

pub mod mapping;
pub mod query;
pub mod value;

pub use mapping::{EntityDef, EntityTree, JoinDef, NodeId};
pub use query::{Compiled, CompiledSql, Instruction, InstructionSequence, PagedCompiledSql, QueryBuilder, SqlDialect};
pub use value::Value;
