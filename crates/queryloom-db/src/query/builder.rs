//! A fluent front-end producing instruction sequences.
//!
//! Each builder call appends one or more [`Instruction`]s; the builder
//! never renders SQL itself. Keywords are emitted as `STRING` instructions
//! with their surrounding spaces, so fragments read naturally once the
//! compiler concatenates them.
//!
//! # Examples
//!
//! ```
//! use queryloom_db::query::builder::QueryBuilder;
//!
//! let sequence = QueryBuilder::select()
//!     .where_()
//!     .column("status")
//!     .eq("open")
//!     .and()
//!     .id_in(Some([1, 2, 3]))
//!     .order_by()
//!     .column("placed_at")
//!     .desc()
//!     .build();
//! assert_eq!(sequence.len(), 22);
//! ```

use std::sync::Arc;

use queryloom_core::LoomResult;

use super::compiled::{Compiled, CompiledSql, PagedCompiledSql};
use super::compiler::{CompileOptions, InstructionSequence};
use super::dialect::SqlDialect;
use super::instruction::Instruction;
use super::path::PathMatcher;
use crate::mapping::EntityTree;
use crate::value::Value;

/// Builds an [`InstructionSequence`] call by call.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    sequence: InstructionSequence,
}

impl QueryBuilder {
    /// An empty builder with no initializer.
    pub const fn new() -> Self {
        Self {
            sequence: InstructionSequence::new(),
        }
    }

    /// Starts with the full SELECT over the entity tree.
    pub fn select() -> Self {
        Self::new().push(Instruction::InitialQuery)
    }

    /// Starts with only the FROM clause of the entity tree.
    pub fn from_only() -> Self {
        Self::new().push(Instruction::FromQuery)
    }

    /// Starts a paginated query over rows `[begin, end)`.
    pub fn paged(begin: usize, end: usize) -> Self {
        Self::new().push(Instruction::PagedInitialQuery { begin, end })
    }

    /// Appends an arbitrary instruction.
    #[must_use]
    pub fn push(mut self, instruction: Instruction) -> Self {
        self.sequence.push(instruction);
        self
    }

    // ── Literal text ─────────────────────────────────────────────────

    /// Appends literal SQL text verbatim.
    #[must_use]
    pub fn text(self, sql: impl Into<String>) -> Self {
        self.push(Instruction::text(sql))
    }

    /// Splices a trusted raw fragment with its own parameters.
    #[must_use]
    pub fn sql(self, sql: impl Into<String>, params: Vec<Value>) -> Self {
        self.push(Instruction::sql(sql, params))
    }

    /// ` WHERE `.
    #[must_use]
    pub fn where_(self) -> Self {
        self.text(" WHERE ")
    }

    /// ` AND `.
    #[must_use]
    pub fn and(self) -> Self {
        self.text(" AND ")
    }

    /// ` OR `.
    #[must_use]
    pub fn or(self) -> Self {
        self.text(" OR ")
    }

    /// `NOT `.
    #[must_use]
    pub fn not(self) -> Self {
        self.text("NOT ")
    }

    /// `(`.
    #[must_use]
    pub fn open(self) -> Self {
        self.text("(")
    }

    /// `)`.
    #[must_use]
    pub fn close(self) -> Self {
        self.text(")")
    }

    /// ` ORDER BY `. In a paginated query use
    /// [`paged_main_order_by`](Self::paged_main_order_by) instead.
    #[must_use]
    pub fn order_by(self) -> Self {
        self.text(" ORDER BY ")
    }

    /// `, ` between list items.
    #[must_use]
    pub fn comma(self) -> Self {
        self.text(", ")
    }

    // ── Addressing ───────────────────────────────────────────────────

    /// Addresses the node found by `matchers`.
    #[must_use]
    pub fn path(self, matchers: Vec<PathMatcher>) -> Self {
        self.push(Instruction::Path(matchers))
    }

    /// Addresses the first child of the root with this entity type.
    #[must_use]
    pub fn path_entity(self, entity: impl Into<String>) -> Self {
        self.path(vec![PathMatcher::entity(entity)])
    }

    /// Addresses the root again.
    #[must_use]
    pub fn path_root(self) -> Self {
        self.push(Instruction::PathRoot)
    }

    /// Sets the separator between alias and column.
    #[must_use]
    pub fn separator(self, separator: impl Into<String>) -> Self {
        self.push(Instruction::Separator(separator.into()))
    }

    /// The bare table name of the addressed node.
    #[must_use]
    pub fn table(self) -> Self {
        self.push(Instruction::Table)
    }

    /// The projected label of the addressed node's primary key.
    #[must_use]
    pub fn id_alias(self) -> Self {
        self.push(Instruction::IdAlias)
    }

    /// The projected label of a column on the addressed node.
    #[must_use]
    pub fn column_alias(self, name: impl Into<String>) -> Self {
        self.push(Instruction::ColumnAlias { name: name.into() })
    }

    // ── Predicates ───────────────────────────────────────────────────

    /// Starts a predicate or ordering on a column of the addressed node.
    pub fn column(self, name: impl Into<String>) -> ColumnTarget {
        ColumnTarget {
            builder: self,
            target: Instruction::column(name),
        }
    }

    /// Starts a predicate or ordering on the addressed node's primary key.
    pub fn id(self) -> ColumnTarget {
        ColumnTarget {
            builder: self,
            target: Instruction::IdColumn { case_sensitive: None },
        }
    }

    /// Appends one bound parameter.
    #[must_use]
    pub fn param(self, value: impl Into<Value>) -> Self {
        self.push(Instruction::param(value))
    }

    /// `(<column> = ? OR <column> = ? ...)`, or `1 = 0` for `None` or an
    /// empty collection.
    #[must_use]
    pub fn column_in<I, V>(self, name: impl Into<String>, values: Option<I>) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.column(name).is_in(values)
    }

    /// [`column_in`](Self::column_in) on the primary key.
    #[must_use]
    pub fn id_in<I, V>(self, values: Option<I>) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.id().is_in(values)
    }

    /// Array membership using the dialect's syntax, or `1 = 0` for an empty
    /// array.
    #[must_use]
    pub fn column_in_array<I, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.column(name).in_array(values)
    }

    // ── Pagination ───────────────────────────────────────────────────

    /// Writes the main filter from here on.
    #[must_use]
    pub fn paged_main_where(self, additional_columns: Vec<String>) -> Self {
        self.push(Instruction::PagedMainWhere { additional_columns })
    }

    /// Writes the main ordering from here on.
    #[must_use]
    pub fn paged_main_order_by(self) -> Self {
        self.push(Instruction::PagedMainOrderBy)
    }

    /// Writes the HAVING clause from here on.
    #[must_use]
    pub fn paged_having(self) -> Self {
        self.push(Instruction::PagedHaving)
    }

    /// Writes the secondary filter from here on.
    #[must_use]
    pub fn paged_secondary_where(self) -> Self {
        self.push(Instruction::PagedSecondaryWhere)
    }

    /// Groups the main query by the root primary key plus `additional_columns`.
    #[must_use]
    pub fn paged_use_group_by(self, additional_columns: Vec<String>) -> Self {
        self.push(Instruction::PagedUseGroupBy { additional_columns })
    }

    // ── Output ───────────────────────────────────────────────────────

    /// Returns the instruction sequence built so far.
    pub fn build(self) -> InstructionSequence {
        self.sequence
    }

    /// Compiles with default options.
    pub fn compile(self, tree: Arc<EntityTree>, dialect: &dyn SqlDialect) -> LoomResult<Compiled> {
        self.sequence.compile(tree, dialect)
    }

    /// Compiles with explicit options.
    pub fn compile_with(
        self,
        tree: Arc<EntityTree>,
        dialect: &dyn SqlDialect,
        options: CompileOptions,
    ) -> LoomResult<Compiled> {
        self.sequence.compile_with(tree, dialect, options)
    }

    /// Compiles a query that must not be paginated.
    pub fn compile_plain(
        self,
        tree: Arc<EntityTree>,
        dialect: &dyn SqlDialect,
    ) -> LoomResult<CompiledSql> {
        self.sequence.compile_plain(tree, dialect)
    }

    /// Compiles a query that must be paginated.
    pub fn compile_paged(
        self,
        tree: Arc<EntityTree>,
        dialect: &dyn SqlDialect,
    ) -> LoomResult<PagedCompiledSql> {
        self.sequence.compile_paged(tree, dialect)
    }
}

/// A column reference waiting for its operator.
#[derive(Debug, Clone)]
#[must_use]
pub struct ColumnTarget {
    builder: QueryBuilder,
    target: Instruction,
}

impl ColumnTarget {
    /// Compares case-sensitively, using the dialect's rendering.
    pub fn case_sensitive(self) -> Self {
        self.with_case(true)
    }

    /// Compares case-insensitively, using the dialect's rendering.
    pub fn case_insensitive(self) -> Self {
        self.with_case(false)
    }

    fn with_case(mut self, sensitive: bool) -> Self {
        match &mut self.target {
            Instruction::Column { case_sensitive, .. } | Instruction::IdColumn { case_sensitive } => {
                *case_sensitive = Some(sensitive);
            }
            _ => {}
        }
        self
    }

    fn compare(self, operator: &str, value: impl Into<Value>) -> QueryBuilder {
        self.builder
            .push(self.target)
            .text(format!(" {operator} "))
            .param(value)
    }

    /// `<column> = ?`.
    pub fn eq(self, value: impl Into<Value>) -> QueryBuilder {
        self.compare("=", value)
    }

    /// `<column> <> ?`.
    pub fn ne(self, value: impl Into<Value>) -> QueryBuilder {
        self.compare("<>", value)
    }

    /// `<column> < ?`.
    pub fn lt(self, value: impl Into<Value>) -> QueryBuilder {
        self.compare("<", value)
    }

    /// `<column> <= ?`.
    pub fn le(self, value: impl Into<Value>) -> QueryBuilder {
        self.compare("<=", value)
    }

    /// `<column> > ?`.
    pub fn gt(self, value: impl Into<Value>) -> QueryBuilder {
        self.compare(">", value)
    }

    /// `<column> >= ?`.
    pub fn ge(self, value: impl Into<Value>) -> QueryBuilder {
        self.compare(">=", value)
    }

    /// `<column> LIKE ?`.
    pub fn like(self, pattern: impl Into<String>) -> QueryBuilder {
        self.builder
            .push(self.target)
            .text(" LIKE ")
            .push(Instruction::StringParam(pattern.into()))
    }

    /// `<column> IS NULL`.
    pub fn is_null(self) -> QueryBuilder {
        self.builder.push(self.target).text(" IS NULL")
    }

    /// `<column> IS NOT NULL`.
    pub fn is_not_null(self) -> QueryBuilder {
        self.builder.push(self.target).text(" IS NOT NULL")
    }

    /// `(<column> = ? OR ...)` over the values, or `1 = 0` for `None` or
    /// no values.
    pub fn is_in<I, V>(self, values: Option<I>) -> QueryBuilder
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().flatten().map(Into::into).collect();
        if values.is_empty() {
            return self.builder.text("1 = 0");
        }
        let mut builder = self.builder.open();
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                builder = builder.or();
            }
            builder = builder.push(self.target.clone()).text(" = ").param(value);
        }
        builder.close()
    }

    /// `<column> <dialect array membership>`, or `1 = 0` for no values.
    pub fn in_array<I, V>(self, values: I) -> QueryBuilder
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return self.builder.text("1 = 0");
        }
        self.builder.push(self.target).push(Instruction::ArrayParam(values))
    }

    /// `<column> ASC`.
    pub fn asc(self) -> QueryBuilder {
        self.builder.push(self.target).text(" ASC")
    }

    /// `<column> DESC`.
    pub fn desc(self) -> QueryBuilder {
        self.builder.push(self.target).text(" DESC")
    }

    /// The bare column reference, without an operator.
    pub fn done(self) -> QueryBuilder {
        self.builder.push(self.target)
    }
}
