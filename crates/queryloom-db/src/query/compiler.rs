//! The instruction compiler.
//!
//! [`InstructionSequence::compile`] walks the instructions once, in order,
//! appending SQL text and parameters to one of four accumulators. A plain
//! query only ever uses the main accumulator. A paginated query (one that
//! starts with `PAGED_INITIAL_QUERY`) switches between all four and, at the
//! end, hands their text to the [`SqlDialect`] to build a page query and a
//! count query.
//!
//! Within an accumulator, text and parameters are appended together, so the
//! placeholder order always matches the parameter order. Across
//! accumulators, the final parameter lists are assembled in a fixed order:
//!
//! - page: skeleton main, main WHERE, HAVING, range (2), skeleton secondary,
//!   secondary WHERE
//! - count: skeleton main, main WHERE, HAVING

use std::sync::Arc;

use queryloom_core::logging::compile_span;
use queryloom_core::{LoomError, LoomResult, Settings};
use tracing::{debug, trace, warn};

use super::compiled::{count_placeholders, Compiled, CompiledSql, PagedCompiledSql};
use super::criteria::QueryCriteria;
use super::dialect::SqlDialect;
use super::instruction::{Instruction, InstructionKind};
use super::path::resolve_path;
use crate::mapping::{EntityTree, NodeId};
use crate::value::Value;

/// One of the four SQL buffers a compile writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    /// The query body; for a paged query, the main WHERE fragment.
    Main,
    /// The paged main ORDER BY fragment.
    MainOrderBy,
    /// The paged HAVING fragment.
    Having,
    /// The paged secondary WHERE fragment.
    Secondary,
}

impl Accumulator {
    const COUNT: usize = 4;

    const fn index(self) -> usize {
        match self {
            Self::Main => 0,
            Self::MainOrderBy => 1,
            Self::Having => 2,
            Self::Secondary => 3,
        }
    }
}

#[derive(Debug, Default)]
struct Buffer {
    sql: String,
    params: Vec<Value>,
}

impl Buffer {
    fn push_str(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Appends a trimmed fragment, separated by one space from what precedes it.
    fn splice(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return;
        }
        if !self.sql.is_empty() && !self.sql.ends_with(char::is_whitespace) {
            self.sql.push(' ');
        }
        self.sql.push_str(fragment);
    }

    fn push_param(&mut self, value: Value) {
        self.sql.push('?');
        self.params.push(value);
    }
}

/// Options that change how strictly a compile checks its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Fail with [`LoomError::ParameterMismatch`] instead of logging a
    /// warning when placeholder and parameter counts differ.
    pub strict_parameter_check: bool,
}

impl CompileOptions {
    /// Reads the options from settings.
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            strict_parameter_check: settings.strict_parameter_check,
        }
    }

    /// Enables or disables the strict parity check.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict_parameter_check = strict;
        self
    }
}

/// An ordered list of instructions for one logical query.
///
/// A sequence is built once, compiled once, and discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionSequence {
    instructions: Vec<Instruction>,
}

impl InstructionSequence {
    /// Creates an empty sequence.
    pub const fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// Appends an instruction.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// The number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the sequence has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterates over the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Compiles with default options.
    pub fn compile(self, tree: Arc<EntityTree>, dialect: &dyn SqlDialect) -> LoomResult<Compiled> {
        self.compile_with(tree, dialect, CompileOptions::default())
    }

    /// Compiles a sequence that must not be paginated.
    pub fn compile_plain(
        self,
        tree: Arc<EntityTree>,
        dialect: &dyn SqlDialect,
    ) -> LoomResult<CompiledSql> {
        self.compile(tree, dialect)?.into_plain()
    }

    /// Compiles a sequence that must be paginated.
    pub fn compile_paged(
        self,
        tree: Arc<EntityTree>,
        dialect: &dyn SqlDialect,
    ) -> LoomResult<PagedCompiledSql> {
        self.compile(tree, dialect)?.into_paged()
    }

    /// Compiles the sequence against an entity tree and a dialect.
    ///
    /// # Errors
    ///
    /// - [`LoomError::InitializationError`] if no initializer is present.
    /// - [`LoomError::PathError`] / [`LoomError::UnjoinedEntity`] if a path
    ///   does not resolve to a joined node.
    /// - [`LoomError::UsageError`] for a second initializer, an inverted
    ///   page window, a paged switch outside a paged query, parameters in
    ///   the paged ORDER BY, or a `SQL` fragment whose placeholder count
    ///   differs from its parameter count.
    /// - [`LoomError::ParameterMismatch`] in strict mode, if the output
    ///   breaks placeholder/parameter parity.
    pub fn compile_with(
        self,
        tree: Arc<EntityTree>,
        dialect: &dyn SqlDialect,
        options: CompileOptions,
    ) -> LoomResult<Compiled> {
        let span = compile_span(tree.root_node().entity());
        let _enter = span.enter();
        debug!(instructions = self.instructions.len(), dialect = dialect.name(), "compiling");

        let mut state = CompileState::new(&tree, dialect);
        for instruction in self.instructions {
            trace!(kind = %instruction.kind(), accumulator = ?state.current, "instruction");
            state.apply(instruction)?;
        }

        let compiled = state.finish(Arc::clone(&tree))?;
        match &compiled {
            Compiled::Plain(plain) => {
                check_parity("query", plain.sql(), plain.params().len(), options)?;
                debug!(paginated = false, params = plain.params().len(), "compiled");
            }
            Compiled::Paged(paged) => {
                check_parity("query", paged.sql(), paged.params().len(), options)?;
                check_parity("count query", paged.count_sql(), paged.count_params().len(), options)?;
                debug!(
                    paginated = true,
                    params = paged.params().len(),
                    count_params = paged.count_params().len(),
                    "compiled"
                );
            }
        }
        Ok(compiled)
    }
}

impl FromIterator<Instruction> for InstructionSequence {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl Extend<Instruction> for InstructionSequence {
    fn extend<I: IntoIterator<Item = Instruction>>(&mut self, iter: I) {
        self.instructions.extend(iter);
    }
}

impl IntoIterator for InstructionSequence {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

fn check_parity(
    context: &'static str,
    sql: &str,
    params: usize,
    options: CompileOptions,
) -> LoomResult<()> {
    let placeholders = count_placeholders(sql);
    if placeholders == params {
        return Ok(());
    }
    if options.strict_parameter_check {
        return Err(LoomError::ParameterMismatch {
            context,
            placeholders,
            params,
        });
    }
    warn!(context, placeholders, params, "placeholder count differs from parameter count");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct PageWindow {
    begin: usize,
    end: usize,
}

struct CompileState<'a> {
    tree: &'a EntityTree,
    dialect: &'a dyn SqlDialect,
    buffers: [Buffer; Accumulator::COUNT],
    current: Accumulator,
    active_node: NodeId,
    separator: String,
    initializer: Option<InstructionKind>,
    page: Option<PageWindow>,
    main_additional_columns: Vec<String>,
    use_group_by: bool,
    group_by_additional_columns: Vec<String>,
}

impl<'a> CompileState<'a> {
    fn new(tree: &'a EntityTree, dialect: &'a dyn SqlDialect) -> Self {
        Self {
            tree,
            dialect,
            buffers: Default::default(),
            current: Accumulator::Main,
            active_node: tree.root(),
            separator: ".".to_string(),
            initializer: None,
            page: None,
            main_additional_columns: Vec::new(),
            use_group_by: false,
            group_by_additional_columns: Vec::new(),
        }
    }

    fn buffer(&mut self) -> &mut Buffer {
        &mut self.buffers[self.current.index()]
    }

    fn take(&mut self, accumulator: Accumulator) -> Buffer {
        std::mem::take(&mut self.buffers[accumulator.index()])
    }

    fn initialize(&mut self, kind: InstructionKind) -> LoomResult<()> {
        if let Some(previous) = self.initializer {
            return Err(LoomError::UsageError(format!(
                "{kind} after {previous}: a query has exactly one initializer"
            )));
        }
        self.initializer = Some(kind);
        Ok(())
    }

    fn switch_to(&mut self, accumulator: Accumulator, kind: InstructionKind) -> LoomResult<()> {
        if self.page.is_none() {
            return Err(LoomError::UsageError(format!(
                "{kind} is only valid after PAGED_INITIAL_QUERY"
            )));
        }
        self.current = accumulator;
        self.active_node = self.tree.root();
        Ok(())
    }

    fn render_column(&self, column: &str, case_sensitive: Option<bool>) -> String {
        let alias = self.tree.node(self.active_node).table_alias();
        match case_sensitive {
            None => format!("{alias}{}{column}", self.separator),
            Some(true) => self.dialect.case_sensitive_column(alias, &self.separator, column),
            Some(false) => self.dialect.case_insensitive_column(alias, &self.separator, column),
        }
    }

    fn render_alias(&self, column: &str) -> String {
        self.tree.node(self.active_node).column_label(column)
    }

    fn apply(&mut self, instruction: Instruction) -> LoomResult<()> {
        let kind = instruction.kind();
        match instruction {
            Instruction::InitialQuery => {
                self.initialize(kind)?;
                let base = self.dialect.render_base_query(self.tree);
                let buffer = self.buffer();
                buffer.splice(&base.sql);
                buffer.params.extend(base.params);
            }
            Instruction::FromQuery => {
                self.initialize(kind)?;
                let from = self.dialect.render_from_only(self.tree);
                let buffer = self.buffer();
                buffer.splice(&from.sql);
                buffer.params.extend(from.params);
            }
            Instruction::PagedInitialQuery { begin, end } => {
                self.initialize(kind)?;
                if end < begin {
                    return Err(LoomError::UsageError(format!(
                        "page window [{begin}, {end}) ends before it begins"
                    )));
                }
                self.page = Some(PageWindow { begin, end });
                self.active_node = self.tree.root();
            }
            Instruction::PagedMainWhere { additional_columns } => {
                self.switch_to(Accumulator::Main, kind)?;
                self.main_additional_columns.extend(additional_columns);
            }
            Instruction::PagedMainOrderBy => self.switch_to(Accumulator::MainOrderBy, kind)?,
            Instruction::PagedHaving => self.switch_to(Accumulator::Having, kind)?,
            Instruction::PagedSecondaryWhere => self.switch_to(Accumulator::Secondary, kind)?,
            Instruction::PagedUseGroupBy { additional_columns } => {
                if self.page.is_none() {
                    return Err(LoomError::UsageError(format!(
                        "{kind} is only valid after PAGED_INITIAL_QUERY"
                    )));
                }
                self.use_group_by = true;
                self.group_by_additional_columns.extend(additional_columns);
                self.active_node = self.tree.root();
            }
            Instruction::Path(matchers) => {
                self.active_node = resolve_path(self.tree, &matchers)?;
            }
            Instruction::PathRoot => self.active_node = self.tree.root(),
            Instruction::Separator(separator) => self.separator = separator,
            Instruction::Text(text) => self.buffer().push_str(&text),
            Instruction::IdColumn { case_sensitive } => {
                let pk = self.tree.node(self.active_node).primary_key().to_string();
                let sql = self.render_column(&pk, case_sensitive);
                self.buffer().push_str(&sql);
            }
            Instruction::Column { name, case_sensitive } => {
                let sql = self.render_column(&name, case_sensitive);
                self.buffer().push_str(&sql);
            }
            Instruction::IdAlias => {
                let pk = self.tree.node(self.active_node).primary_key().to_string();
                let sql = self.render_alias(&pk);
                self.buffer().push_str(&sql);
            }
            Instruction::ColumnAlias { name } => {
                let sql = self.render_alias(&name);
                self.buffer().push_str(&sql);
            }
            Instruction::Param(value) => self.buffer().push_param(value),
            Instruction::StringParam(value) => self.buffer().push_param(Value::String(value)),
            Instruction::ArrayParam(values) => {
                let in_array = self.dialect.in_array_sql();
                let buffer = self.buffer();
                buffer.splice(in_array);
                buffer.params.push(Value::List(values));
            }
            Instruction::Sql { sql, params } => {
                let placeholders = count_placeholders(&sql);
                if placeholders != params.len() {
                    return Err(LoomError::UsageError(format!(
                        "{kind} fragment {:?} has {placeholders} placeholder(s) but binds {} parameter(s)",
                        sql.trim(),
                        params.len()
                    )));
                }
                let buffer = self.buffer();
                buffer.splice(&sql);
                buffer.params.extend(params);
            }
            Instruction::Table => {
                let table = self.tree.node(self.active_node).table_name().to_string();
                self.buffer().push_str(&table);
            }
        }
        Ok(())
    }

    fn finish(mut self, tree: Arc<EntityTree>) -> LoomResult<Compiled> {
        if self.initializer.is_none() {
            return Err(LoomError::InitializationError(format!(
                "query on '{}' has no INITIAL_QUERY, FROM_QUERY or PAGED_INITIAL_QUERY",
                self.tree.root_node().entity()
            )));
        }

        let Some(window) = self.page else {
            let main = self.take(Accumulator::Main);
            return Ok(Compiled::Plain(CompiledSql::new(tree, main.sql.trim(), main.params)));
        };

        let main = self.take(Accumulator::Main);
        let order_by = self.take(Accumulator::MainOrderBy);
        let having = self.take(Accumulator::Having);
        let secondary = self.take(Accumulator::Secondary);

        if !order_by.params.is_empty() {
            return Err(LoomError::UsageError(format!(
                "paged ORDER BY on '{}' binds {} parameter(s); ordering must not take parameters",
                tree.root_node().entity(),
                order_by.params.len()
            )));
        }

        let mut criteria = QueryCriteria::new(Arc::clone(&tree))
            .with_main_additional_columns(std::mem::take(&mut self.main_additional_columns))
            .with_main_where(main.sql)
            .with_having(having.sql)
            .with_main_order_by(order_by.sql)
            .with_secondary_where(secondary.sql);
        if self.use_group_by {
            criteria = criteria.with_group_by(std::mem::take(&mut self.group_by_additional_columns));
        }

        let page = self.dialect.build_paged_query(&criteria);
        let count = self.dialect.build_count_query(&criteria);

        let mut page_params = page.main_params;
        page_params.extend(main.params.iter().cloned());
        page_params.extend(having.params.iter().cloned());
        page_params.extend(self.dialect.range_transformation_params(window.begin, window.end));
        page_params.extend(page.secondary_params);
        page_params.extend(secondary.params);

        let mut count_params = count.main_params;
        count_params.extend(main.params);
        count_params.extend(having.params);

        Ok(Compiled::Paged(PagedCompiledSql::new(
            CompiledSql::new(tree, page.sql, page_params),
            count.sql,
            count_params,
            window.begin,
            window.end,
        )))
    }
}
