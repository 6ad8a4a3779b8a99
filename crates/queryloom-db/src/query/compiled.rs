//! Compiled query results.
//!
//! Every compiled query upholds one invariant: the `?` placeholders in its
//! SQL text, read left to right, correspond one-to-one with its parameter
//! list. A paged result upholds it separately for the page query and the
//! count query.

use std::fmt;
use std::sync::Arc;

use queryloom_core::{LoomError, LoomResult};

use crate::mapping::{EntityNode, EntityTree};
use crate::value::Value;

/// SQL text plus positional parameters, scoped to one entity tree.
#[derive(Debug, Clone)]
pub struct CompiledSql {
    tree: Arc<EntityTree>,
    sql: String,
    params: Vec<Value>,
}

impl CompiledSql {
    /// Creates a compiled query.
    pub fn new(tree: Arc<EntityTree>, sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            tree,
            sql: sql.into(),
            params,
        }
    }

    /// The entity tree the query was compiled against.
    pub fn tree(&self) -> &EntityTree {
        &self.tree
    }

    /// The root entity of the query.
    pub fn root(&self) -> &EntityNode {
        self.tree.root_node()
    }

    /// The SQL text with `?` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// The number of `?` placeholders outside quoted text.
    pub fn placeholder_count(&self) -> usize {
        count_placeholders(&self.sql)
    }

    /// The SQL text with `?` rewritten to `$1, $2, ...`.
    pub fn numbered_sql(&self) -> String {
        number_placeholders(&self.sql)
    }

    /// Splits into SQL text and parameters.
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

impl fmt::Display for CompiledSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// A page query paired with a count query over the same filter.
#[derive(Debug, Clone)]
pub struct PagedCompiledSql {
    page: CompiledSql,
    count_sql: String,
    count_params: Vec<Value>,
    begin: usize,
    end: usize,
}

impl PagedCompiledSql {
    /// Creates a paged result for the row window `[begin, end)`.
    pub fn new(
        page: CompiledSql,
        count_sql: impl Into<String>,
        count_params: Vec<Value>,
        begin: usize,
        end: usize,
    ) -> Self {
        Self {
            page,
            count_sql: count_sql.into(),
            count_params,
            begin,
            end,
        }
    }

    /// The page query.
    pub const fn page(&self) -> &CompiledSql {
        &self.page
    }

    /// The page SQL text.
    pub fn sql(&self) -> &str {
        self.page.sql()
    }

    /// The page parameters.
    pub fn params(&self) -> &[Value] {
        self.page.params()
    }

    /// The count SQL text.
    pub fn count_sql(&self) -> &str {
        &self.count_sql
    }

    /// The count parameters.
    pub fn count_params(&self) -> &[Value] {
        &self.count_params
    }

    /// The count SQL with `?` rewritten to `$1, $2, ...`.
    pub fn numbered_count_sql(&self) -> String {
        number_placeholders(&self.count_sql)
    }

    /// First row of the window.
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// One past the last row of the window.
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Splits into the page query and the count query.
    pub fn into_parts(self) -> (CompiledSql, CompiledSql) {
        let count = CompiledSql::new(Arc::clone(&self.page.tree), self.count_sql, self.count_params);
        (self.page, count)
    }
}

/// The result of compiling an instruction sequence.
#[derive(Debug, Clone)]
pub enum Compiled {
    /// A single query.
    Plain(CompiledSql),
    /// A page query plus a count query.
    Paged(PagedCompiledSql),
}

impl Compiled {
    /// Whether the sequence contained a paginated initializer.
    pub const fn is_paged(&self) -> bool {
        matches!(self, Self::Paged(_))
    }

    /// The main SQL text: the plain query, or the page query.
    pub fn sql(&self) -> &str {
        match self {
            Self::Plain(compiled) => compiled.sql(),
            Self::Paged(paged) => paged.sql(),
        }
    }

    /// The main parameters.
    pub fn params(&self) -> &[Value] {
        match self {
            Self::Plain(compiled) => compiled.params(),
            Self::Paged(paged) => paged.params(),
        }
    }

    /// Returns the plain result, or a usage error for a paginated one.
    pub fn into_plain(self) -> LoomResult<CompiledSql> {
        match self {
            Self::Plain(compiled) => Ok(compiled),
            Self::Paged(paged) => Err(LoomError::UsageError(format!(
                "query on '{}' is paginated; read it as a paged result",
                paged.page().root().entity()
            ))),
        }
    }

    /// Returns the paged result, or a usage error for a plain one.
    pub fn into_paged(self) -> LoomResult<PagedCompiledSql> {
        match self {
            Self::Paged(paged) => Ok(paged),
            Self::Plain(compiled) => Err(LoomError::UsageError(format!(
                "query on '{}' has no PAGED_INITIAL_QUERY; read it as a plain result",
                compiled.root().entity()
            ))),
        }
    }
}

/// Counts `?` placeholders, skipping those inside `'...'`, `"..."` and
/// `` `...` `` quoted text, `-- ...` line comments and `/* ... */` block
/// comments.
pub fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |token| {
        if token == Token::Placeholder {
            count += 1;
        }
    });
    count
}

/// Rewrites each placeholder to `$n`, numbering from 1.
fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0usize;
    scan(sql, |token| match token {
        Token::Placeholder => {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        }
        Token::Char(c) => out.push(c),
    });
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Placeholder,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

fn scan(sql: &str, mut f: impl FnMut(Token)) {
    let mut region = Region::Code;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match region {
            // A doubled quote closes and reopens, which keeps us inside.
            Region::Quoted(q) if c == q => region = Region::Code,
            Region::LineComment if c == '\n' => region = Region::Code,
            Region::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                f(Token::Char(c));
                chars.next();
                f(Token::Char('/'));
                region = Region::Code;
                continue;
            }
            Region::Quoted(_) | Region::LineComment | Region::BlockComment => {}
            Region::Code => match c {
                '\'' | '"' | '`' => region = Region::Quoted(c),
                '?' => {
                    f(Token::Placeholder);
                    continue;
                }
                '-' | '/' => {
                    let opener = if c == '-' { '-' } else { '*' };
                    if chars.peek() == Some(&opener) {
                        f(Token::Char(c));
                        chars.next();
                        f(Token::Char(opener));
                        region = if c == '-' { Region::LineComment } else { Region::BlockComment };
                        continue;
                    }
                }
                _ => {}
            },
        }
        f(Token::Char(c));
    }
}
