//! Compiler instructions.
//!
//! An [`Instruction`] is one step of a query build. The front-end appends
//! instructions in call order, and the compiler replays them in that same
//! order; the order of instructions is the order of the generated SQL.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::path::PathMatcher;
use crate::value::Value;

/// One build step, with exactly the payload its kind needs.
///
/// In JSON plans, instructions are written as
/// `{"kind": "COLUMN", "value": {"name": "total"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    /// Render the full SELECT for the entity tree.
    InitialQuery,
    /// Render only the FROM clause for the entity tree.
    FromQuery,
    /// Start a paginated query over rows `[begin, end)`.
    PagedInitialQuery {
        /// First row, 0-based.
        begin: usize,
        /// One past the last row.
        end: usize,
    },
    /// Switch to the main WHERE fragment.
    PagedMainWhere {
        /// Extra columns the main query must project.
        #[serde(default)]
        additional_columns: Vec<String>,
    },
    /// Switch to the main ORDER BY fragment.
    PagedMainOrderBy,
    /// Switch to the secondary WHERE fragment.
    PagedSecondaryWhere,
    /// Group the main query instead of using DISTINCT.
    PagedUseGroupBy {
        /// Extra GROUP BY columns after the root primary key.
        #[serde(default)]
        additional_columns: Vec<String>,
    },
    /// Switch to the HAVING fragment.
    PagedHaving,
    /// Address the node found by these matchers.
    Path(Vec<PathMatcher>),
    /// Address the root node.
    PathRoot,
    /// Set the alias/column separator for column references.
    Separator(String),
    /// Literal SQL text.
    #[serde(rename = "STRING")]
    Text(String),
    /// `<alias><separator><primary key>`.
    IdColumn {
        /// Compare case-sensitively (`Some(true)`) or not (`Some(false)`).
        #[serde(default)]
        case_sensitive: Option<bool>,
    },
    /// `<alias><column alias separator><primary key>`.
    IdAlias,
    /// `<alias><separator><name>`.
    Column {
        /// The column name.
        name: String,
        /// Compare case-sensitively (`Some(true)`) or not (`Some(false)`).
        #[serde(default)]
        case_sensitive: Option<bool>,
    },
    /// `<alias><column alias separator><name>`.
    ColumnAlias {
        /// The column name.
        name: String,
    },
    /// A bound value.
    Param(Value),
    /// A bound string value.
    StringParam(String),
    /// A bound array, rendered with the dialect's array-membership syntax.
    ArrayParam(Vec<Value>),
    /// A trusted raw fragment with its own parameters.
    Sql {
        /// The SQL text.
        sql: String,
        /// Parameters for the fragment's placeholders.
        #[serde(default)]
        params: Vec<Value>,
    },
    /// The bare table name of the addressed node.
    Table,
}

/// The kind of an [`Instruction`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    /// Full SELECT skeleton for the tree.
    InitialQuery,
    /// FROM clause skeleton for the tree.
    FromQuery,
    /// Starts a paginated query over a row window.
    PagedInitialQuery,
    /// Switches to the main WHERE accumulator.
    PagedMainWhere,
    /// Switches to the main ORDER BY accumulator.
    PagedMainOrderBy,
    /// Switches to the secondary WHERE accumulator.
    PagedSecondaryWhere,
    /// Groups the main query instead of using DISTINCT.
    PagedUseGroupBy,
    /// Switches to the HAVING accumulator.
    PagedHaving,
    /// Moves the active node along a path.
    Path,
    /// Resets the active node to the root.
    PathRoot,
    /// Sets the alias/column separator.
    Separator,
    /// Literal SQL text.
    Text,
    /// The active node's primary key column.
    IdColumn,
    /// The active node's primary key label.
    IdAlias,
    /// A column of the active node.
    Column,
    /// A column label of the active node.
    ColumnAlias,
    /// A bound parameter.
    Param,
    /// A bound string parameter.
    StringParam,
    /// An array bound as one parameter.
    ArrayParam,
    /// A raw fragment with its own parameters.
    Sql,
    /// The active node's table name.
    Table,
}

impl InstructionKind {
    /// Whether this kind starts a query.
    pub const fn is_initializer(self) -> bool {
        matches!(self, Self::InitialQuery | Self::FromQuery | Self::PagedInitialQuery)
    }

    /// The canonical upper-case name, e.g. `PAGED_MAIN_WHERE`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::InitialQuery => "INITIAL_QUERY",
            Self::FromQuery => "FROM_QUERY",
            Self::PagedInitialQuery => "PAGED_INITIAL_QUERY",
            Self::PagedMainWhere => "PAGED_MAIN_WHERE",
            Self::PagedMainOrderBy => "PAGED_MAIN_ORDER_BY",
            Self::PagedSecondaryWhere => "PAGED_SECONDARY_WHERE",
            Self::PagedUseGroupBy => "PAGED_USE_GROUP_BY",
            Self::PagedHaving => "PAGED_HAVING",
            Self::Path => "PATH",
            Self::PathRoot => "PATH_ROOT",
            Self::Separator => "SEPARATOR",
            Self::Text => "STRING",
            Self::IdColumn => "ID_COLUMN",
            Self::IdAlias => "ID_ALIAS",
            Self::Column => "COLUMN",
            Self::ColumnAlias => "COLUMN_ALIAS",
            Self::Param => "PARAM",
            Self::StringParam => "STRING_PARAM",
            Self::ArrayParam => "ARRAY_PARAM",
            Self::Sql => "SQL",
            Self::Table => "TABLE",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Instruction {
    /// Returns the payload-free kind.
    pub const fn kind(&self) -> InstructionKind {
        match self {
            Self::InitialQuery => InstructionKind::InitialQuery,
            Self::FromQuery => InstructionKind::FromQuery,
            Self::PagedInitialQuery { .. } => InstructionKind::PagedInitialQuery,
            Self::PagedMainWhere { .. } => InstructionKind::PagedMainWhere,
            Self::PagedMainOrderBy => InstructionKind::PagedMainOrderBy,
            Self::PagedSecondaryWhere => InstructionKind::PagedSecondaryWhere,
            Self::PagedUseGroupBy { .. } => InstructionKind::PagedUseGroupBy,
            Self::PagedHaving => InstructionKind::PagedHaving,
            Self::Path(_) => InstructionKind::Path,
            Self::PathRoot => InstructionKind::PathRoot,
            Self::Separator(_) => InstructionKind::Separator,
            Self::Text(_) => InstructionKind::Text,
            Self::IdColumn { .. } => InstructionKind::IdColumn,
            Self::IdAlias => InstructionKind::IdAlias,
            Self::Column { .. } => InstructionKind::Column,
            Self::ColumnAlias { .. } => InstructionKind::ColumnAlias,
            Self::Param(_) => InstructionKind::Param,
            Self::StringParam(_) => InstructionKind::StringParam,
            Self::ArrayParam(_) => InstructionKind::ArrayParam,
            Self::Sql { .. } => InstructionKind::Sql,
            Self::Table => InstructionKind::Table,
        }
    }

    /// A literal text instruction.
    pub fn text(sql: impl Into<String>) -> Self {
        Self::Text(sql.into())
    }

    /// A plain column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column {
            name: name.into(),
            case_sensitive: None,
        }
    }

    /// A bound value.
    pub fn param(value: impl Into<Value>) -> Self {
        Self::Param(value.into())
    }

    /// A raw fragment with parameters.
    pub fn sql(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Sql {
            sql: sql.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Instruction::text("x").kind().to_string(), "STRING");
        assert_eq!(Instruction::PagedMainOrderBy.kind().name(), "PAGED_MAIN_ORDER_BY");
        assert_eq!(Instruction::column("a").kind(), InstructionKind::Column);
    }

    #[test]
    fn test_initializer_kinds() {
        assert!(InstructionKind::InitialQuery.is_initializer());
        assert!(InstructionKind::FromQuery.is_initializer());
        assert!(InstructionKind::PagedInitialQuery.is_initializer());
        assert!(!InstructionKind::PagedMainWhere.is_initializer());
        assert!(!InstructionKind::Param.is_initializer());
    }

    #[test]
    fn test_json_kind_tags_match_names() {
        let instructions = vec![
            Instruction::InitialQuery,
            Instruction::text("WHERE "),
            Instruction::column("status"),
            Instruction::param("open"),
            Instruction::PagedInitialQuery { begin: 0, end: 10 },
        ];
        for instruction in instructions {
            let json = serde_json::to_value(&instruction).unwrap();
            assert_eq!(json["kind"], instruction.kind().name());
        }
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let parsed: Vec<Instruction> = serde_json::from_str(
            r#"[
                {"kind": "PAGED_MAIN_WHERE", "value": {}},
                {"kind": "ID_COLUMN", "value": {}},
                {"kind": "SQL", "value": {"sql": "o.total > 0"}},
                {"kind": "PATH", "value": [{"match": "entity", "value": "Customer"}]},
                {"kind": "PATH_ROOT"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            vec![
                Instruction::PagedMainWhere {
                    additional_columns: vec![]
                },
                Instruction::IdColumn {
                    case_sensitive: None
                },
                Instruction::sql("o.total > 0", vec![]),
                Instruction::Path(vec![PathMatcher::entity("Customer")]),
                Instruction::PathRoot,
            ]
        );
    }
}
