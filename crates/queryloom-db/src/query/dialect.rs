//! The SQL dialect contract.
//!
//! A [`SqlDialect`] knows the database-specific spellings the compiler
//! cannot decide on its own: case-(in)sensitive column comparisons, array
//! membership, how a `[begin, end)` row window becomes bindable parameters,
//! and how the four paginated fragments fuse into a page query and a count
//! query.
//!
//! The paged builders have default implementations that only depend on
//! [`range_clause`](SqlDialect::range_clause); dialects override them when
//! their pagination idiom differs structurally.
//!
//! ## Placeholder order contract
//!
//! The SQL returned by [`build_paged_query`](SqlDialect::build_paged_query)
//! must contain its placeholders in this order:
//!
//! 1. the skeleton's own main parameters,
//! 2. the main WHERE fragment,
//! 3. the HAVING fragment,
//! 4. exactly two range placeholders,
//! 5. the skeleton's own secondary parameters,
//! 6. the secondary WHERE fragment.
//!
//! The count query contains 1–3 only. The compiler assembles the parameter
//! lists in exactly that order.

use crate::mapping::EntityTree;
use crate::value::Value;

use super::criteria::QueryCriteria;

/// A rendered SQL fragment together with the parameters its placeholders bind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedSql {
    /// The SQL text.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<Value>,
}

impl RenderedSql {
    /// Creates a fragment from text and parameters.
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A fragment without parameters.
    pub fn text(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// The page query skeleton returned by [`SqlDialect::build_paged_query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagedSkeleton {
    /// The complete page SQL, fragments included.
    pub sql: String,
    /// Parameters the skeleton itself introduces before the main WHERE.
    pub main_params: Vec<Value>,
    /// Parameters the skeleton itself introduces after the range.
    pub secondary_params: Vec<Value>,
}

/// The count query skeleton returned by [`SqlDialect::build_count_query`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountSkeleton {
    /// The complete count SQL, fragments included.
    pub sql: String,
    /// Parameters the skeleton itself introduces before the main WHERE.
    pub main_params: Vec<Value>,
}

/// Database-specific SQL rendering used by the instruction compiler.
pub trait SqlDialect: Send + Sync {
    /// A short vendor name, e.g. `sqlite`.
    fn name(&self) -> &'static str;

    /// The full SELECT for the tree, used by `INITIAL_QUERY`.
    fn render_base_query(&self, tree: &EntityTree) -> RenderedSql {
        tree.render_select()
    }

    /// The FROM clause for the tree, used by `FROM_QUERY`.
    fn render_from_only(&self, tree: &EntityTree) -> RenderedSql {
        tree.render_from()
    }

    /// A column reference compared case-sensitively.
    fn case_sensitive_column(&self, alias: &str, separator: &str, column: &str) -> String;

    /// A column reference compared case-insensitively.
    fn case_insensitive_column(&self, alias: &str, separator: &str, column: &str) -> String;

    /// The array-membership predicate tail, e.g. `= ANY(?)`. Must contain
    /// exactly one placeholder, bound to the whole array.
    fn in_array_sql(&self) -> &'static str;

    /// The two-placeholder range clause appended to the main query, e.g.
    /// `LIMIT ?, ?`.
    fn range_clause(&self) -> &'static str;

    /// Converts a half-open `[begin, end)` window into the two parameters
    /// bound to [`range_clause`](SqlDialect::range_clause), begin-derived
    /// first.
    fn range_transformation_params(&self, begin: usize, end: usize) -> [Value; 2] {
        [Value::from_index(begin), Value::from_index(end.saturating_sub(begin))]
    }

    /// Fuses the paginated fragments into the page query.
    ///
    /// The default shape pages root ids in a derived table and joins the
    /// whole tree back onto them:
    ///
    /// ```text
    /// SELECT <tree columns>
    /// FROM (SELECT DISTINCT r.id AS r_id, <extra> FROM <tree joins>
    ///       WHERE (<main>) GROUP BY ... HAVING <having> ORDER BY <order> <range>) page_ids
    /// INNER JOIN <root table> r ON r.id = page_ids.r_id <tree joins>
    /// WHERE (<secondary>) ORDER BY <order>
    /// ```
    fn build_paged_query(&self, criteria: &QueryCriteria) -> PagedSkeleton {
        let tree = criteria.tree();
        let root = tree.root_node();
        let from = tree.render_from();
        let joins = tree.render_joins();

        let mut inner = id_subquery(criteria, &from.sql, true);
        if !criteria.main_order_by().is_empty() {
            inner.push_str(" ORDER BY ");
            inner.push_str(criteria.main_order_by());
        }
        inner.push(' ');
        inner.push_str(self.range_clause());

        let pk = root.primary_key();
        let mut sql = format!(
            "SELECT {} FROM ({inner}) page_ids INNER JOIN {} {} ON {} = page_ids.{}",
            tree.render_select_list(),
            root.table_name(),
            root.table_alias(),
            root.qualified(pk),
            root.column_label(pk),
        );
        if !joins.sql.is_empty() {
            sql.push(' ');
            sql.push_str(&joins.sql);
        }
        if !criteria.secondary_where().is_empty() {
            sql.push_str(&format!(" WHERE ({})", criteria.secondary_where()));
        }
        if !criteria.main_order_by().is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(criteria.main_order_by());
        }

        PagedSkeleton {
            sql,
            main_params: from.params,
            secondary_params: joins.params,
        }
    }

    /// Fuses the main fragments into a query counting distinct root rows.
    /// Ordering, the range, and the secondary filter do not affect a count.
    fn build_count_query(&self, criteria: &QueryCriteria) -> CountSkeleton {
        let from = criteria.tree().render_from();
        CountSkeleton {
            sql: format!(
                "SELECT COUNT(*) FROM ({}) count_ids",
                id_subquery(criteria, &from.sql, false)
            ),
            main_params: from.params,
        }
    }
}

/// `SELECT [DISTINCT] <root pk> [, extra] <from> [WHERE ..] [GROUP BY ..] [HAVING ..]`.
///
/// Grouping replaces DISTINCT when the criteria ask for it.
pub fn id_subquery(
    criteria: &QueryCriteria,
    from_sql: &str,
    with_additional_columns: bool,
) -> String {
    let root = criteria.tree().root_node();
    let pk = root.primary_key();

    let mut projection = vec![format!("{} AS {}", root.qualified(pk), root.column_label(pk))];
    if with_additional_columns {
        projection.extend(criteria.main_additional_columns().iter().cloned());
    }

    let distinct = if criteria.use_group_by() { "" } else { "DISTINCT " };
    let mut sql = format!("SELECT {distinct}{} {from_sql}", projection.join(", "));

    if !criteria.main_where().is_empty() {
        sql.push_str(&format!(" WHERE ({})", criteria.main_where()));
    }
    if criteria.use_group_by() {
        let mut group_by = vec![root.qualified(pk)];
        group_by.extend(criteria.group_by_additional_columns().iter().cloned());
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_by.join(", "));
    }
    if !criteria.having().is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(criteria.having());
    }
    sql
}
