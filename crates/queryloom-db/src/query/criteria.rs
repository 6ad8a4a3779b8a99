//! Pagination criteria handed to the dialect.

use std::sync::Arc;

use crate::mapping::EntityTree;

/// A snapshot of the paginated fragments collected during one compile.
///
/// Fragment texts are trimmed and may be empty, in which case the dialect
/// omits the corresponding clause. Fragments carry `?` placeholders but no
/// parameters; the compiler keeps those and merges them in the documented
/// order.
#[derive(Debug, Clone)]
pub struct QueryCriteria {
    tree: Arc<EntityTree>,
    main_additional_columns: Vec<String>,
    main_where: String,
    use_group_by: bool,
    group_by_additional_columns: Vec<String>,
    having: String,
    main_order_by: String,
    secondary_where: String,
}

impl QueryCriteria {
    /// Creates empty criteria for a tree.
    pub fn new(tree: Arc<EntityTree>) -> Self {
        Self {
            tree,
            main_additional_columns: Vec::new(),
            main_where: String::new(),
            use_group_by: false,
            group_by_additional_columns: Vec::new(),
            having: String::new(),
            main_order_by: String::new(),
            secondary_where: String::new(),
        }
    }

    /// Sets extra columns projected by the main (id) query.
    pub fn with_main_additional_columns(mut self, columns: Vec<String>) -> Self {
        self.main_additional_columns = columns;
        self
    }

    /// Sets the main WHERE fragment.
    pub fn with_main_where(mut self, sql: impl Into<String>) -> Self {
        self.main_where = sql.into().trim().to_string();
        self
    }

    /// Groups the main query by the root primary key plus `columns`.
    pub fn with_group_by(mut self, columns: Vec<String>) -> Self {
        self.use_group_by = true;
        self.group_by_additional_columns = columns;
        self
    }

    /// Sets the HAVING fragment.
    pub fn with_having(mut self, sql: impl Into<String>) -> Self {
        self.having = sql.into().trim().to_string();
        self
    }

    /// Sets the main ORDER BY fragment.
    pub fn with_main_order_by(mut self, sql: impl Into<String>) -> Self {
        self.main_order_by = sql.into().trim().to_string();
        self
    }

    /// Sets the secondary WHERE fragment.
    pub fn with_secondary_where(mut self, sql: impl Into<String>) -> Self {
        self.secondary_where = sql.into().trim().to_string();
        self
    }

    /// The entity tree the query is rooted at.
    pub fn tree(&self) -> &EntityTree {
        &self.tree
    }

    /// Extra columns projected by the main query.
    pub fn main_additional_columns(&self) -> &[String] {
        &self.main_additional_columns
    }

    /// The main WHERE fragment (no `WHERE` keyword).
    pub fn main_where(&self) -> &str {
        &self.main_where
    }

    /// Whether the main query groups instead of using DISTINCT.
    pub const fn use_group_by(&self) -> bool {
        self.use_group_by
    }

    /// Extra GROUP BY columns after the root primary key.
    pub fn group_by_additional_columns(&self) -> &[String] {
        &self.group_by_additional_columns
    }

    /// The HAVING fragment.
    pub fn having(&self) -> &str {
        &self.having
    }

    /// The main ORDER BY fragment (no `ORDER BY` keyword).
    pub fn main_order_by(&self) -> &str {
        &self.main_order_by
    }

    /// The secondary WHERE fragment, applied to the joined page rows.
    pub fn secondary_where(&self) -> &str {
        &self.secondary_where
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::EntityDef;

    #[test]
    fn test_fragments_are_trimmed() {
        let tree = Arc::new(EntityTree::new(EntityDef::new("Order", "orders", "o")).unwrap());
        let criteria = QueryCriteria::new(tree)
            .with_main_where("  o.total > ?  ")
            .with_having("\tCOUNT(*) > 1\n")
            .with_main_order_by(" o.id ")
            .with_secondary_where(" ");
        assert_eq!(criteria.main_where(), "o.total > ?");
        assert_eq!(criteria.having(), "COUNT(*) > 1");
        assert_eq!(criteria.main_order_by(), "o.id");
        assert!(criteria.secondary_where().is_empty());
        assert!(!criteria.use_group_by());
        assert_eq!(criteria.tree().root_node().entity(), "Order");
    }

    #[test]
    fn test_group_by_enables_grouping() {
        let tree = Arc::new(EntityTree::new(EntityDef::new("Order", "orders", "o")).unwrap());
        let criteria = QueryCriteria::new(tree).with_group_by(vec!["o.status".into()]);
        assert!(criteria.use_group_by());
        assert_eq!(criteria.group_by_additional_columns(), &["o.status".to_string()]);
    }
}
