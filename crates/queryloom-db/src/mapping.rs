//! Entity-to-table mapping trees.
//!
//! An [`EntityTree`] describes which table, alias, and primary key belong to
//! each entity type reachable from a query root, and how each entity joins to
//! its parent. Nodes live in an arena and are addressed by [`NodeId`].
//!
//! Only nodes that are eagerly fetched along their whole chain from the root
//! appear in the generated join; these are called *query-ready*. Compiled
//! SQL may only reference query-ready nodes, since any other alias is absent
//! from the FROM clause.
//!
//! # Examples
//!
//! ```
//! use queryloom_db::mapping::{EntityDef, EntityTree, JoinDef};
//!
//! let tree = EntityTree::new(
//!     EntityDef::new("Order", "orders", "o")
//!         .columns(["placed_at", "total"])
//!         .child(
//!             EntityDef::new("Customer", "customers", "c")
//!                 .columns(["name"])
//!                 .join(JoinDef::inner("customer_id", "id")),
//!         ),
//! )
//! .unwrap();
//!
//! let from = tree.render_from();
//! assert_eq!(from.sql, "FROM orders o INNER JOIN customers c ON c.id = o.customer_id");
//! ```

use std::collections::HashSet;

use queryloom_core::{LoomError, LoomResult};
use serde::{Deserialize, Serialize};

use crate::query::dialect::RenderedSql;
use crate::value::Value;

/// Index of a node inside an [`EntityTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: Self = Self(0);

    /// Returns the arena index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// How a related entity is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fetch {
    /// Joined into the generated query.
    #[default]
    Eager,
    /// Loaded separately; never part of the generated join.
    Lazy,
}

/// SQL join types used between a node and its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// INNER JOIN.
    Inner,
    /// LEFT JOIN.
    #[default]
    Left,
}

impl JoinKind {
    /// Returns the SQL keyword for this join type.
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// How a child entity joins to its parent.
///
/// The ON clause is `<child alias>.<child_column> = <parent alias>.<parent_column>`,
/// optionally followed by `AND (<condition>)`. The condition is trusted SQL
/// and may contain `?` placeholders bound to `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinDef {
    /// The join type.
    #[serde(default)]
    pub kind: JoinKind,
    /// Column on the parent table.
    pub parent_column: String,
    /// Column on the child table.
    pub child_column: String,
    /// Extra ON condition, e.g. `c.deleted = ?`.
    #[serde(default)]
    pub condition: Option<String>,
    /// Parameters for the extra condition.
    #[serde(default)]
    pub params: Vec<Value>,
}

impl JoinDef {
    /// A LEFT JOIN on `child.child_column = parent.parent_column`.
    pub fn left(parent_column: impl Into<String>, child_column: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Left,
            parent_column: parent_column.into(),
            child_column: child_column.into(),
            condition: None,
            params: Vec::new(),
        }
    }

    /// An INNER JOIN on `child.child_column = parent.parent_column`.
    pub fn inner(parent_column: impl Into<String>, child_column: impl Into<String>) -> Self {
        Self {
            kind: JoinKind::Inner,
            ..Self::left(parent_column, child_column)
        }
    }

    /// Adds a parameterized condition to the ON clause.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>, params: Vec<Value>) -> Self {
        self.condition = Some(condition.into());
        self.params = params;
        self
    }
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// A declarative, nested definition of an entity and its related entities.
///
/// This is the input format of [`EntityTree::new`]; it also deserializes
/// from JSON query plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// The entity type name, e.g. `Customer`.
    pub entity: String,
    /// The table name.
    pub table: String,
    /// The table alias used in generated SQL.
    pub alias: String,
    /// The primary key column.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Non-key columns, in projection order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Marker names this node can be addressed by in paths.
    #[serde(default)]
    pub markers: Vec<String>,
    /// Separator between alias and column in projected labels; the tree
    /// default applies when absent.
    #[serde(default)]
    pub column_alias_separator: Option<String>,
    /// Whether this entity is joined into generated queries.
    #[serde(default)]
    pub fetch: Fetch,
    /// How this entity joins to its parent. Required for every non-root node.
    #[serde(default)]
    pub join: Option<JoinDef>,
    /// Related entities.
    #[serde(default)]
    pub children: Vec<EntityDef>,
}

impl EntityDef {
    /// Creates a definition with primary key `id`, eager fetch, and no columns.
    pub fn new(
        entity: impl Into<String>,
        table: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            alias: alias.into(),
            primary_key: default_primary_key(),
            columns: Vec::new(),
            markers: Vec::new(),
            column_alias_separator: None,
            fetch: Fetch::Eager,
            join: None,
            children: Vec::new(),
        }
    }

    /// Sets the primary key column.
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Appends non-key columns.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Adds a path marker.
    #[must_use]
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    /// Overrides the column alias separator for this node.
    #[must_use]
    pub fn column_alias_separator(mut self, separator: impl Into<String>) -> Self {
        self.column_alias_separator = Some(separator.into());
        self
    }

    /// Marks this entity as lazily fetched.
    #[must_use]
    pub fn lazy(mut self) -> Self {
        self.fetch = Fetch::Lazy;
        self
    }

    /// Sets how this entity joins to its parent.
    #[must_use]
    pub fn join(mut self, join: JoinDef) -> Self {
        self.join = Some(join);
        self
    }

    /// Adds a related entity.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

/// One node of an [`EntityTree`].
#[derive(Debug, Clone)]
pub struct EntityNode {
    entity: String,
    table_name: String,
    table_alias: String,
    primary_key: String,
    columns: Vec<String>,
    markers: Vec<String>,
    column_alias_separator: String,
    fetch: Fetch,
    join: Option<JoinDef>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    query_ready: bool,
}

impl EntityNode {
    /// The entity type name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The bare table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The table alias.
    pub fn table_alias(&self) -> &str {
        &self.table_alias
    }

    /// The primary key column name.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Path markers.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Separator between alias and column in projected labels.
    pub fn column_alias_separator(&self) -> &str {
        &self.column_alias_separator
    }

    /// The fetch mode declared for this node.
    pub const fn fetch(&self) -> Fetch {
        self.fetch
    }

    /// How this node joins to its parent (`None` for the root).
    pub const fn join(&self) -> Option<&JoinDef> {
        self.join.as_ref()
    }

    /// The parent node (`None` for the root).
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in declaration order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether this node is part of the generated join.
    pub const fn is_query_ready(&self) -> bool {
        self.query_ready
    }

    /// `<alias>.<column>`.
    pub fn qualified(&self, column: &str) -> String {
        format!("{}.{column}", self.table_alias)
    }

    /// `<alias><column alias separator><column>`, the projected label of a column.
    pub fn column_label(&self, column: &str) -> String {
        format!("{}{}{column}", self.table_alias, self.column_alias_separator)
    }

    fn projected_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_key.as_str()).chain(self.columns.iter().map(String::as_str))
    }
}

/// An arena-backed entity mapping tree rooted at one entity type.
#[derive(Debug, Clone)]
pub struct EntityTree {
    nodes: Vec<EntityNode>,
}

impl EntityTree {
    /// Builds a tree from a nested definition, using `_` as the default
    /// column alias separator.
    pub fn new(root: EntityDef) -> LoomResult<Self> {
        Self::with_default_separator(root, "_")
    }

    /// Builds a tree from a nested definition with the given default column
    /// alias separator.
    ///
    /// Fails if an alias is used twice, an alias is empty, or a non-root
    /// definition has no join.
    pub fn with_default_separator(root: EntityDef, default_separator: &str) -> LoomResult<Self> {
        let mut tree = Self { nodes: Vec::new() };
        let mut aliases = HashSet::new();
        tree.insert(root, None, default_separator, &mut aliases)?;
        Ok(tree)
    }

    fn insert(
        &mut self,
        def: EntityDef,
        parent: Option<NodeId>,
        default_separator: &str,
        aliases: &mut HashSet<String>,
    ) -> LoomResult<NodeId> {
        if def.alias.is_empty() {
            return Err(LoomError::ConfigurationError(format!(
                "Entity '{}' has an empty table alias",
                def.entity
            )));
        }
        if !aliases.insert(def.alias.clone()) {
            return Err(LoomError::ConfigurationError(format!(
                "Table alias '{}' is used more than once (entity '{}')",
                def.alias, def.entity
            )));
        }

        let join = match (parent, def.join) {
            (None, _) => None,
            (Some(_), Some(join)) => Some(join),
            (Some(_), None) => {
                return Err(LoomError::ConfigurationError(format!(
                    "Entity '{}' has no join to its parent",
                    def.entity
                )));
            }
        };

        let query_ready = match parent {
            None => true,
            Some(p) => def.fetch == Fetch::Eager && self.nodes[p.0].query_ready,
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(EntityNode {
            entity: def.entity,
            table_name: def.table,
            table_alias: def.alias,
            primary_key: def.primary_key,
            columns: def.columns,
            markers: def.markers,
            column_alias_separator: def
                .column_alias_separator
                .unwrap_or_else(|| default_separator.to_string()),
            fetch: def.fetch,
            join,
            parent,
            children: Vec::new(),
            query_ready,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }

        for child in def.children {
            self.insert(child, Some(id), default_separator, aliases)?;
        }
        Ok(id)
    }

    /// The root node id.
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The root node.
    pub fn root_node(&self) -> &EntityNode {
        &self.nodes[0]
    }

    /// Returns the node for an id issued by this tree.
    ///
    /// # Panics
    ///
    /// Panics if the id belongs to a different tree with more nodes.
    pub fn node(&self, id: NodeId) -> &EntityNode {
        &self.nodes[id.0]
    }

    /// Returns the node for an id, if it exists.
    pub fn get(&self, id: NodeId) -> Option<&EntityNode> {
        self.nodes.get(id.0)
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds a node by table alias.
    pub fn find_by_alias(&self, alias: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.table_alias == alias)
            .map(NodeId)
    }

    /// Query-ready nodes in pre-order (parents before children).
    pub fn joined_nodes(&self) -> impl Iterator<Item = &EntityNode> {
        // Insertion order is already pre-order.
        self.nodes.iter().filter(|n| n.query_ready)
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// `a.id AS a_id, a.name AS a_name, ...` over all query-ready nodes.
    pub fn render_select_list(&self) -> String {
        self.joined_nodes()
            .flat_map(|node| {
                node.projected_columns()
                    .map(move |col| format!("{} AS {}", node.qualified(col), node.column_label(col)))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SELECT <select list> FROM ...`.
    pub fn render_select(&self) -> RenderedSql {
        let from = self.render_from();
        RenderedSql::new(format!("SELECT {} {}", self.render_select_list(), from.sql), from.params)
    }

    /// `FROM <root table> <root alias>` followed by every join.
    pub fn render_from(&self) -> RenderedSql {
        let root = self.root_node();
        let joins = self.render_joins();
        let mut sql = format!("FROM {} {}", root.table_name, root.table_alias);
        if !joins.sql.is_empty() {
            sql.push(' ');
            sql.push_str(&joins.sql);
        }
        RenderedSql::new(sql, joins.params)
    }

    /// The JOIN chain for every query-ready non-root node, without the
    /// root's FROM item.
    pub fn render_joins(&self) -> RenderedSql {
        let mut parts = Vec::new();
        let mut params = Vec::new();
        for node in self.joined_nodes() {
            let (Some(parent), Some(join)) = (node.parent, node.join.as_ref()) else {
                continue;
            };
            let parent = &self.nodes[parent.0];
            let mut part = format!(
                "{} {} {} ON {} = {}",
                join.kind.sql_keyword(),
                node.table_name,
                node.table_alias,
                node.qualified(&join.child_column),
                parent.qualified(&join.parent_column),
            );
            if let Some(ref condition) = join.condition {
                part.push_str(&format!(" AND ({})", condition.trim()));
                params.extend(join.params.iter().cloned());
            }
            parts.push(part);
        }
        RenderedSql::new(parts.join(" "), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_tree() -> EntityTree {
        EntityTree::new(
            EntityDef::new("Order", "orders", "o")
                .columns(["total"])
                .child(
                    EntityDef::new("Customer", "customers", "c")
                        .columns(["name"])
                        .marker("buyer")
                        .join(JoinDef::inner("customer_id", "id"))
                        .child(
                            EntityDef::new("Address", "addresses", "ad")
                                .join(JoinDef::left("address_id", "id")),
                        ),
                )
                .child(
                    EntityDef::new("Invoice", "invoices", "i")
                        .lazy()
                        .join(JoinDef::left("id", "order_id"))
                        .child(
                            EntityDef::new("Payment", "payments", "p")
                                .join(JoinDef::left("id", "invoice_id")),
                        ),
                ),
        )
        .unwrap()
    }

    #[test]
    fn test_tree_structure() {
        let tree = order_tree();
        assert_eq!(tree.len(), 5);
        assert!(!tree.is_empty());
        let root = tree.root_node();
        assert_eq!(root.entity(), "Order");
        assert_eq!(root.children().len(), 2);
        let c = tree.find_by_alias("c").unwrap();
        assert_eq!(tree.node(c).parent(), Some(NodeId::ROOT));
        assert_eq!(tree.node(c).markers(), &["buyer".to_string()]);
    }

    #[test]
    fn test_query_ready_follows_eager_chain() {
        let tree = order_tree();
        let ready = |alias: &str| tree.node(tree.find_by_alias(alias).unwrap()).is_query_ready();
        assert!(ready("o"));
        assert!(ready("c"));
        assert!(ready("ad"));
        assert!(!ready("i"));
        // Eager under a lazy parent is still excluded.
        assert!(!ready("p"));
    }

    #[test]
    fn test_render_select_list() {
        let tree = order_tree();
        assert_eq!(
            tree.render_select_list(),
            "o.id AS o_id, o.total AS o_total, c.id AS c_id, c.name AS c_name, ad.id AS ad_id"
        );
    }

    #[test]
    fn test_render_from_skips_unjoined_nodes() {
        let from = order_tree().render_from();
        assert_eq!(
            from.sql,
            "FROM orders o INNER JOIN customers c ON c.id = o.customer_id \
             LEFT JOIN addresses ad ON ad.id = c.address_id"
        );
        assert!(from.params.is_empty());
    }

    #[test]
    fn test_join_condition_params() {
        let tree = EntityTree::new(
            EntityDef::new("Order", "orders", "o").child(
                EntityDef::new("Line", "order_lines", "l")
                    .join(JoinDef::left("id", "order_id").with_condition(" l.deleted = ? ", vec![Value::Bool(false)])),
            ),
        )
        .unwrap();
        let select = tree.render_select();
        assert_eq!(
            select.sql,
            "SELECT o.id AS o_id, l.id AS l_id FROM orders o \
             LEFT JOIN order_lines l ON l.order_id = o.id AND (l.deleted = ?)"
        );
        assert_eq!(select.params, vec![Value::Bool(false)]);
    }

    #[test]
    fn test_column_alias_separator_default_and_override() {
        let tree = EntityTree::with_default_separator(
            EntityDef::new("Order", "orders", "o").child(
                EntityDef::new("Customer", "customers", "c")
                    .column_alias_separator("$")
                    .join(JoinDef::left("customer_id", "id")),
            ),
            "__",
        )
        .unwrap();
        assert_eq!(tree.root_node().column_label("id"), "o__id");
        let c = tree.find_by_alias("c").unwrap();
        assert_eq!(tree.node(c).column_label("id"), "c$id");
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let err = EntityTree::new(
            EntityDef::new("Order", "orders", "o")
                .child(EntityDef::new("Customer", "customers", "o").join(JoinDef::left("customer_id", "id"))),
        )
        .unwrap_err();
        assert!(err.to_string().contains("used more than once"));
    }

    #[test]
    fn test_missing_join_rejected() {
        let err = EntityTree::new(
            EntityDef::new("Order", "orders", "o").child(EntityDef::new("Customer", "customers", "c")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no join"));
    }

    #[test]
    fn test_entity_def_deserializes_with_defaults() {
        let def: EntityDef = serde_json::from_str(
            r#"{"entity": "Order", "table": "orders", "alias": "o",
                "children": [{"entity": "Customer", "table": "customers", "alias": "c",
                              "fetch": "lazy",
                              "join": {"parent_column": "customer_id", "child_column": "id"}}]}"#,
        )
        .unwrap();
        assert_eq!(def.primary_key, "id");
        assert_eq!(def.children[0].fetch, Fetch::Lazy);
        assert_eq!(def.children[0].join.as_ref().unwrap().kind, JoinKind::Left);
        let tree = EntityTree::new(def).unwrap();
        assert_eq!(tree.render_select_list(), "o.id AS o_id");
    }
}
