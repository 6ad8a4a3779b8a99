//! JSON query plans.
//!
//! A plan pairs an entity tree definition with the instruction sequence to
//! compile against it:
//!
//! ```json
//! {
//!   "tree": {"entity": "Order", "table": "orders", "alias": "o", "columns": ["total"]},
//!   "instructions": [
//!     {"kind": "INITIAL_QUERY"},
//!     {"kind": "STRING", "value": " WHERE "},
//!     {"kind": "COLUMN", "value": {"name": "total"}},
//!     {"kind": "STRING", "value": " > "},
//!     {"kind": "PARAM", "value": {"type": "Int", "value": 100}}
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use queryloom_core::{LoomError, LoomResult};
use queryloom_db::mapping::{EntityDef, EntityTree};
use queryloom_db::query::{Instruction, InstructionSequence};
use serde::{Deserialize, Serialize};

/// An entity tree definition plus the instructions to compile against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// The root entity definition, with nested children.
    pub tree: EntityDef,
    /// Instructions in compile order.
    pub instructions: Vec<Instruction>,
}

impl QueryPlan {
    /// Parses a plan from JSON text.
    pub fn from_json_str(json: &str) -> LoomResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| LoomError::SerializationError(format!("Invalid query plan: {e}")))
    }

    /// Reads and parses a plan file.
    pub fn from_file(path: impl AsRef<Path>) -> LoomResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Builds the entity tree, using `default_separator` for entities that
    /// set no column alias separator of their own.
    pub fn build_tree(&self, default_separator: &str) -> LoomResult<Arc<EntityTree>> {
        EntityTree::with_default_separator(self.tree.clone(), default_separator).map(Arc::new)
    }

    /// Consumes the plan into its tree definition and instruction sequence.
    pub fn into_parts(self) -> (EntityDef, InstructionSequence) {
        (self.tree, self.instructions.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queryloom_db::query::PathMatcher;

    const PLAN: &str = r#"{
        "tree": {
            "entity": "Order", "table": "orders", "alias": "o",
            "children": [
                {"entity": "Customer", "table": "customers", "alias": "c",
                 "join": {"parent_column": "customer_id", "child_column": "id"}}
            ]
        },
        "instructions": [
            {"kind": "INITIAL_QUERY"},
            {"kind": "STRING", "value": " WHERE "},
            {"kind": "PATH", "value": [{"match": "entity", "value": "Customer"}]},
            {"kind": "COLUMN", "value": {"name": "name"}},
            {"kind": "STRING", "value": " = "},
            {"kind": "STRING_PARAM", "value": "Ada"}
        ]
    }"#;

    #[test]
    fn test_parse_plan() {
        let plan = QueryPlan::from_json_str(PLAN).unwrap();
        assert_eq!(plan.tree.children.len(), 1);
        assert_eq!(plan.instructions.len(), 6);
        assert_eq!(
            plan.instructions[2],
            Instruction::Path(vec![PathMatcher::entity("Customer")])
        );
    }

    #[test]
    fn test_build_tree_uses_default_separator() {
        let plan = QueryPlan::from_json_str(PLAN).unwrap();
        let tree = plan.build_tree("__").unwrap();
        assert_eq!(tree.root_node().column_alias_separator(), "__");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_into_parts() {
        let (tree, sequence) = QueryPlan::from_json_str(PLAN).unwrap().into_parts();
        assert_eq!(tree.alias, "o");
        assert_eq!(sequence.len(), 6);
    }

    #[test]
    fn test_invalid_plan() {
        let err = QueryPlan::from_json_str(r#"{"tree": {}}"#).unwrap_err();
        assert!(matches!(err, LoomError::SerializationError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = QueryPlan::from_file("/nonexistent/plan.json").unwrap_err();
        assert!(matches!(err, LoomError::IoError(_)));
    }
}
