//! Path resolution against an entity tree.
//!
//! A path is an ordered list of [`PathMatcher`]s. Resolution starts at the
//! root; each matcher picks the first child of the current node (in
//! declaration order) that it matches. An empty path, or a path starting
//! with [`PathMatcher::Root`], addresses the root.

use std::fmt;

use queryloom_core::{LoomError, LoomResult};
use serde::{Deserialize, Serialize};

use crate::mapping::{EntityNode, EntityTree, NodeId};

/// One step of a path through the entity tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "value", rename_all = "lowercase")]
pub enum PathMatcher {
    /// The root. Only meaningful as the first matcher, where it makes the
    /// whole path resolve to the root.
    Root,
    /// A child of the given entity type.
    Entity(String),
    /// A child carrying the given marker.
    Marker(String),
    /// The child with the given table alias.
    Alias(String),
}

impl PathMatcher {
    /// Matches by entity type name.
    pub fn entity(name: impl Into<String>) -> Self {
        Self::Entity(name.into())
    }

    /// Matches by marker.
    pub fn marker(name: impl Into<String>) -> Self {
        Self::Marker(name.into())
    }

    /// Matches by table alias.
    pub fn alias(alias: impl Into<String>) -> Self {
        Self::Alias(alias.into())
    }

    fn matches(&self, node: &EntityNode) -> bool {
        match self {
            Self::Root => false,
            Self::Entity(name) => node.entity() == name,
            Self::Marker(marker) => node.markers().iter().any(|m| m == marker),
            Self::Alias(alias) => node.table_alias() == alias,
        }
    }
}

impl fmt::Display for PathMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("<root>"),
            Self::Entity(name) => write!(f, "entity '{name}'"),
            Self::Marker(marker) => write!(f, "marker '{marker}'"),
            Self::Alias(alias) => write!(f, "alias '{alias}'"),
        }
    }
}

/// Resolves a path to a node that may be referenced in generated SQL.
///
/// Fails with [`LoomError::PathError`] if a matcher finds no child, or if
/// `Root` appears after the first position, and with
/// [`LoomError::UnjoinedEntity`] if the resolved node exists but is not part
/// of the generated join.
pub fn resolve_path(tree: &EntityTree, matchers: &[PathMatcher]) -> LoomResult<NodeId> {
    let mut current = tree.root();
    match matchers.first() {
        None | Some(PathMatcher::Root) => return Ok(current),
        Some(_) => {}
    }

    for matcher in matchers {
        if *matcher == PathMatcher::Root {
            return Err(LoomError::PathError(
                "the root matcher may only appear first in a path".to_string(),
            ));
        }
        let node = tree.node(current);
        current = node
            .children()
            .iter()
            .copied()
            .find(|&child| matcher.matches(tree.node(child)))
            .ok_or_else(|| {
                LoomError::PathError(format!(
                    "no child matching {matcher} under entity '{}'",
                    node.entity()
                ))
            })?;
    }

    let resolved = tree.node(current);
    if !resolved.is_query_ready() {
        return Err(LoomError::UnjoinedEntity {
            entity: resolved.entity().to_string(),
        });
    }
    Ok(current)
}
