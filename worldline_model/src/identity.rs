//! Identity predicates shared by every engine component.
//!
//! All comparisons are by id value. Nothing here relies on where a node
//! lives in memory.

use std::collections::BTreeMap;

use crate::{SaveNode, TreeId};

/// True when the node has no parent beat.
pub fn is_root(node: &SaveNode) -> bool {
    node.parent_content_id.is_none()
}

/// True when both nodes carry a content id and the ids are equal.
pub fn same_content(a: &SaveNode, b: &SaveNode) -> bool {
    match (&a.content_id, &b.content_id) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Find the node whose content id equals `node.parent_content_id`.
///
/// Only nodes of the same tree are considered.
pub fn resolve_parent<'a>(node: &SaveNode, tree_nodes: &'a [SaveNode]) -> Option<&'a SaveNode> {
    let parent_id = node.parent_content_id.as_ref()?;
    tree_nodes
        .iter()
        .find(|n| n.tree_id == node.tree_id && n.content_id.as_ref() == Some(parent_id))
}

/// Partition nodes by tree id, keeping input order inside each tree.
pub fn group_by_tree<'a, I>(nodes: I) -> BTreeMap<TreeId, Vec<&'a SaveNode>>
where
    I: IntoIterator<Item = &'a SaveNode>,
{
    let mut trees: BTreeMap<TreeId, Vec<&'a SaveNode>> = BTreeMap::new();
    for node in nodes {
        trees.entry(node.tree_id.clone()).or_default().push(node);
    }
    trees
}
