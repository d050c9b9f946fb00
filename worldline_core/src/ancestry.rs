//! Ancestry Resolver - inherit-if-missing lookups along a node's parent chain.
//!
//! This is the only place that knows a missing display attribute means
//! "use the nearest ancestor's value". Every walk is bounded by the number of
//! nodes in the tree, so corrupted (cyclic) parent data fails closed.

use std::collections::HashMap;

use worldline_model::{ContentId, DisplayAttribute, SaveNode};

use crate::error::AncestryError;

/// Content-id index over the nodes of one tree.
#[derive(Debug, Clone)]
pub struct AncestryIndex<'a> {
    by_content: HashMap<&'a ContentId, &'a SaveNode>,
    node_count: usize,
}

impl<'a> AncestryIndex<'a> {
    /// Index the given nodes. When two nodes claim the same content id the
    /// first one wins.
    pub fn new<I>(tree_nodes: I) -> Self
    where
        I: IntoIterator<Item = &'a SaveNode>,
    {
        let mut by_content = HashMap::new();
        let mut node_count = 0;
        for node in tree_nodes {
            node_count += 1;
            if let Some(content_id) = &node.content_id {
                by_content.entry(content_id).or_insert(node);
            }
        }
        Self {
            by_content,
            node_count,
        }
    }

    /// The node's parent within the indexed tree, if it resolves.
    pub fn parent_of(&self, node: &SaveNode) -> Option<&'a SaveNode> {
        let parent_id = node.parent_content_id.as_ref()?;
        self.by_content
            .get(parent_id)
            .copied()
            .filter(|parent| parent.tree_id == node.tree_id)
    }

    /// Find the nearest value of `attribute`, starting at `node` itself.
    ///
    /// Performs at most `node_count` parent hops. A cycle yields `None`.
    pub fn resolve<'n>(&self, node: &'n SaveNode, attribute: &DisplayAttribute) -> Option<&'n str>
    where
        'a: 'n,
    {
        let mut current = node;
        let mut hops = 0;
        loop {
            if let Some(value) = current.display.get(attribute) {
                return Some(value);
            }
            if hops == self.node_count {
                tracing::warn!(
                    record_id = %node.record_id,
                    tree_id = %node.tree_id,
                    "ancestry walk exceeded tree size; treating attribute as absent"
                );
                return None;
            }
            current = self.parent_of(current)?;
            hops += 1;
        }
    }

    /// The chain from `node` up to its root, starting with `node`.
    pub fn lineage<'n>(&self, node: &'n SaveNode) -> Result<Vec<&'n SaveNode>, AncestryError>
    where
        'a: 'n,
    {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent_of(current) {
            if chain.len() > self.node_count {
                return Err(AncestryError::Cyclic(node.record_id.clone()));
            }
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }
}

/// Resolve an inheritable attribute for `node` against the nodes of its tree.
///
/// Builds a throwaway index; callers resolving many nodes should build an
/// [`AncestryIndex`] once instead.
pub fn resolve_attribute<'a>(
    node: &'a SaveNode,
    tree_nodes: &'a [SaveNode],
    attribute: &DisplayAttribute,
) -> Option<&'a str> {
    AncestryIndex::new(tree_nodes.iter().filter(|n| n.tree_id == node.tree_id))
        .resolve(node, attribute)
}
