//! Worldline - the parent/child structure of one tree.
//!
//! Nodes are addressed by their position in timestamp order (ties keep input
//! order). Broken and cyclic parent links are cut here, so every walk over a
//! built `Worldline` sees a forest.

use std::collections::HashMap;

use worldline_model::{ContentId, NodeKind, RecordId, SaveNode, TreeId};

use crate::ancestry::AncestryIndex;
use crate::error::IntegrityWarning;

/// Adjacency, roots and depth for the nodes of one tree.
#[derive(Debug, Clone)]
pub struct Worldline<'a> {
    tree_id: TreeId,
    nodes: Vec<&'a SaveNode>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    depth: Vec<usize>,
    warnings: Vec<IntegrityWarning>,
}

impl<'a> Worldline<'a> {
    /// Build the tree for `tree_id`. Nodes of other trees are ignored.
    pub fn build<I>(tree_id: TreeId, nodes: I) -> Self
    where
        I: IntoIterator<Item = &'a SaveNode>,
    {
        let mut nodes: Vec<&'a SaveNode> =
            nodes.into_iter().filter(|n| n.tree_id == tree_id).collect();
        nodes.sort_by_key(|n| n.timestamp);

        let mut worldline = Self {
            parent: vec![None; nodes.len()],
            children: vec![Vec::new(); nodes.len()],
            roots: Vec::new(),
            depth: vec![0; nodes.len()],
            warnings: Vec::new(),
            tree_id,
            nodes,
        };

        let by_content = worldline.index_content();
        worldline.link_parents(&by_content);
        worldline.collect_roots();
        worldline.break_cycles();
        worldline.compute_depths();
        worldline
    }

    /// Map content ids to node indices. The earliest claimant wins.
    fn index_content(&mut self) -> HashMap<&'a ContentId, usize> {
        let mut by_content = HashMap::new();
        for i in 0..self.nodes.len() {
            let node: &'a SaveNode = self.nodes[i];
            let Some(content_id) = &node.content_id else {
                continue;
            };
            if by_content.contains_key(content_id) {
                self.warnings.push(IntegrityWarning::DuplicateContent {
                    tree_id: self.tree_id.clone(),
                    content_id: content_id.clone(),
                    record_id: node.record_id.clone(),
                });
            } else {
                by_content.insert(content_id, i);
            }
        }
        by_content
    }

    fn link_parents(&mut self, by_content: &HashMap<&'a ContentId, usize>) {
        for i in 0..self.nodes.len() {
            let node: &'a SaveNode = self.nodes[i];
            let Some(parent_id) = &node.parent_content_id else {
                continue;
            };
            match by_content.get(parent_id) {
                Some(&p) if p != i => {
                    self.parent[i] = Some(p);
                    self.children[p].push(i);
                }
                Some(_) => self.warnings.push(IntegrityWarning::CyclicAncestry {
                    tree_id: self.tree_id.clone(),
                    record_id: node.record_id.clone(),
                }),
                None => self.warnings.push(IntegrityWarning::BrokenAncestry {
                    tree_id: self.tree_id.clone(),
                    record_id: node.record_id.clone(),
                    missing_parent: parent_id.clone(),
                }),
            }
        }
    }

    fn collect_roots(&mut self) {
        self.roots = (0..self.nodes.len())
            .filter(|&i| self.parent[i].is_none())
            .collect();
    }

    /// Promote every node not reachable from a root to a root of its own,
    /// cutting its parent link.
    fn break_cycles(&mut self) {
        let mut reached = vec![false; self.nodes.len()];
        let roots = self.roots.clone();
        for root in roots {
            self.mark_reachable(root, &mut reached);
        }

        for i in 0..self.nodes.len() {
            if reached[i] {
                continue;
            }
            if let Some(p) = self.parent[i].take() {
                self.children[p].retain(|&c| c != i);
            }
            self.warnings.push(IntegrityWarning::CyclicAncestry {
                tree_id: self.tree_id.clone(),
                record_id: self.nodes[i].record_id.clone(),
            });
            self.roots.push(i);
            self.mark_reachable(i, &mut reached);
        }
        self.roots.sort_unstable();
    }

    fn mark_reachable(&self, start: usize, reached: &mut [bool]) {
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            if reached[i] {
                continue;
            }
            reached[i] = true;
            stack.extend(self.children[i].iter().copied());
        }
    }

    /// Depth is the number of turns along a node's own lineage. Initial
    /// configuration nodes always sit at depth zero.
    fn compute_depths(&mut self) {
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(i) = stack.pop() {
            for &child in &self.children[i] {
                self.depth[child] = if self.nodes[child].kind == NodeKind::InitialConfig {
                    0
                } else {
                    self.depth[i] + 1
                };
                stack.push(child);
            }
        }
    }

    pub fn tree_id(&self) -> &TreeId {
        &self.tree_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &'a SaveNode {
        self.nodes[index]
    }

    /// All nodes in timestamp order.
    pub fn nodes(&self) -> &[&'a SaveNode] {
        &self.nodes
    }

    pub fn index_of(&self, record_id: &RecordId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.record_id == record_id)
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parent[index]
    }

    /// Children of a node, in timestamp order.
    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn leaves(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&i| self.children[i].is_empty())
    }

    pub fn depth(&self, index: usize) -> usize {
        self.depth[index]
    }

    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    /// An ancestry index over this tree's nodes.
    pub fn ancestry(&self) -> AncestryIndex<'a> {
        AncestryIndex::new(self.nodes.iter().copied())
    }

    /// Nodes of the subtree under `root`, children before parents.
    pub fn post_order(&self, root: usize) -> Vec<usize> {
        let mut order = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((i, expanded)) = stack.pop() {
            if expanded {
                order.push(i);
            } else {
                stack.push((i, true));
                stack.extend(self.children[i].iter().rev().map(|&c| (c, false)));
            }
        }
        order
    }
}
