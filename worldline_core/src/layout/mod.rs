//! Layout Engine - 2-D positions and a renderable edge list for worldlines.
//!
//! The layout works as follows:
//! 1. **Partition**: Group nodes by tree id
//! 2. **Build**: Reconstruct adjacency per tree (see [`Worldline`])
//! 3. **Columns**: X is the node's depth along its own lineage
//! 4. **Rows**: Leaves take consecutive slots, parents center over children
//! 5. **Overrides**: User-placed positions replace computed ones
//! 6. **Edges**: One classified edge per parent/child pair, unless the
//!    boundary hook turns it into a segment marker

mod tidy;

pub use tidy::*;

use serde::Serialize;
use worldline_model::{
    group_by_tree, ContentId, DisplayAttribute, Position, PositionOverrides, RecordId, SaveNode,
    TreeId,
};

use crate::classify::{classify, TransitionKind};
use crate::config::LayoutConfig;
use crate::error::IntegrityWarning;
use crate::worldline::Worldline;

/// A node with its final canvas position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    pub record_id: RecordId,
    pub tree_id: TreeId,
    pub content_id: Option<ContentId>,
    pub position: Position,

    /// Turns since the root along this node's own lineage.
    pub depth: usize,

    /// True when the position came from a manual override.
    pub manually_placed: bool,

    /// Background image, inherited from ancestors when the node has none.
    pub background: Option<String>,
}

/// A drawable connection between a parent and a child.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEdge {
    pub tree_id: TreeId,
    pub from: RecordId,
    pub to: RecordId,
    pub kind: TransitionKind,
}

/// A parent/child link drawn as a segment boundary instead of an edge.
/// The structural link itself is untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentMarker {
    pub tree_id: TreeId,
    pub parent: RecordId,
    pub child: RecordId,
    pub kind: TransitionKind,
}

/// Everything presentation needs to draw the worldlines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldlineLayout {
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<LayoutEdge>,
    pub segment_markers: Vec<SegmentMarker>,
    pub warnings: Vec<IntegrityWarning>,
}

impl WorldlineLayout {
    pub fn node(&self, record_id: &RecordId) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| &n.record_id == record_id)
    }

    pub fn position_of(&self, record_id: &RecordId) -> Option<Position> {
        self.node(record_id).map(|n| n.position)
    }

    pub fn edge(&self, from: &RecordId, to: &RecordId) -> Option<&LayoutEdge> {
        self.edges
            .iter()
            .find(|e| &e.from == from && &e.to == to)
    }
}

/// Computes worldline layouts.
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    /// Create a new layout engine with the given configuration.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Create a layout engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LayoutConfig::default())
    }

    /// Lay out every tree in `nodes`, drawing every parent link as an edge.
    pub fn layout(&self, nodes: &[SaveNode], overrides: &PositionOverrides) -> WorldlineLayout {
        self.layout_with_boundaries(nodes, overrides, |_, _| false)
    }

    /// Lay out every tree in `nodes`.
    ///
    /// `is_boundary(parent, child)` decides which links render as segment
    /// markers rather than edges.
    ///
    /// Position precedence: `overrides`, then the node's own
    /// `manual_position`, then the computed position.
    pub fn layout_with_boundaries<F>(
        &self,
        nodes: &[SaveNode],
        overrides: &PositionOverrides,
        is_boundary: F,
    ) -> WorldlineLayout
    where
        F: Fn(&SaveNode, &SaveNode) -> bool,
    {
        let mut result = WorldlineLayout::default();
        let mut cursor = SlotCursor::new();

        for (tree_index, (tree_id, tree_nodes)) in group_by_tree(nodes).into_iter().enumerate() {
            if tree_index > 0 {
                cursor.skip(self.config.tree_gap);
            }
            let worldline = Worldline::build(tree_id, tree_nodes);
            let slots = assign_slots(&worldline, &mut cursor, self.config.lane_gap);
            let ancestry = worldline.ancestry();

            for (i, node) in worldline.nodes().iter().copied().enumerate() {
                let computed = Position::new(
                    worldline.depth(i) as f64 * self.config.column_spacing,
                    slots[i] * self.config.row_spacing,
                );
                let manual = overrides
                    .get(&node.record_id)
                    .copied()
                    .or(node.manual_position);

                result.nodes.push(PositionedNode {
                    record_id: node.record_id.clone(),
                    tree_id: node.tree_id.clone(),
                    content_id: node.content_id.clone(),
                    position: manual.unwrap_or(computed),
                    depth: worldline.depth(i),
                    manually_placed: manual.is_some(),
                    background: ancestry
                        .resolve(node, &DisplayAttribute::BackgroundImage)
                        .map(str::to_string),
                });

                let Some(p) = worldline.parent(i) else {
                    continue;
                };
                let parent = worldline.node(p);
                let kind = classify(node, Some(parent));
                if is_boundary(parent, node) {
                    result.segment_markers.push(SegmentMarker {
                        tree_id: node.tree_id.clone(),
                        parent: parent.record_id.clone(),
                        child: node.record_id.clone(),
                        kind,
                    });
                } else {
                    result.edges.push(LayoutEdge {
                        tree_id: node.tree_id.clone(),
                        from: parent.record_id.clone(),
                        to: node.record_id.clone(),
                        kind,
                    });
                }
            }

            for warning in worldline.warnings() {
                tracing::warn!(%warning, "worldline integrity problem");
            }
            result.warnings.extend_from_slice(worldline.warnings());
        }

        tracing::debug!(
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            markers = result.segment_markers.len(),
            warnings = result.warnings.len(),
            "laid out worldlines"
        );
        result
    }
}

/// Lay out `nodes` with the default configuration and no segment boundaries.
pub fn layout(nodes: &[SaveNode], overrides: &PositionOverrides) -> WorldlineLayout {
    LayoutEngine::with_defaults().layout(nodes, overrides)
}
