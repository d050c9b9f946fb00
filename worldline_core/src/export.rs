//! Export - the self-describing backup document.
//!
//! Re-importing an export into the store it came from admits nothing.

use serde::{Deserialize, Serialize};
use worldline_model::{group_by_tree, SaveNode, TreeId};

/// Format tag written into every export document.
pub const EXPORT_FORMAT: &str = "worldline-export";

/// Current export document version.
pub const EXPORT_VERSION: u32 = 1;

/// A flat list of save nodes with a format header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub format: String,
    pub version: u32,
    pub nodes: Vec<SaveNode>,
}

impl ExportDocument {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Export every node, grouped by tree and ordered by timestamp.
pub fn export_document(nodes: &[SaveNode]) -> ExportDocument {
    let mut ordered = Vec::with_capacity(nodes.len());
    for (_, mut tree_nodes) in group_by_tree(nodes) {
        tree_nodes.sort_by_key(|n| n.timestamp);
        ordered.extend(tree_nodes.into_iter().cloned());
    }
    ExportDocument {
        format: EXPORT_FORMAT.to_string(),
        version: EXPORT_VERSION,
        nodes: ordered,
    }
}

/// Export a single worldline.
pub fn export_tree(nodes: &[SaveNode], tree_id: &TreeId) -> ExportDocument {
    let tree_nodes: Vec<SaveNode> = nodes
        .iter()
        .filter(|n| &n.tree_id == tree_id)
        .cloned()
        .collect();
    export_document(&tree_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<SaveNode> {
        vec![
            SaveNode::with_record_id("b2", "beta").with_timestamp(20),
            SaveNode::with_record_id("a1", "alpha").with_timestamp(5),
            SaveNode::with_record_id("b1", "beta").with_timestamp(10),
        ]
    }

    #[test]
    fn test_export_orders_by_tree_then_time() {
        let doc = export_document(&sample());
        let ids: Vec<_> = doc.nodes.iter().map(|n| n.record_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b1", "b2"]);
        assert_eq!(doc.format, EXPORT_FORMAT);
        assert_eq!(doc.version, EXPORT_VERSION);
    }

    #[test]
    fn test_export_single_tree() {
        let doc = export_tree(&sample(), &TreeId::new("beta"));
        assert_eq!(doc.nodes.len(), 2);
        assert!(doc.nodes.iter().all(|n| n.tree_id.as_str() == "beta"));
    }

    #[test]
    fn test_export_json_is_self_describing() {
        let json = export_document(&sample()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["format"], EXPORT_FORMAT);
        assert_eq!(value["nodes"][0]["recordId"], "a1");

        let back: ExportDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, export_document(&sample()));
    }
}
