//! Error and warning taxonomy.

use serde::Serialize;
use thiserror::Error;
use worldline_model::{ContentId, RecordId, StoreError, TreeId};

/// Import failures. Only raised when the payload as a whole cannot be read;
/// nothing is admitted in that case.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload matches no known save shape: {0}")]
    MalformedPayload(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AncestryError {
    /// The parent chain starting at this record never reaches a root.
    #[error("ancestry of record {0} is cyclic")]
    Cyclic(RecordId),
}

/// A data-integrity anomaly that was routed around rather than failed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IntegrityWarning {
    /// The declared parent beat does not exist in the tree.
    #[error("record {record_id} in tree {tree_id} points at missing parent {missing_parent}")]
    #[serde(rename_all = "camelCase")]
    BrokenAncestry {
        tree_id: TreeId,
        record_id: RecordId,
        missing_parent: ContentId,
    },

    /// The record sits on a parent cycle; it was treated as a root.
    #[error("record {record_id} in tree {tree_id} is part of an ancestry cycle")]
    #[serde(rename_all = "camelCase")]
    CyclicAncestry { tree_id: TreeId, record_id: RecordId },

    /// A second record claims a content id already claimed in the tree.
    #[error("record {record_id} duplicates content {content_id} in tree {tree_id}")]
    #[serde(rename_all = "camelCase")]
    DuplicateContent {
        tree_id: TreeId,
        content_id: ContentId,
        record_id: RecordId,
    },

    /// One element of an import batch could not be read.
    #[error("batch element {index} skipped: {reason}")]
    MalformedRecord { index: usize, reason: String },
}
